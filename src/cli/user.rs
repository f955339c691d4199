//! taskmaster user command implementations
//!
//! Profiles are names only; `use` selects the owner that task commands act on
//! when `--user` is omitted.

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::iso8601;
use crate::user::User;

#[derive(Serialize)]
struct UserRemoveReport {
    user: String,
    removed_tasks: usize,
}

#[derive(Serialize)]
struct UserListReport<'a> {
    current_user: Option<&'a str>,
    users: &'a [User],
}

fn push_user_summary(human: &mut HumanOutput, user: &User) {
    human.push_summary("name", user.name());
    human.push_summary("tasks", user.task_count().to_string());
    human.push_summary("completed", user.completed_task_count().to_string());
    human.push_summary("last activity", iso8601::format(&user.last_activity()));
}

pub fn run_add(global: &GlobalOptions, name: &str, make_current: bool) -> Result<()> {
    let mut app = global.open_app()?;
    let mut saved = app.add_user(name)?;
    if make_current {
        let selected = app.set_current_user(saved.value.name())?;
        saved.durable &= selected.durable;
        saved.value = selected.value;
    }
    let user = saved.value;

    let mut human = HumanOutput::new(format!("User added: {}", user.name()));
    push_user_summary(&mut human, &user);
    human.note_durability(saved.durable);
    if !make_current {
        human.push_next_step(format!("taskmaster user use {}", user.name()));
    }

    emit_success(global.output(), "user add", &user, Some(&human))
}

pub fn run_rm(global: &GlobalOptions, name: &str) -> Result<()> {
    let mut app = global.open_app()?;
    let saved = app.remove_user(name)?;

    let report = UserRemoveReport {
        user: name.trim().to_string(),
        removed_tasks: saved.value,
    };

    let mut human = HumanOutput::new(format!("User removed: {}", report.user));
    human.push_summary("removed tasks", report.removed_tasks.to_string());
    human.note_durability(saved.durable);

    emit_success(global.output(), "user rm", &report, Some(&human))
}

pub fn run_list(global: &GlobalOptions) -> Result<()> {
    let app = global.open_app()?;
    let current = app.current_user().map(User::name);

    let mut human = HumanOutput::new("Users");
    human.push_summary("Total", app.users().len().to_string());
    human.push_summary("Current", current.unwrap_or("(none)"));
    for user in app.users() {
        let marker = if Some(user.name()) == current { "*" } else { " " };
        human.push_detail(format!(
            "{marker} {} ({} tasks, {} done)",
            user.name(),
            user.task_count(),
            user.completed_task_count()
        ));
    }
    if app.users().is_empty() {
        human.push_next_step("taskmaster user add <name> --use");
    }

    let report = UserListReport {
        current_user: current,
        users: app.users(),
    };
    emit_success(global.output(), "user list", &report, Some(&human))
}

pub fn run_use(global: &GlobalOptions, name: &str) -> Result<()> {
    let mut app = global.open_app()?;
    let saved = app.set_current_user(name)?;
    let user = saved.value;

    let mut human = HumanOutput::new(format!("Current user: {}", user.name()));
    push_user_summary(&mut human, &user);
    human.note_durability(saved.durable);

    emit_success(global.output(), "user use", &user, Some(&human))
}
