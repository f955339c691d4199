//! taskmaster task command implementations.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::filter::{self, owner_criterion, GroupBy, SortKey, SortOrder, TaskFilters};
use crate::manager::TaskUpdate;
use crate::output::{emit_success, push_task_summary, task_line, HumanOutput};
use crate::task::{Category, Priority, Task, TaskRecord};

pub struct AddOptions {
    pub content: String,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub user: Option<String>,
}

pub struct ListOptions {
    pub user: Option<String>,
    pub status: String,
    pub priority: String,
    pub category: String,
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: String,
    pub order: String,
}

pub struct EditOptions {
    pub id: String,
    pub content: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
struct TaskListOutput {
    owner: String,
    total: usize,
    tasks: Vec<TaskRecord>,
}

#[derive(Serialize)]
struct TaskGroupsOutput {
    owner: String,
    group_by: String,
    groups: Vec<TaskGroup>,
}

#[derive(Serialize)]
struct TaskGroup {
    key: String,
    tasks: Vec<TaskRecord>,
}

#[derive(Serialize)]
struct ClearOutput {
    owner: String,
    removed: usize,
}

fn records(tasks: &[Task]) -> Vec<TaskRecord> {
    tasks.iter().map(Task::to_record).collect()
}

pub fn run_add(global: &GlobalOptions, options: AddOptions) -> Result<()> {
    let mut app = global.open_app()?;
    let owner = app.resolve_owner(options.user.as_deref())?;
    let priority = options
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;
    let category = options
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let saved = app.add_task(&owner, &options.content, priority, category)?;
    let task = saved.value;

    let mut human = HumanOutput::new(format!("Task added: {}", task.content()));
    push_task_summary(&mut human, &task);
    human.note_durability(saved.durable);
    human.push_next_step(format!("taskmaster task toggle {}", task.id()));

    emit_success(global.output(), "task add", &task.to_record(), Some(&human))
}

pub fn run_list(global: &GlobalOptions, options: ListOptions) -> Result<()> {
    let app = global.open_app()?;
    let owner = app.resolve_owner(options.user.as_deref())?;

    let filters = TaskFilters {
        status: options.status.parse()?,
        priority: options.priority.parse()?,
        category: options.category.parse()?,
        owner: owner_criterion(None),
        search_term: options.search.clone(),
        from: parse_bound("from", options.from.as_deref(), DayEdge::Start)?,
        to: parse_bound("to", options.to.as_deref(), DayEdge::End)?,
    };
    let sort: SortKey = options.sort.parse()?;
    let order: SortOrder = options.order.parse()?;

    let tasks = app.view(&owner, &filters, sort, order);

    let mut human = HumanOutput::new(format!("Tasks for {owner}"));
    human.push_summary("Total", tasks.len().to_string());
    if !filters.is_empty() {
        human.push_summary("Filtered", "yes");
    }
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("taskmaster task add <content>");
    }

    let output = TaskListOutput {
        owner,
        total: tasks.len(),
        tasks: records(&tasks),
    };
    emit_success(global.output(), "task list", &output, Some(&human))
}

pub fn run_show(global: &GlobalOptions, id: &str) -> Result<()> {
    let app = global.open_app()?;
    let task = app
        .tasks()
        .get_task_by_id(id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

    let mut human = HumanOutput::new(format!("Task {}", task.id()));
    push_task_summary(&mut human, task);

    emit_success(global.output(), "task show", &task.to_record(), Some(&human))
}

pub fn run_edit(global: &GlobalOptions, options: EditOptions) -> Result<()> {
    let update = TaskUpdate {
        content: options.content,
        priority: options.priority,
        category: options.category,
        status: options.status,
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to change (use --content, --priority, --category or --status)".to_string(),
        ));
    }

    let mut app = global.open_app()?;
    let saved = app.edit_task(&options.id, &update)?;
    let task = saved.value;

    let mut human = HumanOutput::new(format!("Task updated: {}", task.id()));
    push_task_summary(&mut human, &task);
    human.note_durability(saved.durable);

    emit_success(global.output(), "task edit", &task.to_record(), Some(&human))
}

pub fn run_toggle(global: &GlobalOptions, id: &str) -> Result<()> {
    let mut app = global.open_app()?;
    let saved = app.toggle_task(id)?;
    let task = saved.value;

    let header = if task.is_done() {
        format!("Task done: {}", task.content())
    } else {
        format!("Task reopened: {}", task.content())
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id());
    human.push_summary("status", task.status().to_string());
    human.note_durability(saved.durable);

    emit_success(global.output(), "task toggle", &task.to_record(), Some(&human))
}

pub fn run_rm(global: &GlobalOptions, id: &str) -> Result<()> {
    let mut app = global.open_app()?;
    let saved = app.remove_task(id)?;
    let task = saved.value;

    let mut human = HumanOutput::new(format!("Task removed: {}", task.content()));
    human.push_summary("id", task.id());
    human.note_durability(saved.durable);

    emit_success(global.output(), "task rm", &task.to_record(), Some(&human))
}

pub fn run_clear(global: &GlobalOptions, user: Option<&str>) -> Result<()> {
    let mut app = global.open_app()?;
    let owner = app.resolve_owner(user)?;
    let saved = app.clear_user_tasks(&owner)?;

    let mut human = HumanOutput::new(format!("Tasks cleared for {owner}"));
    human.push_summary("removed", saved.value.to_string());
    human.note_durability(saved.durable);

    let output = ClearOutput {
        owner,
        removed: saved.value,
    };
    emit_success(global.output(), "task clear", &output, Some(&human))
}

pub fn run_search(global: &GlobalOptions, term: &str, user: Option<&str>) -> Result<()> {
    let app = global.open_app()?;
    let owner = app.resolve_owner(user)?;
    let owned = app.tasks().get_user_tasks(&owner);
    let tasks = filter::by_search_term(&owned, term);

    let mut human = HumanOutput::new(format!("Search '{}' for {owner}", term.trim()));
    human.push_summary("Matches", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    let output = TaskListOutput {
        owner,
        total: tasks.len(),
        tasks: records(&tasks),
    };
    emit_success(global.output(), "task search", &output, Some(&human))
}

pub fn run_group(global: &GlobalOptions, by: &str, user: Option<&str>) -> Result<()> {
    let group_by: GroupBy = by.parse()?;
    let app = global.open_app()?;
    let owner = app.resolve_owner(user)?;
    let owned = app.tasks().get_user_tasks(&owner);
    let groups = filter::group_tasks_in(&owned, Some(group_by), &Local);

    let mut human = HumanOutput::new(format!("Tasks for {owner} by {group_by}"));
    human.push_summary("Groups", groups.len().to_string());
    for (key, tasks) in &groups {
        human.push_detail(format!("{key} ({})", tasks.len()));
        for task in tasks {
            human.push_detail(format!("  {}", task_line(task)));
        }
    }

    let output = TaskGroupsOutput {
        owner,
        group_by: group_by.to_string(),
        groups: groups
            .iter()
            .map(|(key, tasks)| TaskGroup {
                key: key.clone(),
                tasks: records(tasks),
            })
            .collect(),
    };
    emit_success(global.output(), "task group", &output, Some(&human))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayEdge {
    Start,
    End,
}

/// Parse a date bound. Plain dates cover the whole local day.
fn parse_bound(label: &str, value: Option<&str>, edge: DayEdge) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    let invalid = || {
        Error::InvalidArgument(format!(
            "invalid --{label} date '{value}' (expected YYYY-MM-DD or RFC 3339)"
        ))
    };
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = match edge {
        DayEdge::Start => NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(invalid)?,
        DayEdge::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).ok_or_else(invalid)?,
    };
    let local = Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(invalid)?;
    Ok(Some(local.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_accept_dates_and_timestamps() {
        let exact = parse_bound("from", Some("2024-03-01T10:00:00Z"), DayEdge::Start)
            .unwrap()
            .unwrap();
        assert_eq!(exact.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let start = parse_bound("from", Some("2024-03-01"), DayEdge::Start).unwrap().unwrap();
        let end = parse_bound("to", Some("2024-03-01"), DayEdge::End).unwrap().unwrap();
        assert!(start < end);
        assert!(parse_bound("to", Some("  "), DayEdge::End).unwrap().is_none());
        assert!(parse_bound("to", Some("yesterday"), DayEdge::End).is_err());
    }
}
