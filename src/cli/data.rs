//! Export, import and settings commands

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::lock;
use crate::output::{emit_success, HumanOutput};
use crate::storage::{format_size, ExportBundle};

#[derive(Serialize)]
struct ExportReport {
    path: PathBuf,
    bytes: usize,
}

#[derive(Serialize)]
struct ImportReport {
    path: PathBuf,
    users: usize,
    tasks: usize,
    current_user: Option<String>,
}

pub fn run_export(global: &GlobalOptions, output: Option<PathBuf>) -> Result<()> {
    let app = global.open_app()?;
    let bundle = app.export();

    let Some(path) = output else {
        if global.json {
            return emit_success(global.output(), "export", &bundle, None);
        }
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    };

    let json = serde_json::to_string_pretty(&bundle)?;
    lock::write_atomic(&path, json.as_bytes())?;

    let report = ExportReport {
        path: path.clone(),
        bytes: json.len(),
    };
    let mut human = HumanOutput::new(format!("Exported to {}", path.display()));
    human.push_summary("size", format_size(report.bytes));
    human.push_summary("stored", format_size(app.storage_size()));
    human.push_next_step(format!("taskmaster import {}", path.display()));

    emit_success(global.output(), "export", &report, Some(&human))
}

fn read_bundle(path: &Path) -> Result<ExportBundle> {
    let content = std::fs::read_to_string(path)?;
    let not_an_export = |reason: String| {
        Error::InvalidArgument(format!("{} is not a taskmaster export: {reason}", path.display()))
    };
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|err| not_an_export(err.to_string()))?;
    if !value.is_object() {
        return Err(not_an_export("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|err| not_an_export(err.to_string()))
}

pub fn run_import(global: &GlobalOptions, path: &Path) -> Result<()> {
    let bundle = read_bundle(path)?;
    let mut app = global.open_app()?;
    let saved = app.import(&bundle)?;

    let report = ImportReport {
        path: path.to_path_buf(),
        users: app.users().len(),
        tasks: app.tasks().len(),
        current_user: app.current_user().map(|user| user.name().to_string()),
    };

    let mut human = HumanOutput::new(format!("Imported {}", path.display()));
    human.push_summary("users", report.users.to_string());
    human.push_summary("tasks", report.tasks.to_string());
    if let Some(current) = &report.current_user {
        human.push_summary("current user", current.clone());
    }
    human.note_durability(saved.durable);

    emit_success(global.output(), "import", &report, Some(&human))
}

pub fn run_settings_show(global: &GlobalOptions) -> Result<()> {
    let app = global.open_app()?;
    let settings = app.settings();

    let mut human = HumanOutput::new("Settings");
    human.push_summary("theme", settings.theme.clone());
    human.push_summary("language", settings.language.clone());
    human.push_summary("autoSave", settings.auto_save.to_string());
    human.push_summary("notifications", settings.notifications.to_string());
    for (key, value) in &settings.extra {
        human.push_summary(key.clone(), value.to_string());
    }

    emit_success(global.output(), "settings show", settings, Some(&human))
}

pub fn run_settings_set(global: &GlobalOptions, key: &str, value: &str) -> Result<()> {
    let mut app = global.open_app()?;
    let saved = app.update_settings(key, value)?;

    let mut human = HumanOutput::new(format!("Setting updated: {key}"));
    human.push_summary(key, value);
    human.note_durability(saved.durable);

    emit_success(global.output(), "settings set", &saved.value, Some(&human))
}
