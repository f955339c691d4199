#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use taskmaster::task::{Category, Priority, Status, Task, TaskRecord};
use tempfile::TempDir;

/// Scratch working directory with its own data directory
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".taskmaster.toml", contents)
    }

    pub fn read_key(&self, key: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let raw = fs::read_to_string(self.data_dir().join(format!("{key}.json")))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Binary invocation rooted in the test directory, isolated from the host environment
pub fn taskmaster_cmd(env: &TestEnv) -> Command {
    let mut cmd = Command::cargo_bin("taskmaster").expect("binary");
    cmd.current_dir(env.path())
        .env_remove("RUST_LOG")
        .env_remove("TASKMASTER_CONFIG")
        .env("TASKMASTER_DATA_DIR", env.data_dir());
    cmd
}

/// Run with `--json` and parse stdout
pub fn run_json(env: &TestEnv, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
    let output = taskmaster_cmd(env)
        .args(args)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    Ok(serde_json::from_slice(&output)?)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Task with a fixed id and creation time
pub fn task(
    id: &str,
    content: &str,
    owner: &str,
    priority: Priority,
    category: Category,
    status: Status,
    created_at: DateTime<Utc>,
) -> Task {
    Task::try_from(TaskRecord {
        id: id.to_string(),
        content: content.to_string(),
        user: owner.to_string(),
        status,
        priority,
        category,
        created_at,
    })
    .expect("valid task record")
}

pub fn pending(id: &str, priority: Priority, created_at: DateTime<Utc>) -> Task {
    task(
        id,
        &format!("Task {id}"),
        "Ala",
        priority,
        Category::Other,
        Status::Pending,
        created_at,
    )
}

pub fn ids(tasks: &[Task]) -> Vec<String> {
    tasks.iter().map(|task| task.id().to_string()).collect()
}
