//! Rendering of command results.
//!
//! Handlers describe a result once, as a serializable report plus a
//! [`HumanOutput`]. With `--json` the report is wrapped in a versioned
//! envelope on stdout; otherwise the human block is printed unless `--quiet`.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::task::{iso8601, Task};

pub const SCHEMA_VERSION: &str = "taskmaster.v1";

/// Command groups whose name is only meaningful together with a subcommand
const COMMAND_GROUPS: [&str; 3] = ["user", "task", "settings"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text shown to a person: a header line followed by optional sections
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    /// Key/value row. An empty value prints the key alone.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }

    /// Warn when a mutation only reached memory
    pub fn note_durability(&mut self, durable: bool) {
        if !durable {
            self.push_warning("changes were not saved to storage; they will be lost on exit");
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        if !self.summary.is_empty() {
            f.write_str("\n\nSummary:")?;
            for (key, value) in &self.summary {
                if value.is_empty() {
                    write!(f, "\n- {key}")?;
                } else {
                    write!(f, "\n- {key}: {value}")?;
                }
            }
        }

        let sections = [
            ("Details", &self.details),
            ("Warnings", &self.warnings),
            ("Next steps", &self.next_steps),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

/// One-line task rendering: `[x] content (priority, category) id`
pub fn task_line(task: &Task) -> String {
    let mark = if task.is_done() { "x" } else { " " };
    format!(
        "[{mark}] {} ({}, {}) {}",
        task.content(),
        task.priority(),
        task.category(),
        task.id()
    )
}

/// Summary rows describing a single task
pub fn push_task_summary(output: &mut HumanOutput, task: &Task) {
    output.push_summary("id", task.id());
    output.push_summary("content", task.content());
    output.push_summary("owner", task.owner());
    output.push_summary("status", task.status().to_string());
    output.push_summary("priority", task.priority().to_string());
    output.push_summary("category", task.category().to_string());
    output.push_summary("created", iso8601::format(&task.created_at()));
}

/// Top-level JSON object. `body` carries either `data` or `error`.
#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(flatten)]
    body: B,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
struct DataBody<'a, T: Serialize> {
    data: &'a T,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_json<B: Serialize>(envelope: &Envelope<'_, B>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_json(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            body: DataBody { data },
            warnings: human.map(|h| h.warnings.clone()).unwrap_or_default(),
            next_steps: human.map(|h| h.next_steps.clone()).unwrap_or_default(),
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{human}"),
        _ => {}
    }
    Ok(())
}

/// Report a failed command: an error envelope on stdout with `--json`,
/// otherwise `error:` and an optional `hint:` line on stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);

    if json {
        let message = err.to_string();
        return print_json(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            body: ErrorBody {
                error: ErrorDetail {
                    message: &message,
                    code: err.exit_code(),
                    kind: error_kind(err),
                    details: err.details(),
                },
            },
            warnings: Vec::new(),
            next_steps,
        });
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Command name for error envelopes, read from the raw process arguments
/// because clap may have failed to parse them.
pub fn infer_command_name_from_args() -> String {
    infer_command_name(std::env::args().skip(1))
}

/// First positional word, joined with the second when the first is a
/// command group (`task add`, `user use`).
pub fn infer_command_name<I>(args: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut words = args.into_iter().filter(|arg| !arg.starts_with('-'));
    let Some(command) = words.next() else {
        return "taskmaster".to_string();
    };
    if !COMMAND_GROUPS.contains(&command.as_str()) {
        return command;
    }
    match words.next() {
        Some(sub) => format!("{command} {sub}"),
        None => command,
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let hint = match err {
        Error::NoCurrentUser => "taskmaster user use <name>",
        Error::UserNotFound(_) => "taskmaster user list",
        Error::TaskNotFound(_) => "taskmaster task list",
        Error::InvalidConfig(_) => "fix .taskmaster.toml then retry",
        Error::LockFailed(_) => "retry once the other taskmaster process exits",
        _ => return Vec::new(),
    };
    vec![hint.to_string()]
}
