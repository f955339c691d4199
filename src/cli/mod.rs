//! Command-line interface for taskmaster
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is handled in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::app::App;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::{FileStore, KeyValueStore, MemoryStore, Persistence};

mod data;
mod stats;
mod task;
mod user;

/// taskmaster - per-user task lists
///
/// Keeps named user profiles, each with their own tasks carrying a
/// priority, a category and a done flag.
#[derive(Parser, Debug)]
#[command(name = "taskmaster")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the stored data (defaults to the platform data dir)
    #[arg(long, global = true, env = "TASKMASTER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to ./.taskmaster.toml when present)
    #[arg(long, global = true, env = "TASKMASTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep everything in memory for this invocation
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// User profile management
    #[command(subcommand)]
    User(UserCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show task statistics
    Stats {
        /// Profile to report on (defaults to the current user)
        #[arg(long)]
        user: Option<String>,

        /// Report across every profile
        #[arg(long, conflicts_with = "user")]
        all: bool,
    },

    /// Export all stored data as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import data previously written by `export`
    Import {
        /// Export file to read
        file: PathBuf,
    },

    /// Application settings
    #[command(subcommand)]
    Settings(SettingsCommands),
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a profile
    Add {
        name: String,

        /// Also make it the current user
        #[arg(long = "use")]
        make_current: bool,
    },

    /// Delete a profile and all of its tasks
    Rm { name: String },

    /// List profiles
    List,

    /// Switch the current user
    Use { name: String },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,

        /// low, medium or high
        #[arg(short, long)]
        priority: Option<String>,

        /// work, study, hobby, home or other
        #[arg(short, long)]
        category: Option<String>,

        /// Owner (defaults to the current user)
        #[arg(long)]
        user: Option<String>,
    },

    /// List tasks with optional filters and sorting
    List {
        /// Owner (defaults to the current user)
        #[arg(long)]
        user: Option<String>,

        /// pending, done or all
        #[arg(long, default_value = "all")]
        status: String,

        /// low, medium, high or all
        #[arg(long, default_value = "all")]
        priority: String,

        /// work, study, hobby, home, other or all
        #[arg(long, default_value = "all")]
        category: String,

        /// Case-insensitive text to look for
        #[arg(long)]
        search: Option<String>,

        /// Created on or after (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        from: Option<String>,

        /// Created on or before (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        to: Option<String>,

        /// date, priority, category, content or status
        #[arg(long, default_value = "date")]
        sort: String,

        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
    },

    /// Show one task
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,

        #[arg(long)]
        content: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        /// pending or done
        #[arg(long)]
        status: Option<String>,
    },

    /// Flip a task between pending and done
    Toggle { id: String },

    /// Delete a task
    Rm { id: String },

    /// Delete every task of a user
    Clear {
        /// Owner (defaults to the current user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Search task text
    Search {
        term: String,

        /// Owner (defaults to the current user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Group tasks by status, priority, category, owner or date
    Group {
        by: String,

        /// Owner (defaults to the current user)
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Print current settings
    Show,

    /// Change one setting
    Set { key: String, value: String },
}

/// Storage selected at startup
#[derive(Debug)]
pub enum Store {
    File(FileStore),
    Memory(MemoryStore),
}

impl KeyValueStore for Store {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        match self {
            Store::File(store) => store.load(key),
            Store::Memory(store) => store.load(key),
        }
    }

    fn save(&mut self, key: &str, value: &Value) -> Result<()> {
        match self {
            Store::File(store) => store.save(key, value),
            Store::Memory(store) => store.save(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        match self {
            Store::File(store) => store.remove(key),
            Store::Memory(store) => store.remove(key),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        match self {
            Store::File(store) => store.keys(),
            Store::Memory(store) => store.keys(),
        }
    }
}

/// Global flags shared by every handler
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub ephemeral: bool,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path),
            None => {
                let cwd = std::env::current_dir()?;
                Ok(Config::load_from_dir(&cwd))
            }
        }
    }

    /// Load config, pick the store, and hydrate the application
    pub fn open_app(&self) -> Result<App<Store>> {
        let config = self.load_config()?;
        let store = if self.ephemeral {
            Store::Memory(MemoryStore::new())
        } else {
            let dir = match &self.data_dir {
                Some(dir) => dir.clone(),
                None => config.resolve_data_dir()?,
            };
            let store = FileStore::new(dir);
            if !store.is_available() {
                tracing::warn!(dir = %store.dir().display(), "data directory is not writable");
            }
            Store::File(store)
        };
        tracing::debug!(ephemeral = self.ephemeral, "opening application state");
        Ok(App::open(Persistence::new(store), config))
    }
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            ephemeral: self.ephemeral,
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::User(cmd) => match cmd {
                UserCommands::Add { name, make_current } => {
                    user::run_add(&global, &name, make_current)
                }
                UserCommands::Rm { name } => user::run_rm(&global, &name),
                UserCommands::List => user::run_list(&global),
                UserCommands::Use { name } => user::run_use(&global, &name),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    content,
                    priority,
                    category,
                    user,
                } => task::run_add(
                    &global,
                    task::AddOptions {
                        content: content.join(" "),
                        priority,
                        category,
                        user,
                    },
                ),
                TaskCommands::List {
                    user,
                    status,
                    priority,
                    category,
                    search,
                    from,
                    to,
                    sort,
                    order,
                } => task::run_list(
                    &global,
                    task::ListOptions {
                        user,
                        status,
                        priority,
                        category,
                        search,
                        from,
                        to,
                        sort,
                        order,
                    },
                ),
                TaskCommands::Show { id } => task::run_show(&global, &id),
                TaskCommands::Edit {
                    id,
                    content,
                    priority,
                    category,
                    status,
                } => task::run_edit(
                    &global,
                    task::EditOptions {
                        id,
                        content,
                        priority,
                        category,
                        status,
                    },
                ),
                TaskCommands::Toggle { id } => task::run_toggle(&global, &id),
                TaskCommands::Rm { id } => task::run_rm(&global, &id),
                TaskCommands::Clear { user } => task::run_clear(&global, user.as_deref()),
                TaskCommands::Search { term, user } => {
                    task::run_search(&global, &term, user.as_deref())
                }
                TaskCommands::Group { by, user } => task::run_group(&global, &by, user.as_deref()),
            },
            Commands::Stats { user, all } => stats::run(&global, user.as_deref(), all),
            Commands::Export { output } => data::run_export(&global, output),
            Commands::Import { file } => data::run_import(&global, &file),
            Commands::Settings(cmd) => match cmd {
                SettingsCommands::Show => data::run_settings_show(&global),
                SettingsCommands::Set { key, value } => {
                    data::run_settings_set(&global, &key, &value)
                }
            },
        }
    }
}
