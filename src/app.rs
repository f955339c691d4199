//! Application coordinator.
//!
//! [`App`] owns the in-memory model (users, tasks, current user, settings)
//! and writes it back through [`Persistence`] after every mutation. The
//! in-memory state is authoritative for the session: a failed save is
//! reported through [`Saved::durable`], never by rolling the change back.

use chrono::Local;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, SortKey, SortOrder, TaskFilters};
use crate::manager::{TaskManager, TaskUpdate};
use crate::stats::{self, DetailedStats};
use crate::storage::{keys, parse_list, ExportBundle, KeyValueStore, Persistence, Settings};
use crate::task::{Category, Priority, Task, TaskRecord};
use crate::user::{validate_user_name, User, UserRecord};

/// Result of a mutation plus whether it reached storage
#[derive(Debug, Clone, PartialEq)]
pub struct Saved<T> {
    pub value: T,
    pub durable: bool,
}

impl<T> Saved<T> {
    fn new(value: T, durable: bool) -> Self {
        Self { value, durable }
    }
}

pub struct App<S> {
    persistence: Persistence<S>,
    config: Config,
    users: Vec<User>,
    tasks: TaskManager,
    current_user: Option<String>,
    settings: Settings,
}

impl<S: KeyValueStore> App<S> {
    /// Hydrate from storage. Unreadable entries are skipped, never fatal.
    pub fn open(persistence: Persistence<S>, config: Config) -> Self {
        let mut app = Self {
            persistence,
            tasks: TaskManager::with_config(&config.tasks),
            config,
            users: Vec::new(),
            current_user: None,
            settings: Settings::default(),
        };
        app.hydrate();
        app
    }

    fn hydrate(&mut self) {
        self.replace_users(self.persistence.load_users());
        self.replace_tasks(self.persistence.load_tasks());
        self.replace_current_user(self.persistence.load_current_user());
        self.settings = self.persistence.load_settings();
        self.refresh_user_stats();

        tracing::info!(
            users = self.users.len(),
            tasks = self.tasks.len(),
            current_user = self.current_user.as_deref().unwrap_or(""),
            "state hydrated"
        );
    }

    fn replace_users(&mut self, records: Vec<UserRecord>) {
        self.users.clear();
        for record in records {
            match User::from_record(record) {
                Ok(user) if self.position(user.name()).is_none() => self.users.push(user),
                Ok(user) => tracing::warn!(user = user.name(), "skipping duplicate stored user"),
                Err(err) => tracing::warn!(error = %err, "skipping invalid stored user"),
            }
        }
    }

    fn replace_tasks(&mut self, records: Vec<TaskRecord>) {
        let dropped = self.tasks.from_records_lossy(records);
        if dropped > 0 {
            tracing::warn!(dropped, kept = self.tasks.len(), "some stored tasks were invalid");
        }
    }

    /// Only an existing profile can be current
    fn replace_current_user(&mut self, name: Option<String>) {
        self.current_user = name.filter(|name| self.position(name).is_some());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|user| user.name() == name.trim())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_deref().and_then(|name| self.user(name))
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub fn add_user(&mut self, name: &str) -> Result<Saved<User>> {
        let name = validate_user_name(name)?;
        if self.position(&name).is_some() {
            return Err(Error::UserExists(name));
        }
        let user = User::new(&name)?;
        tracing::debug!(user = user.name(), "user added");
        self.users.push(user.clone());
        let durable = self.save_users();
        Ok(Saved::new(user, durable))
    }

    /// Remove a profile and every task it owns. Returns the number of tasks removed.
    pub fn remove_user(&mut self, name: &str) -> Result<Saved<usize>> {
        let index = self.require_user(name)?;
        let user = self.users.remove(index);
        let removed = self.tasks.clear_user_tasks(user.name());
        tracing::debug!(user = user.name(), removed, "user removed");

        let mut durable = self.save_users() & self.save_tasks();
        if self.current_user.as_deref() == Some(user.name()) {
            self.current_user = None;
            durable &= self.persistence.save_current_user(None);
        }
        Ok(Saved::new(removed, durable))
    }

    pub fn set_current_user(&mut self, name: &str) -> Result<Saved<User>> {
        let index = self.require_user(name)?;
        self.users[index].touch();
        let user = self.users[index].clone();
        self.current_user = Some(user.name().to_string());
        let durable = self.persistence.save_current_user(Some(user.name())) & self.save_users();
        Ok(Saved::new(user, durable))
    }

    /// Explicit owner if given, otherwise the current user.
    pub fn resolve_owner(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(name) => {
                let index = self.require_user(name)?;
                Ok(self.users[index].name().to_string())
            }
            None => self
                .current_user
                .clone()
                .ok_or(Error::NoCurrentUser),
        }
    }

    // ---------------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------------

    pub fn add_task(
        &mut self,
        owner: &str,
        content: &str,
        priority: Option<Priority>,
        category: Option<Category>,
    ) -> Result<Saved<Task>> {
        let index = self.require_user(owner)?;
        let owner = self.users[index].name().to_string();
        let task = self.tasks.add_task(content, &owner, priority, category)?.clone();
        let durable = self.after_task_change(&owner);
        Ok(Saved::new(task, durable))
    }

    pub fn edit_task(&mut self, id: &str, update: &TaskUpdate) -> Result<Saved<Task>> {
        if !self.tasks.edit_task(id, update)? {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        self.task_saved(id)
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<Saved<Task>> {
        if self.tasks.toggle_task_status(id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        self.task_saved(id)
    }

    /// Remove a task, returning it as it was
    pub fn remove_task(&mut self, id: &str) -> Result<Saved<Task>> {
        let task = self
            .tasks
            .get_task_by_id(id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        self.tasks.remove_task(id);
        let durable = self.after_task_change(task.owner());
        Ok(Saved::new(task, durable))
    }

    pub fn clear_user_tasks(&mut self, owner: &str) -> Result<Saved<usize>> {
        let index = self.require_user(owner)?;
        let owner = self.users[index].name().to_string();
        let removed = self.tasks.clear_user_tasks(&owner);
        let durable = self.after_task_change(&owner);
        Ok(Saved::new(removed, durable))
    }

    /// Recompute every user's cached counters from the task collection
    pub fn refresh_user_stats(&mut self) {
        let tasks = self.tasks.all_tasks();
        for user in &mut self.users {
            user.recount(tasks);
        }
    }

    /// Owner's tasks, filtered then sorted
    pub fn view(
        &self,
        owner: &str,
        filters: &TaskFilters,
        sort: SortKey,
        order: SortOrder,
    ) -> Vec<Task> {
        let owned = self.tasks.get_user_tasks(owner);
        let filtered = filter::apply_all_filters(&owned, filters);
        filter::sort_tasks_by(&filtered, sort, order)
    }

    /// Statistics for one owner, or across everyone when `owner` is `None`
    pub fn stats(&self, owner: Option<&str>) -> DetailedStats {
        let tasks = match owner {
            Some(owner) => self.tasks.get_user_tasks(owner),
            None => self.tasks.all_tasks().to_vec(),
        };
        stats::detailed_stats_at(
            &tasks,
            &Local::now(),
            self.config.stats.average_window_days,
        )
    }

    // ---------------------------------------------------------------------
    // Settings and bulk data
    // ---------------------------------------------------------------------

    pub fn update_settings(&mut self, key: &str, value: &str) -> Result<Saved<Settings>> {
        let mut settings = self.settings.clone();
        settings.set(key, value)?;
        self.settings = settings;
        let durable = self.persistence.save_settings(&self.settings);
        Ok(Saved::new(self.settings.clone(), durable))
    }

    pub fn export(&self) -> ExportBundle {
        self.persistence.export_all()
    }

    /// Replace the sections present in `bundle`, in memory and in storage.
    /// The model is rebuilt from the bundle itself, so a failed write only
    /// clears `durable`.
    pub fn import(&mut self, bundle: &ExportBundle) -> Result<Saved<()>> {
        if let Some(tasks) = &bundle.tasks {
            if !tasks.is_array() {
                return Err(Error::InvalidArgument(
                    "import: tasks must be a list".to_string(),
                ));
            }
        }
        if let Some(users) = &bundle.users {
            if !users.is_array() {
                return Err(Error::InvalidArgument(
                    "import: users must be a list".to_string(),
                ));
            }
        }
        let durable = self.persistence.import_all(bundle);

        if let Some(users) = &bundle.users {
            self.replace_users(parse_list(keys::USERS, users.clone()));
        }
        if let Some(tasks) = &bundle.tasks {
            self.replace_tasks(parse_list(keys::TASKS, tasks.clone()));
        }
        let current = match &bundle.current_user {
            Some(value) => serde_json::from_value::<Option<String>>(value.clone())
                .unwrap_or_else(|err| {
                    tracing::warn!(error = %err, "imported current user is not a name");
                    None
                }),
            None => self.current_user.take(),
        };
        self.replace_current_user(current);
        if let Some(settings) = &bundle.settings {
            self.settings = serde_json::from_value(settings.clone()).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "imported settings are malformed; using defaults");
                Settings::default()
            });
        }
        self.refresh_user_stats();

        tracing::info!(
            users = self.users.len(),
            tasks = self.tasks.len(),
            durable,
            "bundle imported"
        );
        Ok(Saved::new((), durable))
    }

    /// Approximate bytes held under the application keys
    pub fn storage_size(&self) -> usize {
        self.persistence.app_storage_size()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.users.iter().position(|user| user.name() == name)
    }

    fn require_user(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| Error::UserNotFound(name.trim().to_string()))
    }

    fn task_saved(&mut self, id: &str) -> Result<Saved<Task>> {
        let task = self
            .tasks
            .get_task_by_id(id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        let durable = self.after_task_change(task.owner());
        Ok(Saved::new(task, durable))
    }

    fn after_task_change(&mut self, owner: &str) -> bool {
        if let Some(index) = self.position(owner) {
            self.users[index].touch();
        }
        self.refresh_user_stats();
        self.save_tasks() & self.save_users()
    }

    fn save_users(&mut self) -> bool {
        let records: Vec<_> = self.users.iter().map(User::to_record).collect();
        self.persistence.save_users(&records)
    }

    fn save_tasks(&mut self) -> bool {
        let records = self.tasks.to_records();
        self.persistence.save_tasks(&records)
    }
}
