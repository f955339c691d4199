//! Task lifecycle.
//!
//! [`TaskManager`] is the only writer of the task collection. Everything it
//! hands out is either a shared reference or a fresh `Vec` of clones, so
//! filters and statistics can never alias the live collection.

use serde_json::Value;

use crate::config::{EnumUpdatePolicy, TasksConfig};
use crate::error::Result;
use crate::task::{validate_owner, Category, ContentRules, Priority, Status, Task, TaskRecord};

/// Partial edit. Enum fields stay raw strings so the manager can apply its
/// [`EnumUpdatePolicy`] to values that do not parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub content: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, value: impl Into<String>) -> Self {
        self.content = Some(value.into());
        self
    }

    pub fn priority(mut self, value: impl ToString) -> Self {
        self.priority = Some(value.to_string());
        self
    }

    pub fn category(mut self, value: impl ToString) -> Self {
        self.category = Some(value.to_string());
        self
    }

    pub fn status(mut self, value: impl ToString) -> Self {
        self.status = Some(value.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.status.is_none()
    }
}

/// Parsed edit, built before anything is touched.
#[derive(Debug, Default)]
struct ResolvedUpdate {
    content: Option<String>,
    priority: Option<Priority>,
    category: Option<Category>,
    status: Option<Status>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskManager {
    tasks: Vec<Task>,
    rules: ContentRules,
    policy: EnumUpdatePolicy,
    default_priority: Priority,
    default_category: Category,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &TasksConfig) -> Self {
        Self {
            tasks: Vec::new(),
            rules: ContentRules::from(config),
            policy: config.invalid_enum_updates,
            default_priority: config.default_priority,
            default_category: config.default_category,
        }
    }

    pub fn policy(&self) -> EnumUpdatePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: EnumUpdatePolicy) {
        self.policy = policy;
    }

    /// Create a task. `None` priority/category fall back to the configured defaults.
    pub fn add_task(
        &mut self,
        content: &str,
        owner: &str,
        priority: Option<Priority>,
        category: Option<Category>,
    ) -> Result<&Task> {
        let content = self.rules.validate(content)?;
        let owner = validate_owner(owner)?;
        let task = Task::create(
            content,
            owner,
            priority.unwrap_or(self.default_priority),
            category.unwrap_or(self.default_category),
        );
        tracing::debug!(task_id = task.id(), owner = task.owner(), "task added");
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Remove a task by id. A missing id is not an error.
    pub fn remove_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id() != id);
        let removed = self.tasks.len() < before;
        if removed {
            tracing::debug!(task_id = id, "task removed");
        }
        removed
    }

    pub fn get_task_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Apply a partial edit. Returns `Ok(false)` when the id is unknown.
    ///
    /// All fields are validated before any is written, so a failed edit
    /// leaves the task untouched.
    pub fn edit_task(&mut self, id: &str, update: &TaskUpdate) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        let resolved = self.resolve(update)?;
        let task = &mut self.tasks[index];
        if let Some(content) = resolved.content {
            task.set_content(content);
        }
        if let Some(priority) = resolved.priority {
            task.set_priority(priority);
        }
        if let Some(category) = resolved.category {
            task.set_category(category);
        }
        if let Some(status) = resolved.status {
            task.set_status(status);
        }
        tracing::debug!(task_id = id, "task edited");
        Ok(true)
    }

    pub fn toggle_task_status(&mut self, id: &str) -> Option<&Task> {
        let index = self.position(id)?;
        self.tasks[index].toggle_status();
        let task = &self.tasks[index];
        tracing::debug!(task_id = id, status = %task.status(), "task toggled");
        Some(task)
    }

    pub fn complete_task(&mut self, id: &str) -> Option<&Task> {
        let index = self.position(id)?;
        self.tasks[index].mark_done();
        Some(&self.tasks[index])
    }

    pub fn reopen_task(&mut self, id: &str) -> Option<&Task> {
        let index = self.position(id)?;
        self.tasks[index].mark_pending();
        Some(&self.tasks[index])
    }

    pub fn get_user_tasks(&self, owner: &str) -> Vec<Task> {
        self.collect(|task| task.belongs_to(owner))
    }

    pub fn user_task_count(&self, owner: &str) -> usize {
        self.tasks.iter().filter(|task| task.belongs_to(owner)).count()
    }

    /// Drop every task owned by `owner`, returning how many went.
    pub fn clear_user_tasks(&mut self, owner: &str) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.belongs_to(owner));
        let removed = before - self.tasks.len();
        tracing::debug!(owner, removed, "user tasks cleared");
        removed
    }

    pub fn clear_all_tasks(&mut self) {
        self.tasks.clear();
    }

    pub fn get_tasks_by_status(&self, status: Status) -> Vec<Task> {
        self.collect(|task| task.status() == status)
    }

    pub fn get_tasks_by_priority(&self, priority: Priority) -> Vec<Task> {
        self.collect(|task| task.priority() == priority)
    }

    pub fn get_tasks_by_category(&self, category: Category) -> Vec<Task> {
        self.collect(|task| task.category() == category)
    }

    /// Case-insensitive substring search on content. A blank term matches everything.
    pub fn search_tasks(&self, term: &str) -> Vec<Task> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return self.tasks.clone();
        }
        self.collect(|task| task.content().to_lowercase().contains(&term))
    }

    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn to_records(&self) -> Vec<TaskRecord> {
        self.tasks.iter().map(Task::to_record).collect()
    }

    /// Replace the collection from stored records. On error nothing changes.
    pub fn from_records(&mut self, records: Vec<TaskRecord>) -> Result<()> {
        let tasks = records
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.tasks = tasks;
        Ok(())
    }

    /// Replace the collection from stored records, dropping those that fail
    /// entity checks. Returns how many were dropped.
    pub fn from_records_lossy(&mut self, records: Vec<TaskRecord>) -> usize {
        let total = records.len();
        self.tasks = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id.clone();
                match Task::try_from(record) {
                    Ok(task) => Some(task),
                    Err(err) => {
                        tracing::warn!(id = %id, error = %err, "skipping invalid stored task");
                        None
                    }
                }
            })
            .collect();
        total - self.tasks.len()
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.to_records())?)
    }

    /// Replace the collection from a JSON value. Anything but an array empties it.
    pub fn from_json(&mut self, data: Value) -> Result<()> {
        if !data.is_array() {
            self.tasks.clear();
            return Ok(());
        }
        let records: Vec<TaskRecord> = serde_json::from_value(data)?;
        self.from_records(records)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }

    fn collect(&self, predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }

    fn resolve(&self, update: &TaskUpdate) -> Result<ResolvedUpdate> {
        let mut resolved = ResolvedUpdate::default();
        if let Some(content) = &update.content {
            resolved.content = Some(self.rules.validate(content)?);
        }
        if let Some(raw) = &update.priority {
            resolved.priority = self.apply_policy(raw.parse::<Priority>())?;
        }
        if let Some(raw) = &update.category {
            resolved.category = self.apply_policy(raw.parse::<Category>())?;
        }
        if let Some(raw) = &update.status {
            resolved.status = Some(raw.parse::<Status>()?);
        }
        Ok(resolved)
    }

    fn apply_policy<T>(&self, parsed: Result<T>) -> Result<Option<T>> {
        match (parsed, self.policy) {
            (Ok(value), _) => Ok(Some(value)),
            (Err(err), EnumUpdatePolicy::Reject) => Err(err),
            (Err(err), EnumUpdatePolicy::Ignore) => {
                tracing::debug!(error = %err, "ignoring invalid enum update");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with(contents: &[(&str, &str)]) -> (TaskManager, Vec<String>) {
        let mut manager = TaskManager::new();
        let ids = contents
            .iter()
            .map(|(content, owner)| {
                manager
                    .add_task(content, owner, None, None)
                    .expect("add task")
                    .id()
                    .to_string()
            })
            .collect();
        (manager, ids)
    }

    #[test]
    fn add_trims_and_applies_defaults() {
        let mut manager = TaskManager::new();
        let id = manager
            .add_task("  Write report  ", "  Ala ", None, None)
            .expect("add")
            .id()
            .to_string();
        let task = manager.get_task_by_id(&id).expect("task");
        assert_eq!(task.content(), "Write report");
        assert_eq!(task.owner(), "Ala");
        assert_eq!(task.status(), Status::Pending);
        assert_eq!(task.priority(), Priority::Medium);
        assert_eq!(task.category(), Category::Other);
    }

    #[test]
    fn add_uses_configured_defaults() {
        let config = TasksConfig {
            default_priority: Priority::High,
            default_category: Category::Study,
            ..TasksConfig::default()
        };
        let mut manager = TaskManager::with_config(&config);
        let task = manager.add_task("Revise", "Ala", None, None).expect("add");
        assert_eq!(task.priority(), Priority::High);
        assert_eq!(task.category(), Category::Study);
    }

    #[test]
    fn add_rejects_blank_content_and_owner() {
        let mut manager = TaskManager::new();
        assert!(manager.add_task("   ", "Ala", None, None).unwrap_err().is_validation());
        assert!(manager.add_task("Valid", " ", None, None).unwrap_err().is_validation());
        assert!(manager.is_empty());
    }

    #[test]
    fn edit_is_all_or_nothing_under_reject() {
        let (mut manager, ids) = manager_with(&[("Plan trip", "Ala")]);
        let update = TaskUpdate::new().content("Plan holiday").priority("urgent");
        assert!(manager.edit_task(&ids[0], &update).is_err());
        let task = manager.get_task_by_id(&ids[0]).expect("task");
        assert_eq!(task.content(), "Plan trip");
        assert_eq!(task.priority(), Priority::Medium);
    }

    #[test]
    fn edit_skips_bad_enum_under_ignore() {
        let (mut manager, ids) = manager_with(&[("Plan trip", "Ala")]);
        manager.set_policy(EnumUpdatePolicy::Ignore);
        let update = TaskUpdate::new()
            .content("Plan holiday")
            .priority("urgent")
            .category(Category::Hobby);
        assert!(manager.edit_task(&ids[0], &update).expect("edit"));
        let task = manager.get_task_by_id(&ids[0]).expect("task");
        assert_eq!(task.content(), "Plan holiday");
        assert_eq!(task.priority(), Priority::Medium);
        assert_eq!(task.category(), Category::Hobby);
    }

    #[test]
    fn edit_status_is_assignment() {
        let (mut manager, ids) = manager_with(&[("Plan trip", "Ala")]);
        let update = TaskUpdate::new().status(Status::Done);
        assert!(manager.edit_task(&ids[0], &update).expect("edit"));
        assert!(manager.edit_task(&ids[0], &update).expect("edit"));
        assert!(manager.get_task_by_id(&ids[0]).expect("task").is_done());
        assert!(manager
            .edit_task(&ids[0], &TaskUpdate::new().status("finished"))
            .is_err());
    }

    #[test]
    fn lossy_load_keeps_valid_records() {
        let (source, _) = manager_with(&[("Keep me", "Ala"), ("Drop me", "Ala")]);
        let mut records = source.to_records();
        records[1].user = "  ".to_string();

        let mut manager = TaskManager::new();
        assert!(manager.from_records(records.clone()).is_err());
        assert!(manager.is_empty());

        assert_eq!(manager.from_records_lossy(records), 1);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.all_tasks()[0].content(), "Keep me");
    }

    #[test]
    fn edit_unknown_id_is_false() {
        let mut manager = TaskManager::new();
        let update = TaskUpdate::new().content("Anything");
        assert!(!manager.edit_task("missing", &update).expect("edit"));
    }

    #[test]
    fn complete_and_reopen() {
        let (mut manager, ids) = manager_with(&[("Plan trip", "Ala")]);
        assert!(manager.complete_task(&ids[0]).expect("task").is_done());
        assert!(manager.reopen_task(&ids[0]).expect("task").is_pending());
        assert!(manager.complete_task("missing").is_none());
    }

    #[test]
    fn query_helpers_keep_insertion_order() {
        let (mut manager, ids) =
            manager_with(&[("First", "Ala"), ("Second", "Ola"), ("Third", "Ala")]);
        manager.toggle_task_status(&ids[2]);
        let owned: Vec<_> = manager
            .get_user_tasks("Ala")
            .iter()
            .map(|t| t.content().to_string())
            .collect();
        assert_eq!(owned, vec!["First", "Third"]);
        assert_eq!(manager.get_tasks_by_status(Status::Done).len(), 1);
        assert_eq!(manager.get_tasks_by_priority(Priority::Medium).len(), 3);
        assert_eq!(manager.get_tasks_by_category(Category::Work).len(), 0);
        assert_eq!(manager.user_task_count("Ola"), 1);
    }

    #[test]
    fn search_is_case_insensitive_and_blank_returns_all() {
        let (manager, _) = manager_with(&[("Buy MILK", "Ala"), ("Call mom", "Ala")]);
        assert_eq!(manager.search_tasks("milk").len(), 1);
        assert_eq!(manager.search_tasks("   ").len(), 2);
        assert!(manager.search_tasks("bread").is_empty());
    }

    #[test]
    fn from_json_non_array_empties() {
        let (mut manager, _) = manager_with(&[("Buy milk", "Ala")]);
        manager.from_json(serde_json::json!({"tasks": []})).expect("hydrate");
        assert!(manager.is_empty());
    }

    #[test]
    fn from_json_invalid_record_keeps_state() {
        let (mut manager, _) = manager_with(&[("Buy milk", "Ala")]);
        let bad = serde_json::json!([
            { "id": "x", "content": "c", "user": "Ala", "createdAt": "yesterday" }
        ]);
        assert!(manager.from_json(bad).is_err());
        assert_eq!(manager.len(), 1);
    }
}
