//! Task entity for taskmaster.
//!
//! A task is owned by exactly one profile, referenced by name. Identity
//! (`id`, `owner`, `created_at`) is fixed at creation; only the
//! [`TaskManager`](crate::manager::TaskManager) mutates the rest.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ulid::Ulid;

use crate::config::TasksConfig;
use crate::error::{Error, Result};

const TASK_ID_PREFIX: &str = "task";
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

pub const DEFAULT_CONTENT_MIN_LEN: usize = 3;
pub const DEFAULT_CONTENT_MAX_LEN: usize = 500;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Done,
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Pending, Status::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Done => "done",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Done,
            Status::Done => Status::Pending,
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "done" => Ok(Status::Done),
            other => Err(Error::Validation(format!(
                "unknown status '{other}' (expected pending|done)"
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Highest first, the order used for breakdowns and pickers.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Sort rank: high 3, medium 2, low 1.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::Validation(format!(
                "unknown priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "praca")]
    Work,
    #[serde(alias = "nauka")]
    Study,
    Hobby,
    #[serde(alias = "dom")]
    Home,
    #[default]
    #[serde(alias = "inne")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Study,
        Category::Hobby,
        Category::Home,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Study => "study",
            Category::Hobby => "hobby",
            Category::Home => "home",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "work" | "praca" => Ok(Category::Work),
            "study" | "nauka" => Ok(Category::Study),
            "hobby" => Ok(Category::Hobby),
            "home" | "dom" => Ok(Category::Home),
            "other" | "inne" => Ok(Category::Other),
            other => Err(Error::Validation(format!(
                "unknown category '{other}' (expected work|study|hobby|home|other)"
            ))),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Status, Priority, Category);

/// Length bounds applied to task content after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRules {
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for ContentRules {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_CONTENT_MIN_LEN,
            max_len: DEFAULT_CONTENT_MAX_LEN,
        }
    }
}

impl From<&TasksConfig> for ContentRules {
    fn from(config: &TasksConfig) -> Self {
        Self {
            min_len: config.content_min_len,
            max_len: config.content_max_len,
        }
    }
}

impl ContentRules {
    /// Trim and check content, returning the value to store.
    pub fn validate(&self, content: &str) -> Result<String> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("content cannot be empty".to_string()));
        }
        let len = trimmed.chars().count();
        if len < self.min_len || len > self.max_len {
            return Err(Error::Validation(format!(
                "content must be {} to {} characters (got {len})",
                self.min_len, self.max_len
            )));
        }
        Ok(trimmed.to_string())
    }
}

/// Trim and check an owner name. Existence is the coordinator's concern.
pub fn validate_owner(owner: &str) -> Result<String> {
    let trimmed = owner.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("owner cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// New task id: `task_` followed by a lowercase ULID (ms timestamp + 80 random bits).
pub fn generate_task_id() -> String {
    format!(
        "{}_{}",
        TASK_ID_PREFIX,
        Ulid::new().to_string().to_ascii_lowercase()
    )
}

/// Current time truncated to milliseconds, the precision kept on the wire.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: String,
    content: String,
    owner: String,
    status: Status,
    priority: Priority,
    category: Category,
    created_at: DateTime<Utc>,
}

impl Task {
    pub(crate) fn create(
        content: String,
        owner: String,
        priority: Priority,
        category: Category,
    ) -> Self {
        Self {
            id: generate_task_id(),
            content,
            owner,
            status: Status::Pending,
            priority,
            category,
            created_at: now_millis(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn belongs_to(&self, owner: &str) -> bool {
        self.owner == owner
    }

    /// Whole days since creation, rounded up.
    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.created_at).num_milliseconds().abs();
        (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub(crate) fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub(crate) fn mark_done(&mut self) {
        self.status = Status::Done;
    }

    pub(crate) fn mark_pending(&mut self) {
        self.status = Status::Pending;
    }

    pub(crate) fn toggle_status(&mut self) {
        self.status = self.status.toggled();
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            id: self.id.clone(),
            content: self.content.clone(),
            user: self.owner.clone(),
            status: self.status,
            priority: self.priority,
            category: self.category,
            created_at: self.created_at,
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = Error;

    fn try_from(record: TaskRecord) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(Error::Validation("task id cannot be empty".to_string()));
        }
        let owner = validate_owner(&record.user)?;
        Ok(Self {
            id: record.id,
            content: record.content,
            owner,
            status: record.status,
            priority: record.priority,
            category: record.category,
            created_at: record.created_at,
        })
    }
}

/// Serialized task shape stored under the tasks key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub content: String,
    #[serde(deserialize_with = "owner_name")]
    pub user: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(with = "iso8601")]
    pub created_at: DateTime<Utc>,
}

/// Older saves stored the owner as a profile object; keep only its name.
fn owner_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OwnerRef {
        Name(String),
        Profile { name: String },
    }

    Ok(match OwnerRef::deserialize(deserializer)? {
        OwnerRef::Name(name) | OwnerRef::Profile { name } => name,
    })
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
pub(crate) mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|value| value.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
