//! User profiles.
//!
//! A profile is a named task owner, not an authenticated identity. The
//! counters on [`User`] are a cache over the task collection and are
//! recomputed by the [`App`](crate::app::App) after every task mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{iso8601, now_millis, Task};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;

const POLISH_LETTERS: &str = "ąćęłńóśźżĄĆĘŁŃÓŚŹŻ";
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch.is_whitespace()
        || ch == '-'
        || ch == '_'
        || POLISH_LETTERS.contains(ch)
}

/// Trim and check a profile name, returning the value to store.
pub fn validate_user_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        return Err(Error::Validation(format!(
            "user name must be {NAME_MIN_LEN} to {NAME_MAX_LEN} characters"
        )));
    }
    if let Some(bad) = trimmed.chars().find(|ch| !is_name_char(*ch)) {
        return Err(Error::Validation(format!(
            "user name contains invalid character '{bad}' \
             (letters, digits, spaces, '-' and '_' only)"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn is_valid_user_name(name: &str) -> bool {
    validate_user_name(name).is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    name: String,
    #[serde(with = "iso8601")]
    created_at: DateTime<Utc>,
    #[serde(with = "iso8601")]
    last_activity: DateTime<Utc>,
    task_count: usize,
    completed_task_count: usize,
}

impl User {
    pub fn new(name: &str) -> Result<Self> {
        let name = validate_user_name(name)?;
        let now = now_millis();
        Ok(Self {
            name,
            created_at: now,
            last_activity: now,
            task_count: 0,
            completed_task_count: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    pub fn completed_task_count(&self) -> usize {
        self.completed_task_count
    }

    pub fn active_task_count(&self) -> usize {
        self.task_count - self.completed_task_count
    }

    pub fn touch(&mut self) {
        self.last_activity = now_millis();
    }

    /// Whole days since the profile was created, rounded up.
    pub fn account_age_in_days(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.created_at).num_milliseconds().abs();
        (elapsed + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }

    /// Recount the cached counters from the owner's tasks.
    pub fn recount<'a>(&mut self, tasks: impl IntoIterator<Item = &'a Task>) {
        let mut total = 0;
        let mut completed = 0;
        for task in tasks.into_iter().filter(|task| task.belongs_to(&self.name)) {
            total += 1;
            if task.is_done() {
                completed += 1;
            }
        }
        self.task_count = total;
        self.completed_task_count = completed;
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord::Profile {
            name: self.name.clone(),
            created_at: self.created_at,
            last_activity: Some(self.last_activity),
        }
    }

    /// Rebuild a user from its stored form. Bare names become fresh profiles.
    pub fn from_record(record: UserRecord) -> Result<Self> {
        match record {
            UserRecord::Name(name) => Self::new(&name),
            UserRecord::Profile {
                name,
                created_at,
                last_activity,
            } => {
                let name = validate_user_name(&name)?;
                Ok(Self {
                    name,
                    created_at,
                    last_activity: last_activity.unwrap_or(created_at),
                    task_count: 0,
                    completed_task_count: 0,
                })
            }
        }
    }
}

/// Stored form of a profile. Early saves kept only the list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRecord {
    Name(String),
    #[serde(rename_all = "camelCase")]
    Profile {
        name: String,
        #[serde(with = "iso8601")]
        created_at: DateTime<Utc>,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            with = "optional_iso8601"
        )]
        last_activity: Option<DateTime<Utc>>,
    },
}

mod optional_iso8601 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::task::iso8601;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&iso8601::format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|raw| {
            DateTime::parse_from_rfc3339(raw.trim())
                .map(|value| value.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Category, Priority};

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_user_name("  Ala  ").unwrap(), "Ala");
        assert!(validate_user_name("A").is_err());
        assert!(validate_user_name(&"a".repeat(51)).is_err());
        assert!(validate_user_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn names_allow_polish_letters_and_separators() {
        assert!(is_valid_user_name("Łukasz Żółć"));
        assert!(is_valid_user_name("user_01-test"));
        assert!(!is_valid_user_name("bob@example"));
        assert!(!is_valid_user_name("<script>"));
    }

    #[test]
    fn bare_name_record_becomes_profile() {
        let record: UserRecord = serde_json::from_str("\"Ola\"").unwrap();
        let user = User::from_record(record).unwrap();
        assert_eq!(user.name(), "Ola");
        assert_eq!(user.created_at(), user.last_activity());
    }

    #[test]
    fn profile_record_round_trips() {
        let user = User::new("Kasia").unwrap();
        let json = serde_json::to_string(&user.to_record()).unwrap();
        assert!(json.contains("\"createdAt\""));
        let back = User::from_record(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn missing_last_activity_falls_back_to_created_at() {
        let raw = r#"{"name":"Ola","createdAt":"2024-02-01T08:00:00.000Z"}"#;
        let user = User::from_record(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(user.last_activity(), user.created_at());
    }

    #[test]
    fn recount_only_counts_own_tasks() {
        let mut user = User::new("Ala").unwrap();
        let mut done = Task::create("Done".into(), "Ala".into(), Priority::Low, Category::Work);
        done.mark_done();
        let tasks = vec![
            done,
            Task::create("Open".into(), "Ala".into(), Priority::Low, Category::Work),
            Task::create("Other".into(), "Ola".into(), Priority::Low, Category::Work),
        ];
        user.recount(&tasks);
        assert_eq!(user.task_count(), 2);
        assert_eq!(user.completed_task_count(), 1);
        assert_eq!(user.active_task_count(), 1);
    }
}
