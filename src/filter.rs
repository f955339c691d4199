//! Filtering, sorting and grouping over task sequences.
//!
//! Every function here takes a borrowed slice and returns a freshly built
//! collection; the input is never reordered or mutated.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::task::{Category, Priority, Status, Task};

const ALL_SENTINEL: &str = "all";

/// One filter dimension: either no filtering (`All`) or an exact match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion<T> {
    All,
    Only(T),
}

impl<T> Default for Criterion<T> {
    fn default() -> Self {
        Criterion::All
    }
}

impl<T: PartialEq> Criterion<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Criterion::All => true,
            Criterion::Only(expected) => expected == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Criterion::All)
    }
}

impl<T> From<Option<T>> for Criterion<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Criterion::All, Criterion::Only)
    }
}

/// `"all"` (any case) and blank input mean no filtering.
impl<T> FromStr for Criterion<T>
where
    T: FromStr<Err = Error>,
{
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            return Ok(Criterion::All);
        }
        trimmed.parse().map(Criterion::Only)
    }
}

/// Owner criterion from free text, with the same sentinel rules.
pub fn owner_criterion(value: Option<&str>) -> Criterion<String> {
    match value.map(str::trim) {
        None | Some("") => Criterion::All,
        Some(name) if name.eq_ignore_ascii_case(ALL_SENTINEL) => Criterion::All,
        Some(name) => Criterion::Only(name.to_string()),
    }
}

/// The full criteria set accepted by [`apply_all_filters`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub status: Criterion<Status>,
    pub priority: Criterion<Priority>,
    pub category: Criterion<Category>,
    pub owner: Criterion<String>,
    pub search_term: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_all()
            && self.priority.is_all()
            && self.category.is_all()
            && self.owner.is_all()
            && self.search_term.as_deref().map_or(true, |term| term.trim().is_empty())
            && self.from.is_none()
            && self.to.is_none()
    }
}

fn retain(tasks: &[Task], predicate: impl Fn(&Task) -> bool) -> Vec<Task> {
    tasks.iter().filter(|task| predicate(task)).cloned().collect()
}

pub fn by_status(tasks: &[Task], status: &Criterion<Status>) -> Vec<Task> {
    retain(tasks, |task| status.matches(&task.status()))
}

pub fn by_priority(tasks: &[Task], priority: &Criterion<Priority>) -> Vec<Task> {
    retain(tasks, |task| priority.matches(&task.priority()))
}

pub fn by_category(tasks: &[Task], category: &Criterion<Category>) -> Vec<Task> {
    retain(tasks, |task| category.matches(&task.category()))
}

pub fn by_owner(tasks: &[Task], owner: &Criterion<String>) -> Vec<Task> {
    match owner {
        Criterion::All => tasks.to_vec(),
        Criterion::Only(name) => retain(tasks, |task| task.belongs_to(name)),
    }
}

/// Case-insensitive substring match on content. Blank terms keep everything.
pub fn by_search_term(tasks: &[Task], term: &str) -> Vec<Task> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return tasks.to_vec();
    }
    retain(tasks, |task| task.content().to_lowercase().contains(&term))
}

/// Creation time within `[from, to]`; either bound may be open.
pub fn by_date_range(
    tasks: &[Task],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<Task> {
    retain(tasks, |task| {
        let created = task.created_at();
        from.map_or(true, |from| created >= from) && to.map_or(true, |to| created <= to)
    })
}

/// Narrow by every active criterion in turn: status, priority, category,
/// owner, search term, then date range.
pub fn apply_all_filters(tasks: &[Task], filters: &TaskFilters) -> Vec<Task> {
    let mut filtered = tasks.to_vec();
    if !filters.status.is_all() {
        filtered = by_status(&filtered, &filters.status);
    }
    if !filters.priority.is_all() {
        filtered = by_priority(&filtered, &filters.priority);
    }
    if !filters.category.is_all() {
        filtered = by_category(&filtered, &filters.category);
    }
    if !filters.owner.is_all() {
        filtered = by_owner(&filtered, &filters.owner);
    }
    if let Some(term) = filters.search_term.as_deref() {
        filtered = by_search_term(&filtered, term);
    }
    if filters.from.is_some() || filters.to.is_some() {
        filtered = by_date_range(&filtered, filters.from, filters.to);
    }
    filtered
}

/// Tasks created on the same calendar day as `now`, in `now`'s time zone.
pub fn created_on_day_of<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Vec<Task> {
    let today = now.date_naive();
    let tz = now.timezone();
    retain(tasks, |task| task.created_at().with_timezone(&tz).date_naive() == today)
}

pub fn created_today(tasks: &[Task]) -> Vec<Task> {
    created_on_day_of(tasks, &Local::now())
}

/// Tasks created since the most recent Sunday midnight before `now`.
pub fn created_in_week_of<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> Vec<Task> {
    let tz = now.timezone();
    let days_since_sunday = i64::from(now.weekday().num_days_from_sunday());
    let week_start_day = now.date_naive() - Duration::days(days_since_sunday);
    retain(tasks, |task| {
        task.created_at().with_timezone(&tz).date_naive() >= week_start_day
    })
}

pub fn created_this_week(tasks: &[Task]) -> Vec<Task> {
    created_in_week_of(tasks, &Local::now())
}

pub fn high_priority(tasks: &[Task]) -> Vec<Task> {
    by_priority(tasks, &Criterion::Only(Priority::High))
}

pub fn completed(tasks: &[Task]) -> Vec<Task> {
    by_status(tasks, &Criterion::Only(Status::Done))
}

pub fn pending(tasks: &[Task]) -> Vec<Task> {
    by_status(tasks, &Criterion::Only(Status::Pending))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Date,
    Priority,
    Category,
    Content,
    Status,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "priority" => Ok(SortKey::Priority),
            "category" => Ok(SortKey::Category),
            "content" => Ok(SortKey::Content),
            "status" => Ok(SortKey::Status),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort key '{other}' (expected date|priority|category|content|status)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort order '{other}' (expected asc|desc)"
            ))),
        }
    }
}

fn ascending(key: SortKey, left: &Task, right: &Task) -> Ordering {
    match key {
        SortKey::Date => left.created_at().cmp(&right.created_at()),
        SortKey::Priority => left.priority().rank().cmp(&right.priority().rank()),
        SortKey::Category => left.category().as_str().cmp(right.category().as_str()),
        SortKey::Content => left.content().cmp(right.content()),
        SortKey::Status => left.status().as_str().cmp(right.status().as_str()),
    }
}

/// Stable sort into a new vector; equal keys keep their input order in
/// both directions.
pub fn sort_tasks_by(tasks: &[Task], key: SortKey, order: SortOrder) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|left, right| {
        let ordering = ascending(key, left, right);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    sorted
}

/// Sort by a textual key. Unknown keys return an unchanged copy.
pub fn sort_tasks(tasks: &[Task], sort_by: &str, order: SortOrder) -> Vec<Task> {
    match sort_by.parse::<SortKey>() {
        Ok(key) => sort_tasks_by(tasks, key, order),
        Err(_) => tasks.to_vec(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Status,
    Priority,
    Category,
    Owner,
    Date,
}

impl FromStr for GroupBy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(GroupBy::Status),
            "priority" => Ok(GroupBy::Priority),
            "category" => Ok(GroupBy::Category),
            "owner" | "user" => Ok(GroupBy::Owner),
            "date" => Ok(GroupBy::Date),
            other => Err(Error::InvalidArgument(format!(
                "unknown group key '{other}' (expected status|priority|category|owner|date)"
            ))),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupBy::Status => "status",
            GroupBy::Priority => "priority",
            GroupBy::Category => "category",
            GroupBy::Owner => "owner",
            GroupBy::Date => "date",
        };
        f.write_str(name)
    }
}

pub type TaskGroups = BTreeMap<String, Vec<Task>>;

/// Partition by a dimension, keeping input order inside each group. `None`
/// puts everything under `"all"`. Date keys are `YYYY-MM-DD` in `tz`.
pub fn group_tasks_in<Tz: TimeZone>(
    tasks: &[Task],
    group_by: Option<GroupBy>,
    tz: &Tz,
) -> TaskGroups {
    let mut groups = TaskGroups::new();
    for task in tasks {
        let key = match group_by {
            Some(GroupBy::Status) => task.status().to_string(),
            Some(GroupBy::Priority) => task.priority().to_string(),
            Some(GroupBy::Category) => task.category().to_string(),
            Some(GroupBy::Owner) => task.owner().to_string(),
            Some(GroupBy::Date) => task
                .created_at()
                .with_timezone(tz)
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
            None => ALL_SENTINEL.to_string(),
        };
        groups.entry(key).or_default().push(task.clone());
    }
    groups
}

/// Group by a textual key in local time. Unknown keys group under `"all"`.
pub fn group_tasks(tasks: &[Task], group_by: &str) -> TaskGroups {
    group_tasks_in(tasks, group_by.parse().ok(), &Local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_parses_sentinel() {
        assert_eq!("all".parse::<Criterion<Status>>().unwrap(), Criterion::All);
        assert_eq!("  ".parse::<Criterion<Status>>().unwrap(), Criterion::All);
        assert_eq!(
            "ALL".parse::<Criterion<Priority>>().unwrap(),
            Criterion::All
        );
        assert_eq!(
            "done".parse::<Criterion<Status>>().unwrap(),
            Criterion::Only(Status::Done)
        );
        assert!("soon".parse::<Criterion<Status>>().is_err());
    }

    #[test]
    fn owner_criterion_sentinels() {
        assert_eq!(owner_criterion(None), Criterion::All);
        assert_eq!(owner_criterion(Some(" ")), Criterion::All);
        assert_eq!(owner_criterion(Some("All")), Criterion::All);
        assert_eq!(
            owner_criterion(Some(" Ala ")),
            Criterion::Only("Ala".to_string())
        );
    }

    #[test]
    fn default_filters_are_empty() {
        let mut filters = TaskFilters::default();
        assert!(filters.is_empty());
        filters.search_term = Some("  ".to_string());
        assert!(filters.is_empty());
        filters.status = Criterion::Only(Status::Done);
        assert!(!filters.is_empty());
    }

    #[test]
    fn sort_key_and_order_parse() {
        assert_eq!("Priority".parse::<SortKey>().unwrap(), SortKey::Priority);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
        assert!("random".parse::<SortKey>().is_err());
        assert_eq!("user".parse::<GroupBy>().unwrap(), GroupBy::Owner);
    }
}
