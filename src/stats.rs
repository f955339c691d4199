//! Aggregates over task sequences.
//!
//! Functions that depend on "now" or on calendar days come in two forms: an
//! `_at`/`_in` variant taking an explicit reference time or time zone, and a
//! convenience wrapper that uses the local clock.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Local, TimeZone, Utc, Weekday};
use serde::{Serialize, Serializer};

use crate::task::{Category, Priority, Task};

pub const DEFAULT_AVERAGE_WINDOW_DAYS: u32 = 7;
const ROLLING_WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityBreakdown {
    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

/// Only categories that occur are present.
pub type CategoryBreakdown = BTreeMap<Category, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MostProductiveDay {
    #[serde(serialize_with = "weekday_name")]
    pub weekday: Weekday,
    pub count: usize,
}

fn weekday_name<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
    let name = match weekday {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    };
    serializer.serialize_str(name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub completion_rate: u32,
    pub by_priority: PriorityBreakdown,
    pub by_category: CategoryBreakdown,
    pub created_today: usize,
    pub created_this_week: usize,
    pub average_per_day: f64,
    pub most_productive_day: Option<MostProductiveDay>,
}

pub fn total(tasks: &[Task]) -> usize {
    tasks.len()
}

pub fn completed(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.is_done()).count()
}

pub fn active(tasks: &[Task]) -> usize {
    tasks.iter().filter(|task| task.is_pending()).count()
}

/// Percentage of done tasks, rounded. Zero for an empty set.
pub fn completion_rate(tasks: &[Task]) -> u32 {
    let total = total(tasks);
    if total == 0 {
        return 0;
    }
    (completed(tasks) as f64 / total as f64 * 100.0).round() as u32
}

pub fn by_priority(tasks: &[Task]) -> PriorityBreakdown {
    let mut breakdown = PriorityBreakdown::default();
    for task in tasks {
        match task.priority() {
            Priority::High => breakdown.high += 1,
            Priority::Medium => breakdown.medium += 1,
            Priority::Low => breakdown.low += 1,
        }
    }
    breakdown
}

pub fn by_category(tasks: &[Task]) -> CategoryBreakdown {
    let mut breakdown = CategoryBreakdown::new();
    for task in tasks {
        *breakdown.entry(task.category()).or_insert(0) += 1;
    }
    breakdown
}

/// Tasks created on `now`'s calendar day, in `now`'s time zone.
pub fn tasks_created_today_at<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> usize {
    let today = now.date_naive();
    let tz = now.timezone();
    tasks
        .iter()
        .filter(|task| task.created_at().with_timezone(&tz).date_naive() == today)
        .count()
}

pub fn tasks_created_today(tasks: &[Task]) -> usize {
    tasks_created_today_at(tasks, &Local::now())
}

/// Tasks created in the seven days up to `now` (rolling, not calendar week).
pub fn tasks_created_this_week_at(tasks: &[Task], now: DateTime<Utc>) -> usize {
    let cutoff = now - Duration::days(ROLLING_WEEK_DAYS);
    tasks
        .iter()
        .filter(|task| task.created_at() >= cutoff)
        .count()
}

pub fn tasks_created_this_week(tasks: &[Task]) -> usize {
    tasks_created_this_week_at(tasks, Utc::now())
}

/// Rolling-week creations divided by `days`, rounded to one decimal.
pub fn average_tasks_per_day_at(tasks: &[Task], days: u32, now: DateTime<Utc>) -> f64 {
    if tasks.is_empty() || days == 0 {
        return 0.0;
    }
    let created = tasks_created_this_week_at(tasks, now) as f64;
    (created / f64::from(days) * 10.0).round() / 10.0
}

pub fn average_tasks_per_day(tasks: &[Task], days: u32) -> f64 {
    average_tasks_per_day_at(tasks, days, Utc::now())
}

/// Weekday with the most creations, counted in `tz`. Ties go to the
/// earliest weekday, Sunday first.
pub fn most_productive_day_in<Tz: TimeZone>(tasks: &[Task], tz: &Tz) -> Option<MostProductiveDay> {
    if tasks.is_empty() {
        return None;
    }
    let mut counts = [0usize; 7];
    for task in tasks {
        let weekday = task.created_at().with_timezone(tz).weekday();
        counts[weekday.num_days_from_sunday() as usize] += 1;
    }

    let mut best = 0;
    for index in 1..counts.len() {
        if counts[index] > counts[best] {
            best = index;
        }
    }
    Some(MostProductiveDay {
        weekday: weekday_from_sunday(best),
        count: counts[best],
    })
}

pub fn most_productive_day(tasks: &[Task]) -> Option<MostProductiveDay> {
    most_productive_day_in(tasks, &Local)
}

fn weekday_from_sunday(index: usize) -> Weekday {
    match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Every aggregate in one snapshot, relative to `now`.
pub fn detailed_stats_at<Tz: TimeZone>(
    tasks: &[Task],
    now: &DateTime<Tz>,
    average_window_days: u32,
) -> DetailedStats {
    let now_utc = now.with_timezone(&Utc);
    DetailedStats {
        total: total(tasks),
        completed: completed(tasks),
        active: active(tasks),
        completion_rate: completion_rate(tasks),
        by_priority: by_priority(tasks),
        by_category: by_category(tasks),
        created_today: tasks_created_today_at(tasks, now),
        created_this_week: tasks_created_this_week_at(tasks, now_utc),
        average_per_day: average_tasks_per_day_at(tasks, average_window_days, now_utc),
        most_productive_day: most_productive_day_in(tasks, &now.timezone()),
    }
}

pub fn detailed_stats(tasks: &[Task]) -> DetailedStats {
    detailed_stats_at(tasks, &Local::now(), DEFAULT_AVERAGE_WINDOW_DAYS)
}
