//! taskmaster stats command

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::stats::DetailedStats;
use crate::task::{Category, Priority};

#[derive(Serialize)]
struct StatsReport {
    scope: String,
    #[serde(flatten)]
    stats: DetailedStats,
}

pub fn run(global: &GlobalOptions, user: Option<&str>, all: bool) -> Result<()> {
    let app = global.open_app()?;
    let owner = if all {
        None
    } else {
        Some(app.resolve_owner(user)?)
    };
    let stats = app.stats(owner.as_deref());
    let scope = owner.unwrap_or_else(|| "all".to_string());

    let header = if all {
        "Statistics for all users".to_string()
    } else {
        format!("Statistics for {scope}")
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("Active", stats.active.to_string());
    human.push_summary("Completion", format!("{}%", stats.completion_rate));
    human.push_summary("Created today", stats.created_today.to_string());
    human.push_summary("Created this week", stats.created_this_week.to_string());
    human.push_summary("Average per day", format!("{:.1}", stats.average_per_day));
    if let Some(day) = &stats.most_productive_day {
        human.push_summary("Most productive day", format!("{} ({})", day.weekday, day.count));
    }
    for priority in Priority::ALL {
        human.push_detail(format!(
            "priority {priority}: {}",
            stats.by_priority.get(priority)
        ));
    }
    for category in Category::ALL {
        if let Some(count) = stats.by_category.get(&category) {
            human.push_detail(format!("category {category}: {count}"));
        }
    }

    let report = StatsReport { scope, stats };
    emit_success(global.output(), "stats", &report, Some(&human))
}
