use crate::config::Config;
use crate::db::Database;
use crate::stats::{
    FinanceOverview, TodayItem, current_streak, days_remaining, finance_overview, goal_progress,
    today_items, weekly_consistency,
};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalLine {
    pub id: String,
    pub title: String,
    pub category: String,
    pub percent: u8,
    pub current_value: f64,
    pub target_value: Option<f64>,
    pub days_remaining: Option<i64>,
    pub daily_action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    pub display_name: Option<String>,
    pub routines: Vec<TodayItem>,
    pub done_count: usize,
    pub due_count: usize,
    pub streak_days: u32,
    pub consistency_percent: u8,
    pub goals: Vec<GoalLine>,
    pub finance: FinanceOverview,
}

pub fn summary_for_date(config: &Config, date: NaiveDate) -> Result<DailySummary> {
    let database = Database::open(&config.db_path)?;

    let routines = database.list_routines()?;
    let completions = database.completions_for_date(date)?;
    let trailing_week = database.completions_between(date - Duration::days(6), date)?;
    let completion_dates = database.completion_dates()?;
    let goals = database.list_goals()?;
    let expenses = database.list_expenses()?;
    let savings = database.list_savings_goals()?;
    let settings = database.finance_settings()?;
    let profile = database.profile()?;

    let items = today_items(&routines, &completions, date);
    let done_count = items.iter().filter(|item| item.done).count();
    let due_count = items.len();

    let goal_lines = goals
        .iter()
        .filter(|goal| goal.is_active)
        .map(|goal| GoalLine {
            id: goal.id.clone(),
            title: goal.title.clone(),
            category: goal.category.clone(),
            percent: goal_progress(goal.current_value, goal.target_value),
            current_value: goal.current_value.unwrap_or(0.0),
            target_value: goal.target_value,
            days_remaining: goal
                .target_date
                .map(|target_date| days_remaining(target_date, date)),
            daily_action: goal.daily_action.clone(),
        })
        .collect();

    Ok(DailySummary {
        date: date.format("%Y-%m-%d").to_string(),
        display_name: profile.and_then(|profile| profile.display_name),
        routines: items,
        done_count,
        due_count,
        streak_days: current_streak(&completion_dates, date),
        consistency_percent: weekly_consistency(&routines, &trailing_week, date),
        goals: goal_lines,
        finance: finance_overview(settings.as_ref(), &expenses, &savings, date),
    })
}

pub fn render_markdown(summary: &DailySummary) -> String {
    let routine_rows = if summary.routines.is_empty() {
        "- No routines due".to_string()
    } else {
        summary
            .routines
            .iter()
            .map(|item| {
                format!(
                    "- [{}] {} {} ({})",
                    if item.done { "x" } else { " " },
                    item.start_time,
                    item.title,
                    format_duration_minutes(item.duration_minutes)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let goal_rows = if summary.goals.is_empty() {
        "- No active goals".to_string()
    } else {
        summary
            .goals
            .iter()
            .map(|goal| {
                let target = goal
                    .target_value
                    .map(|target| format!(" ({} / {})", trim_number(goal.current_value), trim_number(target)))
                    .unwrap_or_default();
                let deadline = goal
                    .days_remaining
                    .map(|days| format!(", {days} days left"))
                    .unwrap_or_default();
                format!(
                    "- {} [{}]: {}%{}{}",
                    goal.title, goal.category, goal.percent, target, deadline
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let finance = &summary.finance;
    let fixed_share = if finance.monthly_income > 0.0 {
        format!(
            " ({:.0}% of income)",
            finance.fixed_monthly / finance.monthly_income * 100.0
        )
    } else {
        String::new()
    };

    let breakdown_rows = if finance.breakdown.is_empty() {
        "- No expenses recorded".to_string()
    } else {
        finance
            .breakdown
            .iter()
            .map(|share| {
                format!(
                    "| {} | {} | {}% |",
                    share.category,
                    format_money(share.monthly, &finance.currency),
                    share.percent
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let breakdown_section = if finance.breakdown.is_empty() {
        breakdown_rows
    } else {
        format!("| Category | Monthly | Share |\n|----------|---------|-------|\n{breakdown_rows}")
    };

    let savings_rows = if finance.savings.is_empty() {
        "- No savings goals".to_string()
    } else {
        finance
            .savings
            .iter()
            .map(|progress| {
                format!(
                    "- {}: {}% ({} / {})",
                    progress.title,
                    progress.percent,
                    format_money(progress.current_amount, &finance.currency),
                    format_money(progress.target_amount, &finance.currency)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# Orbit Daily Summary - {}\n\n## Today\n- Routines: {} of {} done\n- Streak: {} days\n- Consistency (7 days): {}%\n\n## Routines\n{}\n\n## Goals\n{}\n\n## Budget\n- Income: {}\n- Fixed expenses: {}{}\n- Available to save: {}\n- Daily budget: {}\n\n## Expenses\n{}\n\n## Savings\n{}\n",
        summary.date,
        summary.done_count,
        summary.due_count,
        summary.streak_days,
        summary.consistency_percent,
        routine_rows,
        goal_rows,
        format_money(finance.monthly_income, &finance.currency),
        format_money(finance.fixed_monthly, &finance.currency),
        fixed_share,
        format_money(finance.available_to_save, &finance.currency),
        format_money(finance.daily_budget, &finance.currency),
        breakdown_section,
        savings_rows
    )
}

/// One-line recap used by the evening review notification.
pub fn review_line(summary: &DailySummary) -> String {
    if summary.due_count == 0 {
        return format!("No routines due today. Streak: {} days.", summary.streak_days);
    }

    format!(
        "{} of {} routines done. Streak: {} days.",
        summary.done_count, summary.due_count, summary.streak_days
    )
}

pub fn format_money(value: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${value:.2}"),
        "EUR" => format!("€{value:.2}"),
        "GBP" => format!("£{value:.2}"),
        "JPY" => format!("¥{value:.2}"),
        "CAD" => format!("CA${value:.2}"),
        "AUD" => format!("A${value:.2}"),
        "TZS" => format!("TSh {value:.2}"),
        "KES" => format!("KSh {value:.2}"),
        _ => format!("{currency} {value:.2}"),
    }
}

pub fn format_duration_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let remain = minutes % 60;

    if hours > 0 {
        if remain == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {remain}m")
        }
    } else {
        format!("{remain}m")
    }
}

pub fn trim_number(value: f64) -> String {
    if (value - value.round()).abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewRoutine;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn summary_counts_and_review_line() {
        let dir = TempDir::new().expect("tempdir");
        let config = Config {
            db_path: dir.path().join("orbit.db"),
            ..Config::default()
        };
        let mut database = Database::open(&config.db_path).expect("open db");

        let routine = database
            .insert_routine(&NewRoutine {
                title: "Morning run".to_string(),
                description: None,
                start_time: "06:30".to_string(),
                duration_minutes: 45,
                frequency: "daily".to_string(),
                custom_days: None,
                alarm_enabled: true,
            })
            .expect("insert");

        let date = NaiveDate::from_ymd_opt(2024, 3, 11).expect("date");
        database
            .toggle_completion(&routine.id, date)
            .expect("toggle");

        let summary = summary_for_date(&config, date).expect("summary");
        assert_eq!(summary.due_count, 1);
        assert_eq!(summary.done_count, 1);
        assert_eq!(summary.streak_days, 1);
        assert_eq!(review_line(&summary), "1 of 1 routines done. Streak: 1 days.");

        let markdown = render_markdown(&summary);
        assert!(markdown.contains("# Orbit Daily Summary - 2024-03-11"));
        assert!(markdown.contains("- [x] 06:30 Morning run (45m)"));
    }

    #[test]
    fn money_and_duration_formatting() {
        assert_eq!(format_money(55.0, "USD"), "$55.00");
        assert_eq!(format_money(120.5, "EUR"), "€120.50");
        assert_eq!(format_money(2000.0, "TZS"), "TSh 2000.00");
        assert_eq!(format_money(42.0, "CHF"), "CHF 42.00");

        assert_eq!(format_duration_minutes(45), "45m");
        assert_eq!(format_duration_minutes(90), "1h 30m");
        assert_eq!(format_duration_minutes(120), "2h");
    }
}
