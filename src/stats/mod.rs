pub mod report;

use crate::alarm;
use crate::db::{ExpenseRow, FinanceSettingsRow, RoutineRow, SavingsGoalRow, TaskCompletionRow};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Consecutive days with at least one completion, anchored at `today` or
/// yesterday. Older anchors mean the streak is broken and count as zero.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut unique: Vec<NaiveDate> = dates
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    unique.sort_unstable_by(|left, right| right.cmp(left));

    let Some(&most_recent) = unique.first() else {
        return 0;
    };
    if most_recent != today && most_recent != today - Duration::days(1) {
        return 0;
    }

    let mut streak = 1;
    let mut cursor = most_recent;
    for &date in &unique[1..] {
        if date == cursor - Duration::days(1) {
            streak += 1;
            cursor = date;
        } else {
            break;
        }
    }

    streak
}

/// Percentage toward a goal target, rounded and clamped to 0..=100.
/// A missing or non-positive target reads as no progress.
pub fn goal_progress(current: Option<f64>, target: Option<f64>) -> u8 {
    let target = target.unwrap_or(0.0);
    if target <= 0.0 {
        return 0;
    }

    let current = current.unwrap_or(0.0);
    (current / target * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn days_remaining(target_date: NaiveDate, today: NaiveDate) -> i64 {
    (target_date - today).num_days().max(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodayItem {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub frequency: String,
    pub done: bool,
}

/// Active routines due on the given date, in the caller's order, marked
/// done from that date's completions.
pub fn today_items(
    routines: &[RoutineRow],
    completions: &[TaskCompletionRow],
    date: NaiveDate,
) -> Vec<TodayItem> {
    let completed: HashSet<&str> = completions
        .iter()
        .filter(|completion| completion.completed_date == date)
        .map(|completion| completion.routine_id.as_str())
        .collect();

    routines
        .iter()
        .filter(|routine| routine.is_active && alarm::due_on(routine, date))
        .map(|routine| TodayItem {
            id: routine.id.clone(),
            title: routine.title.clone(),
            start_time: routine.start_time.clone(),
            duration_minutes: routine.duration_minutes,
            frequency: routine.frequency.clone(),
            done: completed.contains(routine.id.as_str()),
        })
        .collect()
}

/// Completed due-slots over the trailing seven days, as a percentage.
/// Routines only count as due from the day they were created.
pub fn weekly_consistency(
    routines: &[RoutineRow],
    completions: &[TaskCompletionRow],
    today: NaiveDate,
) -> u8 {
    let completed: HashSet<(&str, NaiveDate)> = completions
        .iter()
        .map(|completion| (completion.routine_id.as_str(), completion.completed_date))
        .collect();

    let mut due_slots = 0u32;
    let mut done_slots = 0u32;

    for offset in 0..7 {
        let date = today - Duration::days(offset);
        for routine in routines {
            if !routine.is_active || !alarm::due_on(routine, date) {
                continue;
            }
            if created_after(routine, date) {
                continue;
            }

            due_slots += 1;
            if completed.contains(&(routine.id.as_str(), date)) {
                done_slots += 1;
            }
        }
    }

    if due_slots == 0 {
        return 0;
    }

    (f64::from(done_slots) / f64::from(due_slots) * 100.0).round() as u8
}

fn created_after(routine: &RoutineRow, date: NaiveDate) -> bool {
    use chrono::{Local, TimeZone};

    Local
        .timestamp_opt(routine.created_at, 0)
        .single()
        .is_some_and(|created| created.date_naive() > date)
}

/// Normalizes a recurring amount to its monthly cost. One-off expenses
/// (no frequency) pass through unchanged.
pub fn monthly_equivalent(amount: f64, frequency: Option<&str>) -> f64 {
    match frequency {
        Some("weekly") => amount * 52.0 / 12.0,
        Some("yearly") => amount / 12.0,
        _ => amount,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub monthly: f64,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsProgress {
    pub title: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub percent: u8,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceOverview {
    pub currency: String,
    pub monthly_income: f64,
    pub fixed_monthly: f64,
    pub available_to_save: f64,
    pub daily_budget: f64,
    pub breakdown: Vec<CategoryShare>,
    pub savings: Vec<SavingsProgress>,
}

pub fn finance_overview(
    settings: Option<&FinanceSettingsRow>,
    expenses: &[ExpenseRow],
    savings: &[SavingsGoalRow],
    today: NaiveDate,
) -> FinanceOverview {
    let monthly_income = settings
        .and_then(|settings| settings.monthly_income)
        .unwrap_or(0.0);
    let currency = settings
        .and_then(|settings| settings.currency.clone())
        .unwrap_or_else(|| "USD".to_string());

    let fixed_monthly = expenses
        .iter()
        .filter(|expense| expense.is_fixed)
        .map(|expense| monthly_equivalent(expense.amount, expense.frequency.as_deref()))
        .sum::<f64>();

    let available_to_save = (monthly_income - fixed_monthly).max(0.0);
    let daily_budget = available_to_save / f64::from(days_in_month(today));

    let mut by_category: HashMap<&str, f64> = HashMap::new();
    for expense in expenses {
        let monthly = monthly_equivalent(expense.amount, expense.frequency.as_deref());
        *by_category.entry(expense.category.as_str()).or_insert(0.0) += monthly;
    }
    let total_monthly: f64 = by_category.values().sum();

    let mut breakdown: Vec<CategoryShare> = by_category
        .into_iter()
        .map(|(category, monthly)| CategoryShare {
            category: category.to_string(),
            monthly,
            percent: if total_monthly > 0.0 {
                (monthly / total_monthly * 100.0).round() as u8
            } else {
                0
            },
        })
        .collect();
    breakdown.sort_by(|left, right| {
        right
            .monthly
            .partial_cmp(&left.monthly)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| left.category.cmp(&right.category))
    });

    let savings = savings
        .iter()
        .map(|goal| SavingsProgress {
            title: goal.title.clone(),
            target_amount: goal.target_amount,
            current_amount: goal.current_amount.unwrap_or(0.0),
            percent: goal_progress(goal.current_amount, Some(goal.target_amount)),
            days_remaining: goal
                .target_date
                .map(|target_date| days_remaining(target_date, today)),
        })
        .collect();

    FinanceOverview {
        currency,
        monthly_income,
        fixed_monthly,
        available_to_save,
        daily_budget,
        breakdown,
        savings,
    }
}

fn days_in_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };

    match next_month {
        Some(next) => (next - first).num_days() as u32,
        None => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("date")
    }

    fn routine(id: &str, frequency: &str, start_time: &str) -> RoutineRow {
        RoutineRow {
            id: id.to_string(),
            title: format!("Routine {id}"),
            description: None,
            start_time: start_time.to_string(),
            duration_minutes: 30,
            frequency: frequency.to_string(),
            custom_days: None,
            is_active: true,
            alarm_enabled: true,
            created_at: 1_600_000_000,
            updated_at: 1_600_000_000,
        }
    }

    fn completion(routine_id: &str, completed_date: NaiveDate) -> TaskCompletionRow {
        TaskCompletionRow {
            id: format!("{routine_id}-{completed_date}"),
            routine_id: routine_id.to_string(),
            completed_date,
            completed_at: None,
            status: "completed".to_string(),
            created_at: 1_600_000_000,
        }
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        assert_eq!(current_streak(&dates, date(2024, 1, 3)), 3);
    }

    #[test]
    fn streak_survives_one_unanchored_day() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        assert_eq!(current_streak(&dates, date(2024, 1, 4)), 3);
    }

    #[test]
    fn streak_breaks_after_two_missed_days() {
        let dates = [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)];
        assert_eq!(current_streak(&dates, date(2024, 1, 5)), 0);
    }

    #[test]
    fn streak_ignores_duplicates_and_stops_at_gaps() {
        let dates = [
            date(2024, 1, 3),
            date(2024, 1, 3),
            date(2024, 1, 1),
        ];
        assert_eq!(current_streak(&dates, date(2024, 1, 3)), 1);
        assert_eq!(current_streak(&[], date(2024, 1, 3)), 0);
    }

    #[test]
    fn goal_progress_clamps_and_rounds() {
        assert_eq!(goal_progress(Some(50.0), Some(200.0)), 25);
        assert_eq!(goal_progress(Some(2.0), Some(3.0)), 67);
        assert_eq!(goal_progress(Some(250.0), Some(100.0)), 100);
        assert_eq!(goal_progress(Some(-5.0), Some(100.0)), 0);
        assert_eq!(goal_progress(Some(50.0), None), 0);
        assert_eq!(goal_progress(Some(50.0), Some(0.0)), 0);
        assert_eq!(goal_progress(None, Some(100.0)), 0);
    }

    #[test]
    fn days_remaining_floors_at_zero() {
        assert_eq!(days_remaining(date(2024, 3, 20), date(2024, 3, 11)), 9);
        assert_eq!(days_remaining(date(2024, 3, 11), date(2024, 3, 11)), 0);
        assert_eq!(days_remaining(date(2024, 3, 1), date(2024, 3, 11)), 0);
    }

    #[test]
    fn today_items_filter_by_frequency_and_mark_done() {
        // 2024-03-16 is a Saturday.
        let saturday = date(2024, 3, 16);
        let routines = [
            routine("a", "daily", "06:30"),
            routine("b", "weekdays", "09:00"),
            routine("c", "weekends", "10:00"),
        ];
        let completions = [completion("c", saturday)];

        let items = today_items(&routines, &completions, saturday);
        let flags: Vec<(&str, bool)> = items
            .iter()
            .map(|item| (item.id.as_str(), item.done))
            .collect();

        assert_eq!(flags, vec![("a", false), ("c", true)]);
    }

    #[test]
    fn weekly_consistency_ratio() {
        let today = date(2024, 3, 17);
        let routines = [routine("a", "daily", "06:30")];
        let completions: Vec<TaskCompletionRow> = (0..5)
            .map(|offset| completion("a", today - Duration::days(offset)))
            .collect();

        // 5 completed of 7 due slots.
        assert_eq!(weekly_consistency(&routines, &completions, today), 71);
        assert_eq!(weekly_consistency(&[], &[], today), 0);
    }

    #[test]
    fn monthly_equivalent_normalizes_frequencies() {
        assert_eq!(monthly_equivalent(120.0, Some("weekly")), 520.0);
        assert_eq!(monthly_equivalent(1200.0, Some("yearly")), 100.0);
        assert_eq!(monthly_equivalent(80.0, Some("monthly")), 80.0);
        assert_eq!(monthly_equivalent(80.0, None), 80.0);
    }

    #[test]
    fn finance_overview_budget_math() {
        let settings = FinanceSettingsRow {
            monthly_income: Some(4500.0),
            currency: Some("USD".to_string()),
            updated_at: 0,
        };
        let expenses = [
            ExpenseRow {
                id: "rent".to_string(),
                title: "Rent".to_string(),
                amount: 2100.0,
                category: "rent".to_string(),
                is_fixed: true,
                frequency: Some("monthly".to_string()),
                created_at: 0,
            },
            ExpenseRow {
                id: "food".to_string(),
                title: "Groceries".to_string(),
                amount: 750.0,
                category: "food".to_string(),
                is_fixed: true,
                frequency: Some("monthly".to_string()),
                created_at: 0,
            },
        ];

        // April has 30 days: (4500 - 2850) / 30 = 55 per day.
        let overview = finance_overview(Some(&settings), &expenses, &[], date(2024, 4, 10));
        assert_eq!(overview.fixed_monthly, 2850.0);
        assert_eq!(overview.available_to_save, 1650.0);
        assert_eq!(overview.daily_budget, 55.0);

        assert_eq!(overview.breakdown.len(), 2);
        assert_eq!(overview.breakdown[0].category, "rent");
        assert_eq!(overview.breakdown[0].percent, 74);
        assert_eq!(overview.breakdown[1].percent, 26);
    }

    #[test]
    fn finance_overview_without_settings_floors_at_zero() {
        let expenses = [ExpenseRow {
            id: "rent".to_string(),
            title: "Rent".to_string(),
            amount: 900.0,
            category: "rent".to_string(),
            is_fixed: true,
            frequency: Some("monthly".to_string()),
            created_at: 0,
        }];

        let overview = finance_overview(None, &expenses, &[], date(2024, 4, 10));
        assert_eq!(overview.currency, "USD");
        assert_eq!(overview.available_to_save, 0.0);
        assert_eq!(overview.daily_budget, 0.0);
    }

    #[test]
    fn savings_progress_uses_goal_formula() {
        let savings = [SavingsGoalRow {
            id: "fund".to_string(),
            title: "Emergency Fund".to_string(),
            target_amount: 5000.0,
            current_amount: Some(3400.0),
            target_date: Some(date(2024, 6, 1)),
            created_at: 0,
            updated_at: 0,
        }];

        let overview = finance_overview(None, &[], &savings, date(2024, 4, 10));
        assert_eq!(overview.savings.len(), 1);
        assert_eq!(overview.savings[0].percent, 68);
        assert_eq!(overview.savings[0].days_remaining, Some(52));
    }
}
