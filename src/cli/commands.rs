use crate::alarm;
use crate::cli::{
    ExpenseCommands, FinanceCommands, GoalCommands, ProfileCommands, RoutineCommands,
    SavingsCommands,
};
use crate::config::{Config, parse_hhmm};
use crate::db::{
    Database, ExpenseRow, GoalRow, NewExpense, NewGoal, NewRoutine, NewSavingsGoal, RoutineRow,
    SavingsGoalRow, ToggleOutcome,
};
use crate::plan;
use crate::stats;
use crate::stats::report::{
    self, format_duration_minutes, format_money, summary_for_date, trim_number,
};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::collections::HashSet;
use url::Url;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const EXPENSE_FREQUENCIES: [&str; 3] = ["monthly", "weekly", "yearly"];
const THEMES: [&str; 3] = ["light", "dark", "system"];

pub fn handle_routine_command(config: &Config, command: RoutineCommands) -> Result<()> {
    match command {
        RoutineCommands::Add {
            title,
            at,
            duration,
            frequency,
            days,
            description,
            no_alarm,
        } => {
            parse_hhmm(&at).with_context(|| format!("Invalid start time: {at}"))?;
            validate_frequency(&frequency)?;
            if duration <= 0 {
                bail!("Duration must be a positive number of minutes");
            }
            let custom_days = normalize_custom_days(&frequency, days)?;

            let database = Database::open(&config.db_path)?;
            let routine = database.insert_routine(&NewRoutine {
                title,
                description,
                start_time: at,
                duration_minutes: duration,
                frequency,
                custom_days,
                alarm_enabled: !no_alarm,
            })?;

            println!("Routine created: {} (id {})", routine.title, short_id(&routine.id));
            println!(
                "- starts {} for {}, repeats {}",
                routine.start_time,
                format_duration_minutes(routine.duration_minutes),
                describe_frequency(&routine)
            );
            if routine.alarm_enabled {
                let slots = alarm::plan_routine_alarms(&routine)?.len();
                println!("- alarm slots: {slots}");
            } else {
                println!("- alarms off");
            }
            Ok(())
        }
        RoutineCommands::List { all } => {
            let database = Database::open(&config.db_path)?;
            let routines = database.list_routines()?;
            let today = Local::now().date_naive();
            let done: HashSet<String> = database
                .completions_for_date(today)?
                .into_iter()
                .map(|completion| completion.routine_id)
                .collect();

            let visible: Vec<&RoutineRow> = routines
                .iter()
                .filter(|routine| all || routine.is_active)
                .collect();

            if visible.is_empty() {
                println!("No routines yet. Create one with `orbit routine add`.");
                return Ok(());
            }

            println!("Routines ({})", visible.len());
            for routine in visible {
                let glyph = if done.contains(&routine.id) { "x" } else { " " };
                let mut flags = String::new();
                if !routine.is_active {
                    flags.push_str(" [paused]");
                }
                if !routine.alarm_enabled {
                    flags.push_str(" [no alarm]");
                }
                println!(
                    "  [{glyph}] {} {} ({}, {}){} (id {})",
                    routine.start_time,
                    routine.title,
                    format_duration_minutes(routine.duration_minutes),
                    describe_frequency(routine),
                    flags,
                    short_id(&routine.id)
                );
            }
            Ok(())
        }
        RoutineCommands::Edit {
            routine: key,
            title,
            at,
            duration,
            frequency,
            days,
            description,
            active,
            alarm,
        } => {
            let database = Database::open(&config.db_path)?;
            let mut routine = require_routine(&database, &key)?;

            if let Some(value) = title {
                routine.title = value;
            }
            if let Some(value) = at {
                parse_hhmm(&value).with_context(|| format!("Invalid start time: {value}"))?;
                routine.start_time = value;
            }
            if let Some(value) = duration {
                if value <= 0 {
                    bail!("Duration must be a positive number of minutes");
                }
                routine.duration_minutes = value;
            }
            if let Some(value) = frequency {
                validate_frequency(&value)?;
                if value != "custom" {
                    routine.custom_days = None;
                }
                routine.frequency = value;
            }
            if let Some(value) = days {
                routine.custom_days = normalize_custom_days(&routine.frequency, value)?;
            }
            if let Some(value) = description {
                routine.description = if value.is_empty() { None } else { Some(value) };
            }
            if let Some(value) = active {
                routine.is_active = value;
            }
            if let Some(value) = alarm {
                routine.alarm_enabled = value;
            }
            if routine.frequency == "custom"
                && routine.custom_days.as_deref().unwrap_or_default().is_empty()
            {
                bail!("Custom frequency needs --days (0=Sunday .. 6=Saturday)");
            }

            database.update_routine(&routine)?;
            println!("Routine updated: {} (id {})", routine.title, short_id(&routine.id));
            Ok(())
        }
        RoutineCommands::Remove { routine: key, yes } => {
            let database = Database::open(&config.db_path)?;
            let routine = require_routine(&database, &key)?;

            if !confirm(
                yes,
                &format!(
                    "Delete routine '{}' and its completion history?",
                    routine.title
                ),
            )? {
                println!("Aborted.");
                return Ok(());
            }

            database.delete_routine(&routine.id)?;
            println!("Routine removed: {}", routine.title);
            Ok(())
        }
        RoutineCommands::Done { routine: key, date } => {
            let target_date = parse_optional_date(date)?;
            let mut database = Database::open(&config.db_path)?;
            let routine = require_routine(&database, &key)?;

            match database.toggle_completion(&routine.id, target_date)? {
                ToggleOutcome::Completed => {
                    println!("Marked '{}' completed for {target_date}", routine.title);
                }
                ToggleOutcome::Unmarked => {
                    println!("Unmarked '{}' for {target_date}", routine.title);
                }
            }
            Ok(())
        }
    }
}

pub fn handle_goal_command(config: &Config, command: GoalCommands) -> Result<()> {
    match command {
        GoalCommands::Add {
            title,
            category,
            target,
            due,
            daily_action,
            description,
        } => {
            let target_date = parse_target_date(due)?;
            let database = Database::open(&config.db_path)?;
            let goal = database.insert_goal(&NewGoal {
                title,
                category,
                description,
                target_value: target,
                current_value: target.map(|_| 0.0),
                target_date,
                daily_action,
            })?;

            println!("Goal created: {} (id {})", goal.title, short_id(&goal.id));
            Ok(())
        }
        GoalCommands::List { all } => {
            let database = Database::open(&config.db_path)?;
            let goals = database.list_goals()?;
            let today = Local::now().date_naive();

            let visible: Vec<&GoalRow> = goals.iter().filter(|goal| all || goal.is_active).collect();
            if visible.is_empty() {
                println!("No goals yet. Create one with `orbit goal add`.");
                return Ok(());
            }

            println!("Goals ({})", visible.len());
            for goal in visible {
                let percent = stats::goal_progress(goal.current_value, goal.target_value);
                let progress = match goal.target_value {
                    Some(target) => format!(
                        "{}% ({} / {})",
                        percent,
                        trim_number(goal.current_value.unwrap_or(0.0)),
                        trim_number(target)
                    ),
                    None => "no target".to_string(),
                };
                let deadline = goal
                    .target_date
                    .map(|date| {
                        format!(", {} days left", stats::days_remaining(date, today))
                    })
                    .unwrap_or_default();
                let state = if goal.is_active { "" } else { " [paused]" };
                println!(
                    "  {} [{}]: {}{}{} (id {})",
                    goal.title,
                    goal.category,
                    progress,
                    deadline,
                    state,
                    short_id(&goal.id)
                );
                if let Some(action) = &goal.daily_action {
                    println!("      daily: {action}");
                }
            }
            Ok(())
        }
        GoalCommands::Progress { goal: key, value } => {
            if value < 0.0 {
                bail!("Progress value cannot be negative");
            }

            let database = Database::open(&config.db_path)?;
            let mut goal = require_goal(&database, &key)?;
            goal.current_value = Some(value);
            database.update_goal(&goal)?;

            let percent = stats::goal_progress(goal.current_value, goal.target_value);
            println!("Progress saved: {} at {percent}%", goal.title);
            Ok(())
        }
        GoalCommands::Edit {
            goal: key,
            title,
            category,
            target,
            due,
            daily_action,
            description,
            active,
        } => {
            let database = Database::open(&config.db_path)?;
            let mut goal = require_goal(&database, &key)?;

            if let Some(value) = title {
                goal.title = value;
            }
            if let Some(value) = category {
                goal.category = value;
            }
            if let Some(value) = target {
                if value <= 0.0 {
                    bail!("Target must be positive");
                }
                goal.target_value = Some(value);
            }
            if due.is_some() {
                goal.target_date = parse_target_date(due)?;
            }
            if let Some(value) = daily_action {
                goal.daily_action = if value.is_empty() { None } else { Some(value) };
            }
            if let Some(value) = description {
                goal.description = if value.is_empty() { None } else { Some(value) };
            }
            if let Some(value) = active {
                goal.is_active = value;
            }

            database.update_goal(&goal)?;
            println!("Goal updated: {} (id {})", goal.title, short_id(&goal.id));
            Ok(())
        }
        GoalCommands::Remove { goal: key, yes } => {
            let database = Database::open(&config.db_path)?;
            let goal = require_goal(&database, &key)?;

            if !confirm(yes, &format!("Delete goal '{}'?", goal.title))? {
                println!("Aborted.");
                return Ok(());
            }

            database.delete_goal(&goal.id)?;
            println!("Goal removed: {}", goal.title);
            Ok(())
        }
    }
}

pub fn handle_finance_command(config: &Config, command: FinanceCommands) -> Result<()> {
    match command {
        FinanceCommands::Income { amount, currency } => {
            if amount < 0.0 {
                bail!("Income cannot be negative");
            }

            let database = Database::open(&config.db_path)?;
            let currency = currency.or_else(|| {
                database
                    .finance_settings()
                    .ok()
                    .flatten()
                    .and_then(|settings| settings.currency)
            });
            database.upsert_finance_settings(Some(amount), currency.as_deref())?;

            println!(
                "Monthly income set: {}",
                format_money(amount, currency.as_deref().unwrap_or("USD"))
            );
            Ok(())
        }
        FinanceCommands::Expense { command } => handle_expense_command(config, command),
        FinanceCommands::Savings { command } => handle_savings_command(config, command),
        FinanceCommands::Summary => {
            let database = Database::open(&config.db_path)?;
            let overview = stats::finance_overview(
                database.finance_settings()?.as_ref(),
                &database.list_expenses()?,
                &database.list_savings_goals()?,
                Local::now().date_naive(),
            );

            println!("Budget overview ({})", overview.currency);
            println!(
                "- monthly income: {}",
                format_money(overview.monthly_income, &overview.currency)
            );
            println!(
                "- fixed costs: {}",
                format_money(overview.fixed_monthly, &overview.currency)
            );
            println!(
                "- available to save: {}",
                format_money(overview.available_to_save, &overview.currency)
            );
            println!(
                "- daily budget: {}",
                format_money(overview.daily_budget, &overview.currency)
            );

            if !overview.breakdown.is_empty() {
                println!("Fixed cost breakdown:");
                for share in &overview.breakdown {
                    println!(
                        "  - {}: {}/mo ({}%)",
                        share.category,
                        format_money(share.monthly, &overview.currency),
                        share.percent
                    );
                }
            }
            if !overview.savings.is_empty() {
                println!("Savings goals:");
                for progress in &overview.savings {
                    let deadline = progress
                        .days_remaining
                        .map(|days| format!(", {days} days left"))
                        .unwrap_or_default();
                    println!(
                        "  - {}: {} of {} ({}%){}",
                        progress.title,
                        format_money(progress.current_amount, &overview.currency),
                        format_money(progress.target_amount, &overview.currency),
                        progress.percent,
                        deadline
                    );
                }
            }
            Ok(())
        }
    }
}

fn handle_expense_command(config: &Config, command: ExpenseCommands) -> Result<()> {
    match command {
        ExpenseCommands::Add {
            title,
            amount,
            category,
            frequency,
            one_time,
        } => {
            if amount <= 0.0 {
                bail!("Amount must be positive");
            }
            if !one_time && !EXPENSE_FREQUENCIES.contains(&frequency.as_str()) {
                bail!(
                    "Unknown expense frequency: {frequency}. Use one of: {}",
                    EXPENSE_FREQUENCIES.join(", ")
                );
            }

            let database = Database::open(&config.db_path)?;
            let currency = currency_of(&database);
            let expense = database.insert_expense(&NewExpense {
                title,
                amount,
                category,
                is_fixed: !one_time,
                frequency: if one_time { None } else { Some(frequency) },
            })?;

            if expense.is_fixed {
                println!(
                    "Fixed cost added: {} {} ({}) (id {})",
                    expense.title,
                    format_money(expense.amount, &currency),
                    expense.frequency.as_deref().unwrap_or("monthly"),
                    short_id(&expense.id)
                );
                let monthly = stats::monthly_equivalent(expense.amount, expense.frequency.as_deref());
                if (monthly - expense.amount).abs() > f64::EPSILON {
                    println!("- monthly equivalent: {}", format_money(monthly, &currency));
                }
            } else {
                println!(
                    "Expense recorded: {} {} (id {})",
                    expense.title,
                    format_money(expense.amount, &currency),
                    short_id(&expense.id)
                );
            }
            Ok(())
        }
        ExpenseCommands::List => {
            let database = Database::open(&config.db_path)?;
            let expenses = database.list_expenses()?;
            let currency = currency_of(&database);

            if expenses.is_empty() {
                println!("No expenses recorded.");
                return Ok(());
            }

            let (fixed, one_time): (Vec<&ExpenseRow>, Vec<&ExpenseRow>) =
                expenses.iter().partition(|expense| expense.is_fixed);

            if !fixed.is_empty() {
                let total: f64 = fixed
                    .iter()
                    .map(|expense| {
                        stats::monthly_equivalent(expense.amount, expense.frequency.as_deref())
                    })
                    .sum();
                println!("Fixed costs ({}/mo)", format_money(total, &currency));
                for expense in fixed {
                    println!(
                        "  - {} {} ({}, {}) (id {})",
                        expense.title,
                        format_money(expense.amount, &currency),
                        expense.category,
                        expense.frequency.as_deref().unwrap_or("monthly"),
                        short_id(&expense.id)
                    );
                }
            }
            if !one_time.is_empty() {
                println!("One-off expenses");
                for expense in one_time {
                    println!(
                        "  - {} {} ({}) (id {})",
                        expense.title,
                        format_money(expense.amount, &currency),
                        expense.category,
                        short_id(&expense.id)
                    );
                }
            }
            Ok(())
        }
        ExpenseCommands::Remove { expense: key, yes } => {
            let database = Database::open(&config.db_path)?;
            let expense = database
                .find_expense(&key)?
                .with_context(|| format!("No expense matching '{key}'"))?;

            if !confirm(yes, &format!("Delete expense '{}'?", expense.title))? {
                println!("Aborted.");
                return Ok(());
            }

            database.delete_expense(&expense.id)?;
            println!("Expense removed: {}", expense.title);
            Ok(())
        }
    }
}

fn handle_savings_command(config: &Config, command: SavingsCommands) -> Result<()> {
    match command {
        SavingsCommands::Add {
            title,
            target,
            due,
            initial,
        } => {
            if target <= 0.0 {
                bail!("Target amount must be positive");
            }
            if initial.is_some_and(|value| value < 0.0) {
                bail!("Initial amount cannot be negative");
            }

            let target_date = parse_target_date(due)?;
            let database = Database::open(&config.db_path)?;
            let currency = currency_of(&database);
            let goal = database.insert_savings_goal(&NewSavingsGoal {
                title,
                target_amount: target,
                current_amount: Some(initial.unwrap_or(0.0)),
                target_date,
            })?;

            println!(
                "Savings goal created: {} targeting {} (id {})",
                goal.title,
                format_money(goal.target_amount, &currency),
                short_id(&goal.id)
            );
            Ok(())
        }
        SavingsCommands::List => {
            let database = Database::open(&config.db_path)?;
            let goals = database.list_savings_goals()?;
            let currency = currency_of(&database);
            let today = Local::now().date_naive();

            if goals.is_empty() {
                println!("No savings goals yet.");
                return Ok(());
            }

            println!("Savings goals ({})", goals.len());
            for goal in &goals {
                let percent = stats::goal_progress(goal.current_amount, Some(goal.target_amount));
                let deadline = goal
                    .target_date
                    .map(|date| format!(", {} days left", stats::days_remaining(date, today)))
                    .unwrap_or_default();
                println!(
                    "  - {}: {} of {} ({}%){} (id {})",
                    goal.title,
                    format_money(goal.current_amount.unwrap_or(0.0), &currency),
                    format_money(goal.target_amount, &currency),
                    percent,
                    deadline,
                    short_id(&goal.id)
                );
            }
            Ok(())
        }
        SavingsCommands::Fund { goal: key, amount } => {
            if amount <= 0.0 {
                bail!("Amount must be positive");
            }

            let database = Database::open(&config.db_path)?;
            let currency = currency_of(&database);
            let mut goal = require_savings_goal(&database, &key)?;
            goal.current_amount = Some(goal.current_amount.unwrap_or(0.0) + amount);
            database.update_savings_goal(&goal)?;

            let percent = stats::goal_progress(goal.current_amount, Some(goal.target_amount));
            println!(
                "Funded '{}': now {} of {} ({}%)",
                goal.title,
                format_money(goal.current_amount.unwrap_or(0.0), &currency),
                format_money(goal.target_amount, &currency),
                percent
            );
            Ok(())
        }
        SavingsCommands::Remove { goal: key, yes } => {
            let database = Database::open(&config.db_path)?;
            let goal = require_savings_goal(&database, &key)?;

            if !confirm(yes, &format!("Delete savings goal '{}'?", goal.title))? {
                println!("Aborted.");
                return Ok(());
            }

            database.delete_savings_goal(&goal.id)?;
            println!("Savings goal removed: {}", goal.title);
            Ok(())
        }
    }
}

pub fn handle_profile_command(config: &Config, command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::Show => {
            let database = Database::open(&config.db_path)?;
            match database.profile()? {
                Some(profile) => {
                    println!("Profile");
                    println!(
                        "- name: {}",
                        profile.display_name.as_deref().unwrap_or("(not set)")
                    );
                    println!(
                        "- avatar_url: {}",
                        profile.avatar_url.as_deref().unwrap_or("(not set)")
                    );
                    println!(
                        "- timezone: {}",
                        profile.timezone.as_deref().unwrap_or("(not set)")
                    );
                    println!(
                        "- theme: {}",
                        profile.theme_preference.as_deref().unwrap_or("system")
                    );
                }
                None => println!("No profile yet. Run `orbit onboard` or `orbit profile set`."),
            }
            Ok(())
        }
        ProfileCommands::Set {
            name,
            avatar_url,
            timezone,
            theme,
        } => {
            if name.is_none() && avatar_url.is_none() && timezone.is_none() && theme.is_none() {
                bail!(
                    "Nothing to update. Pass at least one of --name, --avatar-url, --timezone, --theme"
                );
            }

            if let Some(value) = avatar_url.as_deref() {
                if !value.is_empty() {
                    Url::parse(value).with_context(|| format!("Invalid avatar URL: {value}"))?;
                }
            }
            if let Some(value) = theme.as_deref() {
                if !THEMES.contains(&value) {
                    bail!("Unknown theme: {value}. Use one of: {}", THEMES.join(", "));
                }
            }

            let database = Database::open(&config.db_path)?;
            let current = database.profile()?;

            // An explicit empty string clears the field; absent flags keep it.
            let display_name = merge_field(name, current.as_ref().and_then(|p| p.display_name.clone()));
            let avatar_url = merge_field(avatar_url, current.as_ref().and_then(|p| p.avatar_url.clone()));
            let timezone = merge_field(timezone, current.as_ref().and_then(|p| p.timezone.clone()));
            let theme = merge_field(theme, current.as_ref().and_then(|p| p.theme_preference.clone()));

            database.upsert_profile(
                display_name.as_deref(),
                avatar_url.as_deref(),
                timezone.as_deref(),
                theme.as_deref(),
            )?;

            println!("Profile saved.");
            Ok(())
        }
    }
}

pub fn handle_today(config: &Config) -> Result<()> {
    let today = Local::now().date_naive();
    let summary = summary_for_date(config, today)?;

    if let Some(name) = &summary.display_name {
        println!("Today for {name}, {}", today.format("%A %Y-%m-%d"));
    } else {
        println!("Today, {}", today.format("%A %Y-%m-%d"));
    }

    if summary.routines.is_empty() {
        println!("No routines due today.");
        return Ok(());
    }

    for item in &summary.routines {
        let glyph = if item.done { "x" } else { " " };
        println!(
            "  [{glyph}] {} {} ({})",
            item.start_time,
            item.title,
            format_duration_minutes(item.duration_minutes)
        );
    }
    println!(
        "{} of {} done. Streak: {} days. Consistency (7 days): {}%.",
        summary.done_count, summary.due_count, summary.streak_days, summary.consistency_percent
    );
    Ok(())
}

pub fn handle_report(config: &Config, date: Option<String>, json: bool) -> Result<()> {
    let target_date = parse_optional_date(date)?;
    let summary = summary_for_date(config, target_date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", report::render_markdown(&summary));
    }
    Ok(())
}

pub fn handle_plan(config: &Config, prompt: &str, apply: bool) -> Result<()> {
    let suggestions = plan::suggest_plan(prompt);

    println!("Suggested plan:");
    for task in &suggestions {
        println!(
            "  {} {} ({})",
            task.time,
            task.title,
            format_duration_minutes(task.duration_minutes)
        );
    }

    if !apply {
        println!("Run again with --apply to create these as daily routines.");
        return Ok(());
    }

    let database = Database::open(&config.db_path)?;
    let description = plan::plan_description(prompt);
    for task in &suggestions {
        database.insert_routine(&NewRoutine {
            title: task.title.clone(),
            description: Some(description.clone()),
            start_time: task.time.clone(),
            duration_minutes: task.duration_minutes,
            frequency: "daily".to_string(),
            custom_days: None,
            alarm_enabled: false,
        })?;
    }
    println!(
        "Applied: {} routines created with alarms off.",
        suggestions.len()
    );
    Ok(())
}

fn currency_of(database: &Database) -> String {
    database
        .finance_settings()
        .ok()
        .flatten()
        .and_then(|settings| settings.currency)
        .unwrap_or_else(|| "USD".to_string())
}

fn require_routine(database: &Database, key: &str) -> Result<RoutineRow> {
    database
        .find_routine(key)?
        .with_context(|| format!("No routine matching '{key}' (try `orbit routine list`)"))
}

fn require_goal(database: &Database, key: &str) -> Result<GoalRow> {
    database
        .find_goal(key)?
        .with_context(|| format!("No goal matching '{key}' (try `orbit goal list`)"))
}

fn require_savings_goal(database: &Database, key: &str) -> Result<SavingsGoalRow> {
    database
        .find_savings_goal(key)?
        .with_context(|| format!("No savings goal matching '{key}' (try `orbit finance savings list`)"))
}

fn confirm(skip: bool, prompt: &str) -> Result<bool> {
    if skip {
        return Ok(true);
    }

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation input")
}

fn validate_frequency(value: &str) -> Result<()> {
    if alarm::Frequency::parse(value).is_none() {
        let supported = alarm::Frequency::ALL
            .iter()
            .map(|frequency| frequency.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("Unknown frequency: {value}. Use one of: {supported}");
    }
    Ok(())
}

fn normalize_custom_days(frequency: &str, days: Vec<u8>) -> Result<Option<Vec<u8>>> {
    if frequency != "custom" {
        if days.is_empty() {
            return Ok(None);
        }
        bail!("--days only applies to the custom frequency");
    }

    if days.is_empty() {
        bail!("Custom frequency needs --days (0=Sunday .. 6=Saturday)");
    }
    if let Some(bad) = days.iter().find(|day| **day > 6) {
        bail!("Invalid day index: {bad} (use 0..=6)");
    }

    let mut deduped = Vec::new();
    for day in days {
        if !deduped.contains(&day) {
            deduped.push(day);
        }
    }
    Ok(Some(deduped))
}

fn describe_frequency(routine: &RoutineRow) -> String {
    if routine.frequency != "custom" {
        return routine.frequency.clone();
    }

    let days = routine
        .custom_days
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|day| DAY_NAMES.get(usize::from(*day)))
        .copied()
        .collect::<Vec<_>>()
        .join(",");

    if days.is_empty() {
        "custom".to_string()
    } else {
        format!("custom: {days}")
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn merge_field(update: Option<String>, current: Option<String>) -> Option<String> {
    match update {
        Some(value) if value.is_empty() => None,
        Some(value) => Some(value),
        None => current,
    }
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-02-18"))
        })
        .transpose()?
        .map_or_else(|| Ok(Local::now().date_naive()), Ok)
}

fn parse_target_date(input: Option<String>) -> Result<Option<NaiveDate>> {
    input
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2026-02-18"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_routine(frequency: &str, custom_days: Option<Vec<u8>>) -> RoutineRow {
        RoutineRow {
            id: "2f1f9a1e-1111-4a5b-9a2e-7c246ef0b0aa".to_string(),
            title: "Morning run".to_string(),
            description: None,
            start_time: "06:30".to_string(),
            duration_minutes: 45,
            frequency: frequency.to_string(),
            custom_days,
            is_active: true,
            alarm_enabled: true,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn custom_days_require_values_and_valid_range() {
        assert!(normalize_custom_days("custom", vec![]).is_err());
        assert!(normalize_custom_days("custom", vec![7]).is_err());
        assert!(normalize_custom_days("daily", vec![1]).is_err());
        assert_eq!(normalize_custom_days("daily", vec![]).unwrap(), None);
        assert_eq!(
            normalize_custom_days("custom", vec![1, 3, 1, 5]).unwrap(),
            Some(vec![1, 3, 5])
        );
    }

    #[test]
    fn frequency_descriptions_name_custom_days() {
        assert_eq!(describe_frequency(&sample_routine("daily", None)), "daily");
        assert_eq!(
            describe_frequency(&sample_routine("custom", Some(vec![0, 3, 6]))),
            "custom: Sun,Wed,Sat"
        );
        assert_eq!(describe_frequency(&sample_routine("custom", None)), "custom");
    }

    #[test]
    fn target_dates_parse_or_clear() {
        assert_eq!(parse_target_date(None).unwrap(), None);
        assert_eq!(parse_target_date(Some(String::new())).unwrap(), None);
        assert_eq!(
            parse_target_date(Some("2026-12-31".to_string())).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
        assert!(parse_target_date(Some("soon".to_string())).is_err());
    }

    #[test]
    fn empty_profile_field_clears_value() {
        assert_eq!(
            merge_field(None, Some("kept".to_string())),
            Some("kept".to_string())
        );
        assert_eq!(merge_field(Some(String::new()), Some("old".to_string())), None);
        assert_eq!(
            merge_field(Some("new".to_string()), Some("old".to_string())),
            Some("new".to_string())
        );
    }

    #[test]
    fn short_ids_tolerate_short_input() {
        assert_eq!(short_id("2f1f9a1e-1111"), "2f1f9a1e");
        assert_eq!(short_id("abc"), "abc");
    }
}
