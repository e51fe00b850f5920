pub mod queries;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, Row, params};
use serde::Serialize;
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct RoutineRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub duration_minutes: i64,
    pub frequency: String,
    pub custom_days: Option<Vec<u8>>,
    pub is_active: bool,
    pub alarm_enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub daily_action: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseRow {
    pub id: String,
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub is_fixed: bool,
    pub frequency: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavingsGoalRow {
    pub id: String,
    pub title: String,
    pub target_amount: f64,
    pub current_amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinanceSettingsRow {
    pub monthly_income: Option<f64>,
    pub currency: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCompletionRow {
    pub id: String,
    pub routine_id: String,
    pub completed_date: NaiveDate,
    pub completed_at: Option<i64>,
    pub status: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileRow {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub theme_preference: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewRoutine {
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub duration_minutes: i64,
    pub frequency: String,
    pub custom_days: Option<Vec<u8>>,
    pub alarm_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_date: Option<NaiveDate>,
    pub daily_action: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub is_fixed: bool,
    pub frequency: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSavingsGoal {
    pub title: String,
    pub target_amount: f64,
    pub current_amount: Option<f64>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Completed,
    Unmarked,
}

fn map_routine(row: &Row<'_>) -> rusqlite::Result<RoutineRow> {
    let custom_days: Option<String> = row.get(6)?;
    Ok(RoutineRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        frequency: row.get(5)?,
        custom_days: custom_days.and_then(|raw| serde_json::from_str(&raw).ok()),
        is_active: row.get(7)?,
        alarm_enabled: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_goal(row: &Row<'_>) -> rusqlite::Result<GoalRow> {
    Ok(GoalRow {
        id: row.get(0)?,
        title: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        target_value: row.get(4)?,
        current_value: row.get(5)?,
        target_date: row.get(6)?,
        daily_action: row.get(7)?,
        is_active: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_expense(row: &Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok(ExpenseRow {
        id: row.get(0)?,
        title: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        is_fixed: row.get(4)?,
        frequency: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_savings_goal(row: &Row<'_>) -> rusqlite::Result<SavingsGoalRow> {
    Ok(SavingsGoalRow {
        id: row.get(0)?,
        title: row.get(1)?,
        target_amount: row.get(2)?,
        current_amount: row.get(3)?,
        target_date: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_completion(row: &Row<'_>) -> rusqlite::Result<TaskCompletionRow> {
    Ok(TaskCompletionRow {
        id: row.get(0)?,
        routine_id: row.get(1)?,
        completed_date: row.get(2)?,
        completed_at: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

const ROUTINE_COLUMNS: &str = "id, title, description, start_time, duration_minutes, frequency, custom_days, is_active, alarm_enabled, created_at, updated_at";
const GOAL_COLUMNS: &str = "id, title, category, description, target_value, current_value, target_date, daily_action, is_active, created_at, updated_at";
const EXPENSE_COLUMNS: &str = "id, title, amount, category, is_fixed, frequency, created_at";
const SAVINGS_COLUMNS: &str = "id, title, target_amount, current_amount, target_date, created_at, updated_at";
const COMPLETION_COLUMNS: &str = "id, routine_id, completed_date, completed_at, status, created_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        // SQLite keeps foreign keys off per connection; the completions
        // cascade needs them on.
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    // --- routines ---

    pub fn insert_routine(&self, new: &NewRoutine) -> Result<RoutineRow> {
        let id = Uuid::new_v4().to_string();
        let now = Local::now().timestamp();
        let custom_days_json = match &new.custom_days {
            Some(days) => Some(serde_json::to_string(days).context("Failed to encode custom days")?),
            None => None,
        };

        self.conn
            .execute(
                "INSERT INTO routines (id, title, description, start_time, duration_minutes, frequency, custom_days, is_active, alarm_enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
                params![
                    id,
                    new.title,
                    new.description,
                    new.start_time,
                    new.duration_minutes,
                    new.frequency,
                    custom_days_json,
                    new.alarm_enabled,
                    now
                ],
            )
            .context("Failed to insert routine")?;

        Ok(RoutineRow {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            start_time: new.start_time.clone(),
            duration_minutes: new.duration_minutes,
            frequency: new.frequency.clone(),
            custom_days: new.custom_days.clone(),
            is_active: true,
            alarm_enabled: new.alarm_enabled,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_routines(&self) -> Result<Vec<RoutineRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM routines ORDER BY start_time ASC, created_at ASC"
        ))?;

        let rows = statement
            .query_map([], map_routine)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query routines")?;

        Ok(rows)
    }

    pub fn alarm_routines(&self) -> Result<Vec<RoutineRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {ROUTINE_COLUMNS} FROM routines
             WHERE is_active = 1 AND alarm_enabled = 1
             ORDER BY start_time ASC"
        ))?;

        let rows = statement
            .query_map([], map_routine)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query alarm routines")?;

        Ok(rows)
    }

    pub fn routine_by_id(&self, id: &str) -> Result<Option<RoutineRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ROUTINE_COLUMNS} FROM routines WHERE id = ?1"),
                params![id],
                map_routine,
            )
            .ok();

        Ok(row)
    }

    /// Resolves a user-supplied key to a routine: exact id first, then a
    /// unique id prefix, then a unique case-insensitive title match.
    pub fn find_routine(&self, key: &str) -> Result<Option<RoutineRow>> {
        if let Some(routine) = self.routine_by_id(key)? {
            return Ok(Some(routine));
        }

        let routines = self.list_routines()?;
        let by_prefix: Vec<&RoutineRow> = routines
            .iter()
            .filter(|routine| routine.id.starts_with(key))
            .collect();
        if by_prefix.len() == 1 {
            return Ok(Some(by_prefix[0].clone()));
        }

        let lowered = key.to_lowercase();
        let by_title: Vec<&RoutineRow> = routines
            .iter()
            .filter(|routine| routine.title.to_lowercase() == lowered)
            .collect();
        if by_title.len() == 1 {
            return Ok(Some(by_title[0].clone()));
        }

        Ok(None)
    }

    pub fn update_routine(&self, routine: &RoutineRow) -> Result<()> {
        let now = Local::now().timestamp();
        let custom_days_json = match &routine.custom_days {
            Some(days) => Some(serde_json::to_string(days).context("Failed to encode custom days")?),
            None => None,
        };

        self.conn
            .execute(
                "UPDATE routines
                 SET title = ?2, description = ?3, start_time = ?4, duration_minutes = ?5,
                     frequency = ?6, custom_days = ?7, is_active = ?8, alarm_enabled = ?9,
                     updated_at = ?10
                 WHERE id = ?1",
                params![
                    routine.id,
                    routine.title,
                    routine.description,
                    routine.start_time,
                    routine.duration_minutes,
                    routine.frequency,
                    custom_days_json,
                    routine.is_active,
                    routine.alarm_enabled,
                    now
                ],
            )
            .context("Failed to update routine")?;

        Ok(())
    }

    pub fn delete_routine(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM routines WHERE id = ?1", params![id])
            .context("Failed to delete routine")?;

        Ok(deleted > 0)
    }

    // --- task completions ---

    pub fn toggle_completion(&mut self, routine_id: &str, date: NaiveDate) -> Result<ToggleOutcome> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        let existing: Option<String> = transaction
            .query_row(
                "SELECT id FROM task_completions WHERE routine_id = ?1 AND completed_date = ?2",
                params![routine_id, date],
                |row| row.get(0),
            )
            .ok();

        let outcome = match existing {
            Some(completion_id) => {
                transaction
                    .execute(
                        "DELETE FROM task_completions WHERE id = ?1",
                        params![completion_id],
                    )
                    .context("Failed to delete completion")?;
                ToggleOutcome::Unmarked
            }
            None => {
                let now = Local::now().timestamp();
                transaction
                    .execute(
                        "INSERT INTO task_completions (id, routine_id, completed_date, completed_at, status, created_at)
                         VALUES (?1, ?2, ?3, ?4, 'completed', ?4)",
                        params![Uuid::new_v4().to_string(), routine_id, date, now],
                    )
                    .context("Failed to insert completion")?;
                ToggleOutcome::Completed
            }
        };

        transaction
            .commit()
            .context("Failed to commit completion toggle")?;

        Ok(outcome)
    }

    pub fn completions_for_date(&self, date: NaiveDate) -> Result<Vec<TaskCompletionRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {COMPLETION_COLUMNS} FROM task_completions WHERE completed_date = ?1"
        ))?;

        let rows = statement
            .query_map(params![date], map_completion)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query completions")?;

        Ok(rows)
    }

    pub fn completions_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<TaskCompletionRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {COMPLETION_COLUMNS} FROM task_completions
             WHERE completed_date >= ?1 AND completed_date <= ?2
             ORDER BY completed_date ASC"
        ))?;

        let rows = statement
            .query_map(params![from, to], map_completion)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query completions")?;

        Ok(rows)
    }

    pub fn completion_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut statement = self.conn.prepare(
            "SELECT DISTINCT completed_date FROM task_completions ORDER BY completed_date DESC",
        )?;

        let dates = statement
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query completion dates")?;

        Ok(dates)
    }

    // --- goals ---

    pub fn insert_goal(&self, new: &NewGoal) -> Result<GoalRow> {
        let id = Uuid::new_v4().to_string();
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO goals (id, title, category, description, target_value, current_value, target_date, daily_action, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
                params![
                    id,
                    new.title,
                    new.category,
                    new.description,
                    new.target_value,
                    new.current_value,
                    new.target_date,
                    new.daily_action,
                    now
                ],
            )
            .context("Failed to insert goal")?;

        Ok(GoalRow {
            id,
            title: new.title.clone(),
            category: new.category.clone(),
            description: new.description.clone(),
            target_value: new.target_value,
            current_value: new.current_value,
            target_date: new.target_date,
            daily_action: new.daily_action.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_goals(&self) -> Result<Vec<GoalRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = statement
            .query_map([], map_goal)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query goals")?;

        Ok(rows)
    }

    pub fn find_goal(&self, key: &str) -> Result<Option<GoalRow>> {
        let goals = self.list_goals()?;

        if let Some(goal) = goals.iter().find(|goal| goal.id == key) {
            return Ok(Some(goal.clone()));
        }

        let by_prefix: Vec<&GoalRow> = goals
            .iter()
            .filter(|goal| goal.id.starts_with(key))
            .collect();
        if by_prefix.len() == 1 {
            return Ok(Some(by_prefix[0].clone()));
        }

        let lowered = key.to_lowercase();
        let by_title: Vec<&GoalRow> = goals
            .iter()
            .filter(|goal| goal.title.to_lowercase() == lowered)
            .collect();
        if by_title.len() == 1 {
            return Ok(Some(by_title[0].clone()));
        }

        Ok(None)
    }

    pub fn update_goal(&self, goal: &GoalRow) -> Result<()> {
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "UPDATE goals
                 SET title = ?2, category = ?3, description = ?4, target_value = ?5,
                     current_value = ?6, target_date = ?7, daily_action = ?8, is_active = ?9,
                     updated_at = ?10
                 WHERE id = ?1",
                params![
                    goal.id,
                    goal.title,
                    goal.category,
                    goal.description,
                    goal.target_value,
                    goal.current_value,
                    goal.target_date,
                    goal.daily_action,
                    goal.is_active,
                    now
                ],
            )
            .context("Failed to update goal")?;

        Ok(())
    }

    pub fn delete_goal(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id])
            .context("Failed to delete goal")?;

        Ok(deleted > 0)
    }

    // --- expenses ---

    pub fn insert_expense(&self, new: &NewExpense) -> Result<ExpenseRow> {
        let id = Uuid::new_v4().to_string();
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO expenses (id, title, amount, category, is_fixed, frequency, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, new.title, new.amount, new.category, new.is_fixed, new.frequency, now],
            )
            .context("Failed to insert expense")?;

        Ok(ExpenseRow {
            id,
            title: new.title.clone(),
            amount: new.amount,
            category: new.category.clone(),
            is_fixed: new.is_fixed,
            frequency: new.frequency.clone(),
            created_at: now,
        })
    }

    pub fn list_expenses(&self) -> Result<Vec<ExpenseRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = statement
            .query_map([], map_expense)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query expenses")?;

        Ok(rows)
    }

    pub fn find_expense(&self, key: &str) -> Result<Option<ExpenseRow>> {
        let expenses = self.list_expenses()?;

        if let Some(expense) = expenses.iter().find(|expense| expense.id == key) {
            return Ok(Some(expense.clone()));
        }

        let by_prefix: Vec<&ExpenseRow> = expenses
            .iter()
            .filter(|expense| expense.id.starts_with(key))
            .collect();
        if by_prefix.len() == 1 {
            return Ok(Some(by_prefix[0].clone()));
        }

        let lowered = key.to_lowercase();
        let by_title: Vec<&ExpenseRow> = expenses
            .iter()
            .filter(|expense| expense.title.to_lowercase() == lowered)
            .collect();
        if by_title.len() == 1 {
            return Ok(Some(by_title[0].clone()));
        }

        Ok(None)
    }

    pub fn delete_expense(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])
            .context("Failed to delete expense")?;

        Ok(deleted > 0)
    }

    // --- savings goals ---

    pub fn insert_savings_goal(&self, new: &NewSavingsGoal) -> Result<SavingsGoalRow> {
        let id = Uuid::new_v4().to_string();
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO savings_goals (id, title, target_amount, current_amount, target_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, new.title, new.target_amount, new.current_amount, new.target_date, now],
            )
            .context("Failed to insert savings goal")?;

        Ok(SavingsGoalRow {
            id,
            title: new.title.clone(),
            target_amount: new.target_amount,
            current_amount: new.current_amount,
            target_date: new.target_date,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn list_savings_goals(&self) -> Result<Vec<SavingsGoalRow>> {
        let mut statement = self.conn.prepare(&format!(
            "SELECT {SAVINGS_COLUMNS} FROM savings_goals ORDER BY created_at DESC, rowid DESC"
        ))?;

        let rows = statement
            .query_map([], map_savings_goal)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query savings goals")?;

        Ok(rows)
    }

    pub fn find_savings_goal(&self, key: &str) -> Result<Option<SavingsGoalRow>> {
        let goals = self.list_savings_goals()?;

        if let Some(goal) = goals.iter().find(|goal| goal.id == key) {
            return Ok(Some(goal.clone()));
        }

        let by_prefix: Vec<&SavingsGoalRow> = goals
            .iter()
            .filter(|goal| goal.id.starts_with(key))
            .collect();
        if by_prefix.len() == 1 {
            return Ok(Some(by_prefix[0].clone()));
        }

        let lowered = key.to_lowercase();
        let by_title: Vec<&SavingsGoalRow> = goals
            .iter()
            .filter(|goal| goal.title.to_lowercase() == lowered)
            .collect();
        if by_title.len() == 1 {
            return Ok(Some(by_title[0].clone()));
        }

        Ok(None)
    }

    pub fn update_savings_goal(&self, goal: &SavingsGoalRow) -> Result<()> {
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "UPDATE savings_goals
                 SET title = ?2, target_amount = ?3, current_amount = ?4, target_date = ?5, updated_at = ?6
                 WHERE id = ?1",
                params![goal.id, goal.title, goal.target_amount, goal.current_amount, goal.target_date, now],
            )
            .context("Failed to update savings goal")?;

        Ok(())
    }

    pub fn delete_savings_goal(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM savings_goals WHERE id = ?1", params![id])
            .context("Failed to delete savings goal")?;

        Ok(deleted > 0)
    }

    // --- finance settings ---

    pub fn finance_settings(&self) -> Result<Option<FinanceSettingsRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT monthly_income, currency, updated_at FROM finance_settings WHERE id = 1",
                [],
                |row| {
                    Ok(FinanceSettingsRow {
                        monthly_income: row.get(0)?,
                        currency: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .ok();

        Ok(row)
    }

    pub fn upsert_finance_settings(
        &self,
        monthly_income: Option<f64>,
        currency: Option<&str>,
    ) -> Result<()> {
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO finance_settings (id, monthly_income, currency, updated_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id)
                 DO UPDATE SET monthly_income=excluded.monthly_income, currency=excluded.currency, updated_at=excluded.updated_at",
                params![monthly_income, currency, now],
            )
            .context("Failed to upsert finance settings")?;

        Ok(())
    }

    // --- profile ---

    pub fn profile(&self) -> Result<Option<ProfileRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT display_name, avatar_url, timezone, theme_preference, created_at, updated_at
                 FROM profile WHERE id = 1",
                [],
                |row| {
                    Ok(ProfileRow {
                        display_name: row.get(0)?,
                        avatar_url: row.get(1)?,
                        timezone: row.get(2)?,
                        theme_preference: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .ok();

        Ok(row)
    }

    pub fn upsert_profile(
        &self,
        display_name: Option<&str>,
        avatar_url: Option<&str>,
        timezone: Option<&str>,
        theme_preference: Option<&str>,
    ) -> Result<()> {
        let now = Local::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO profile (id, display_name, avatar_url, timezone, theme_preference, created_at, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id)
                 DO UPDATE SET display_name=excluded.display_name, avatar_url=excluded.avatar_url,
                               timezone=excluded.timezone, theme_preference=excluded.theme_preference,
                               updated_at=excluded.updated_at",
                params![display_name, avatar_url, timezone, theme_preference, now],
            )
            .context("Failed to upsert profile")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_test_db(dir: &TempDir) -> Database {
        Database::open(&dir.path().join("orbit.db")).expect("open test db")
    }

    fn sample_routine(title: &str, start_time: &str) -> NewRoutine {
        NewRoutine {
            title: title.to_string(),
            description: None,
            start_time: start_time.to_string(),
            duration_minutes: 30,
            frequency: "daily".to_string(),
            custom_days: None,
            alarm_enabled: true,
        }
    }

    #[test]
    fn routines_list_ordered_by_start_time() {
        let dir = TempDir::new().expect("tempdir");
        let db = open_test_db(&dir);

        db.insert_routine(&sample_routine("Evening review", "21:00"))
            .expect("insert");
        db.insert_routine(&sample_routine("Morning run", "06:30"))
            .expect("insert");
        db.insert_routine(&sample_routine("Lunch walk", "12:15"))
            .expect("insert");

        let titles: Vec<String> = db
            .list_routines()
            .expect("list")
            .into_iter()
            .map(|routine| routine.title)
            .collect();

        assert_eq!(titles, vec!["Morning run", "Lunch walk", "Evening review"]);
    }

    #[test]
    fn toggle_completion_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let mut db = open_test_db(&dir);

        let routine = db
            .insert_routine(&sample_routine("Stretch", "07:00"))
            .expect("insert");
        let date = NaiveDate::from_ymd_opt(2024, 3, 11).expect("date");

        let first = db.toggle_completion(&routine.id, date).expect("toggle");
        assert_eq!(first, ToggleOutcome::Completed);
        assert_eq!(db.completions_for_date(date).expect("query").len(), 1);

        let second = db.toggle_completion(&routine.id, date).expect("toggle");
        assert_eq!(second, ToggleOutcome::Unmarked);
        assert!(db.completions_for_date(date).expect("query").is_empty());
    }

    #[test]
    fn deleting_routine_cascades_to_completions() {
        let dir = TempDir::new().expect("tempdir");
        let mut db = open_test_db(&dir);

        let routine = db
            .insert_routine(&sample_routine("Read", "20:00"))
            .expect("insert");
        let date = NaiveDate::from_ymd_opt(2024, 3, 11).expect("date");
        db.toggle_completion(&routine.id, date).expect("toggle");

        assert!(db.delete_routine(&routine.id).expect("delete"));
        assert!(db.completions_for_date(date).expect("query").is_empty());
    }

    #[test]
    fn find_routine_resolves_prefix_and_title() {
        let dir = TempDir::new().expect("tempdir");
        let db = open_test_db(&dir);

        let routine = db
            .insert_routine(&sample_routine("Morning pages", "08:00"))
            .expect("insert");

        let by_prefix = db
            .find_routine(&routine.id[..8])
            .expect("find")
            .expect("prefix match");
        assert_eq!(by_prefix.id, routine.id);

        let by_title = db
            .find_routine("morning pages")
            .expect("find")
            .expect("title match");
        assert_eq!(by_title.id, routine.id);

        assert!(db.find_routine("no such routine").expect("find").is_none());
    }

    #[test]
    fn custom_days_survive_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let db = open_test_db(&dir);

        let mut new = sample_routine("Gym", "18:00");
        new.frequency = "custom".to_string();
        new.custom_days = Some(vec![1, 3, 5]);
        let routine = db.insert_routine(&new).expect("insert");

        let fetched = db
            .routine_by_id(&routine.id)
            .expect("query")
            .expect("present");
        assert_eq!(fetched.custom_days, Some(vec![1, 3, 5]));
    }

    #[test]
    fn finance_settings_upsert_keeps_single_row() {
        let dir = TempDir::new().expect("tempdir");
        let db = open_test_db(&dir);

        assert!(db.finance_settings().expect("query").is_none());

        db.upsert_finance_settings(Some(2500.0), Some("USD"))
            .expect("insert");
        db.upsert_finance_settings(Some(2800.0), Some("EUR"))
            .expect("update");

        let settings = db.finance_settings().expect("query").expect("present");
        assert_eq!(settings.monthly_income, Some(2800.0));
        assert_eq!(settings.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn goals_list_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let db = open_test_db(&dir);

        let first = NewGoal {
            title: "Emergency fund".to_string(),
            category: "finance".to_string(),
            description: None,
            target_value: Some(5000.0),
            current_value: Some(0.0),
            target_date: None,
            daily_action: None,
        };
        let mut second = first.clone();
        second.title = "Read 12 books".to_string();
        second.category = "learning".to_string();

        db.insert_goal(&first).expect("insert");
        db.insert_goal(&second).expect("insert");

        let titles: Vec<String> = db
            .list_goals()
            .expect("list")
            .into_iter()
            .map(|goal| goal.title)
            .collect();
        assert_eq!(titles, vec!["Read 12 books", "Emergency fund"]);
    }
}
