pub const CREATE_ROUTINES: &str = r#"
CREATE TABLE IF NOT EXISTS routines (
  id               TEXT PRIMARY KEY,
  title            TEXT NOT NULL,
  description      TEXT,
  start_time       TEXT NOT NULL,
  duration_minutes INTEGER NOT NULL,
  frequency        TEXT NOT NULL DEFAULT 'daily',
  custom_days      TEXT,
  is_active        INTEGER NOT NULL DEFAULT 1,
  alarm_enabled    INTEGER NOT NULL DEFAULT 1,
  created_at       INTEGER NOT NULL,
  updated_at       INTEGER NOT NULL
);
"#;

pub const CREATE_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS goals (
  id            TEXT PRIMARY KEY,
  title         TEXT NOT NULL,
  category      TEXT NOT NULL DEFAULT 'personal',
  description   TEXT,
  target_value  REAL,
  current_value REAL,
  target_date   TEXT,
  daily_action  TEXT,
  is_active     INTEGER NOT NULL DEFAULT 1,
  created_at    INTEGER NOT NULL,
  updated_at    INTEGER NOT NULL
);
"#;

pub const CREATE_EXPENSES: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
  id         TEXT PRIMARY KEY,
  title      TEXT NOT NULL,
  amount     REAL NOT NULL,
  category   TEXT NOT NULL DEFAULT 'other',
  is_fixed   INTEGER NOT NULL DEFAULT 0,
  frequency  TEXT,
  created_at INTEGER NOT NULL
);
"#;

pub const CREATE_SAVINGS_GOALS: &str = r#"
CREATE TABLE IF NOT EXISTS savings_goals (
  id             TEXT PRIMARY KEY,
  title          TEXT NOT NULL,
  target_amount  REAL NOT NULL,
  current_amount REAL,
  target_date    TEXT,
  created_at     INTEGER NOT NULL,
  updated_at     INTEGER NOT NULL
);
"#;

pub const CREATE_FINANCE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS finance_settings (
  id             INTEGER PRIMARY KEY CHECK (id = 1),
  monthly_income REAL,
  currency       TEXT,
  updated_at     INTEGER NOT NULL
);
"#;

pub const CREATE_TASK_COMPLETIONS: &str = r#"
CREATE TABLE IF NOT EXISTS task_completions (
  id             TEXT PRIMARY KEY,
  routine_id     TEXT NOT NULL REFERENCES routines(id) ON DELETE CASCADE,
  completed_date TEXT NOT NULL,
  completed_at   INTEGER,
  status         TEXT NOT NULL DEFAULT 'completed',
  created_at     INTEGER NOT NULL,
  UNIQUE (routine_id, completed_date)
);
"#;

pub const CREATE_PROFILE: &str = r#"
CREATE TABLE IF NOT EXISTS profile (
  id               INTEGER PRIMARY KEY CHECK (id = 1),
  display_name     TEXT,
  avatar_url       TEXT,
  timezone         TEXT,
  theme_preference TEXT,
  created_at       INTEGER NOT NULL,
  updated_at       INTEGER NOT NULL
);
"#;

pub const INDEX_COMPLETIONS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_task_completions_date ON task_completions(completed_date);";

pub const INDEX_COMPLETIONS_ROUTINE: &str =
    "CREATE INDEX IF NOT EXISTS idx_task_completions_routine ON task_completions(routine_id);";

pub const INDEX_ROUTINES_START_TIME: &str =
    "CREATE INDEX IF NOT EXISTS idx_routines_start_time ON routines(start_time);";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ROUTINES,
        CREATE_GOALS,
        CREATE_EXPENSES,
        CREATE_SAVINGS_GOALS,
        CREATE_FINANCE_SETTINGS,
        CREATE_TASK_COMPLETIONS,
        CREATE_PROFILE,
        INDEX_COMPLETIONS_DATE,
        INDEX_COMPLETIONS_ROUTINE,
        INDEX_ROUTINES_START_TIME,
    ]
}
