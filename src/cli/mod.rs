pub mod commands;
pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "orbit",
    about = "Routine, goal & budget tracker with desktop alarms"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard {
        #[arg(long, default_value_t = false)]
        install_daemon: bool,
    },
    Routine {
        #[command(subcommand)]
        command: RoutineCommands,
    },
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    Finance {
        #[command(subcommand)]
        command: FinanceCommands,
    },
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    Today,
    Report {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Plan {
        prompt: String,
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    Start,
    Stop,
    Restart,
    Dashboard,
    Service,
    Uninstall,
}

#[derive(Debug, Subcommand)]
pub enum RoutineCommands {
    Add {
        title: String,
        #[arg(long, default_value = "09:00")]
        at: String,
        #[arg(long, default_value_t = 30)]
        duration: i64,
        #[arg(long, default_value = "daily")]
        frequency: String,
        #[arg(long, value_delimiter = ',', help = "Days for custom frequency, 0=Sunday .. 6=Saturday")]
        days: Vec<u8>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = false)]
        no_alarm: bool,
    },
    List {
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    Edit {
        routine: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
        #[arg(long)]
        frequency: Option<String>,
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<u8>>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
        #[arg(long)]
        alarm: Option<bool>,
    },
    Remove {
        routine: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Done {
        routine: String,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum GoalCommands {
    Add {
        title: String,
        #[arg(long, default_value = "personal")]
        category: String,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, help = "Target date, YYYY-MM-DD")]
        due: Option<String>,
        #[arg(long)]
        daily_action: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    Progress {
        goal: String,
        value: f64,
    },
    Edit {
        goal: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        target: Option<f64>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        daily_action: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    Remove {
        goal: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum FinanceCommands {
    Income {
        amount: f64,
        #[arg(long)]
        currency: Option<String>,
    },
    Expense {
        #[command(subcommand)]
        command: ExpenseCommands,
    },
    Savings {
        #[command(subcommand)]
        command: SavingsCommands,
    },
    Summary,
}

#[derive(Debug, Subcommand)]
pub enum ExpenseCommands {
    Add {
        title: String,
        amount: f64,
        #[arg(long, default_value = "other")]
        category: String,
        #[arg(long, default_value = "monthly", help = "monthly, weekly or yearly")]
        frequency: String,
        #[arg(long, default_value_t = false, help = "Record a one-off expense instead of a fixed cost")]
        one_time: bool,
    },
    List,
    Remove {
        expense: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SavingsCommands {
    Add {
        title: String,
        target: f64,
        #[arg(long, help = "Target date, YYYY-MM-DD")]
        due: Option<String>,
        #[arg(long)]
        initial: Option<f64>,
    },
    List,
    Fund {
        goal: String,
        amount: f64,
    },
    Remove {
        goal: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    Show,
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        theme: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
