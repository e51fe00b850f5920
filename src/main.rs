mod alarm;
mod api;
mod cli;
mod config;
mod daemon;
mod db;
mod notify;
mod plan;
mod scheduler;
mod stats;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands, commands};
use crate::config::Config;
use crate::db::Database;
use crate::notify::DesktopNotifier;
use crate::stats::report::{review_line, summary_for_date};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard { install_daemon } => {
            let _ = run_onboarding(install_daemon)?;
            Ok(())
        }
        Commands::Routine { command } => {
            let config = load_config()?;
            commands::handle_routine_command(&config, command)
        }
        Commands::Goal { command } => {
            let config = load_config()?;
            commands::handle_goal_command(&config, command)
        }
        Commands::Finance { command } => {
            let config = load_config()?;
            commands::handle_finance_command(&config, command)
        }
        Commands::Profile { command } => {
            let config = load_config()?;
            commands::handle_profile_command(&config, command)
        }
        Commands::Today => {
            let config = load_config()?;
            commands::handle_today(&config)
        }
        Commands::Report { date, json } => {
            let config = load_config()?;
            commands::handle_report(&config, date, json)
        }
        Commands::Plan { prompt, apply } => {
            let config = load_config()?;
            commands::handle_plan(&config, &prompt, apply)
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Start => handle_start().await,
        Commands::Stop => handle_stop(),
        Commands::Restart => handle_restart(),
        Commands::Dashboard => handle_dashboard(),
        Commands::Service => {
            let config = load_config()?;
            run_service(config).await
        }
        Commands::Uninstall => handle_uninstall(),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let daemon_status = daemon::status(&config)?;

    let today = Local::now().date_naive();
    let items = stats::today_items(
        &database.list_routines()?,
        &database.completions_for_date(today)?,
        today,
    );
    let done = items.iter().filter(|item| item.done).count();
    let streak = stats::current_streak(&database.completion_dates()?, today);
    let next_alarm = alarm::next_planned_fire(&database.alarm_routines()?, Local::now());

    println!("Orbit status");
    println!("- daemon_label: {}", config.daemon_label);
    println!("- daemon_installed: {}", daemon_status.installed);
    println!("- daemon_loaded: {}", daemon_status.loaded);
    println!("- routines_due_today: {done} of {} done", items.len());
    println!("- streak_days: {streak}");
    println!(
        "- next_alarm: {}",
        next_alarm
            .map(|(title, at)| format!("{title} at {}", at.format("%Y-%m-%d %H:%M")))
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(database) => {
            println!("[OK] SQLite reachable: {}", config.db_path.display());

            let alarm_routines = database.alarm_routines()?;
            let mut slots = 0;
            let mut unplannable = Vec::new();
            for routine in &alarm_routines {
                match alarm::plan_routine_alarms(routine) {
                    Ok(entries) => slots += entries.len(),
                    Err(_) => unplannable.push(routine.title.clone()),
                }
            }
            if unplannable.is_empty() {
                println!(
                    "[OK] alarm plan: {} routine(s) mapping to {} slot(s)",
                    alarm_routines.len(),
                    slots
                );
            } else {
                println!(
                    "[WARN] routines with unplannable alarms: {}",
                    unplannable.join(", ")
                );
                issues.push("unplannable alarms".to_string());
            }

            // Weekly recurrence plans no alarm entries, so an alarm-enabled
            // weekly routine silently never fires.
            let weekly_alarmed: Vec<String> = alarm_routines
                .iter()
                .filter(|routine| routine.frequency == "weekly")
                .map(|routine| routine.title.clone())
                .collect();
            if !weekly_alarmed.is_empty() {
                println!(
                    "[WARN] weekly routines never map to alarm slots: {}",
                    weekly_alarmed.join(", ")
                );
                issues.push("weekly alarms".to_string());
            }
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if let Err(error) = config.parse_review_time() {
        println!("[WARN] invalid review_time setting: {error}");
        issues.push("invalid review_time".to_string());
    } else {
        println!("[OK] review_time format valid: {}", config.review_time);
    }

    if notify::notifier_command_available() {
        println!("[OK] desktop notifier command available");
    } else {
        println!("[WARN] no desktop notifier command (alarms cannot be delivered)");
        issues.push("notifier missing".to_string());
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn handle_start() -> Result<()> {
    let config = load_config()?;
    let daemon_status = daemon::status(&config)?;

    if daemon_status.installed {
        daemon::load(&config)?;
        println!("launchd daemon started");
        Ok(())
    } else {
        println!("launchd daemon is not installed. Running foreground service (Ctrl+C to stop).");
        run_service(config).await
    }
}

fn handle_stop() -> Result<()> {
    let config = load_config()?;
    daemon::unload(&config)?;
    println!("launchd daemon stopped");
    Ok(())
}

fn handle_restart() -> Result<()> {
    let config = load_config()?;
    daemon::restart(&config)?;
    println!("launchd daemon restarted");
    Ok(())
}

fn handle_dashboard() -> Result<()> {
    let config = load_or_default_config()?;
    ensure_dashboard_backend(&config)?;
    let url = format!("http://127.0.0.1:{}", config.api_port);

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(&url)
            .status()
            .context("Failed to open browser")?;
    }

    println!("Dashboard URL: {url}");
    Ok(())
}

fn handle_uninstall() -> Result<()> {
    let config = load_or_default_config()?;

    let _ = daemon::unload(&config);

    if let Ok(plist_path) = daemon::plist_path(&config) {
        if plist_path.exists() {
            let _ = fs::remove_file(&plist_path);
            println!("Removed daemon plist: {}", plist_path.display());
        }
    }

    println!("Remove binary: cargo uninstall orbit");
    println!("Remove data (optional): rm -rf ~/.orbit");

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let refresh = Arc::new(Notify::new());

    let alarm_config = Arc::clone(&shared_config);
    let alarm_refresh = Arc::clone(&refresh);

    let review_config = Arc::clone(&shared_config);
    let review_fallback = Arc::clone(&shared_config);

    let api_config = Arc::clone(&shared_config);
    let api_refresh = Arc::clone(&refresh);

    info!("Orbit service started");

    tokio::select! {
        alarm_result = scheduler::run_alarm_scheduler(
            alarm_config,
            Box::new(DesktopNotifier::new()),
            alarm_refresh,
        ) => {
            alarm_result?;
        }
        review_result = scheduler::run_review_scheduler(move || {
            let runtime = Config::load().unwrap_or_else(|_| (*review_fallback).clone());
            if !runtime.review_enabled {
                return Ok(None);
            }

            scheduler::cron_from_review_time(&runtime.review_time).map(Some)
        }, move |date| {
            let config = Arc::clone(&review_config);
            async move {
                let runtime = Config::load().unwrap_or_else(|_| (*config).clone());
                run_evening_review(&runtime, date)
            }
        }) => {
            review_result?;
        }
        api_result = api::run_server(api_config, api_refresh) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn run_evening_review(config: &Config, date: NaiveDate) -> Result<()> {
    let summary = summary_for_date(config, date)?;
    let line = review_line(&summary);

    if let Err(error) = notify::post_notification("Orbit evening review", &line) {
        warn!(error = %error, "failed to post review notification");
    }
    info!(date = %date, "evening review delivered");

    Ok(())
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load().with_context(|| "Config file not found. Run `orbit onboard` first.".to_string())
}

fn ensure_dashboard_backend(config: &Config) -> Result<()> {
    if is_port_open(config.api_port) {
        return Ok(());
    }

    let daemon_status = daemon::status(config)?;
    if daemon_status.installed {
        daemon::load(config)?;
        thread::sleep(Duration::from_millis(600));
        return Ok(());
    }

    let current_exe =
        std::env::current_exe().context("Failed to resolve current executable path")?;
    let mut command = Command::new(current_exe);
    command
        .arg("service")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .stdin(Stdio::null());

    command
        .spawn()
        .context("Failed to spawn dashboard backend process")?;
    thread::sleep(Duration::from_millis(900));

    if !is_port_open(config.api_port) {
        bail!("Failed to start dashboard server. Run `orbit start` or `orbit service`.");
    }

    Ok(())
}

fn is_port_open(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    TcpStream::connect_timeout(&addr, Duration::from_millis(250)).is_ok()
}
