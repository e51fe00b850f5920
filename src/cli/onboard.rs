use crate::config::{Config, DEFAULT_REVIEW_TIME, parse_hhmm};
use crate::daemon;
use crate::db::Database;
use crate::notify;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

const CURRENCIES: [&str; 8] = ["USD", "EUR", "GBP", "JPY", "CAD", "AUD", "TZS", "KES"];
const THEMES: [&str; 3] = ["light", "dark", "system"];

pub fn run_onboarding(install_daemon_flag: bool) -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to Orbit onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();

    println!("\n[1/7] Desktop notifications");
    println!("  Routine alarms are delivered through the system notifier.");

    if notify::notifier_command_available() {
        println!("  ✓ Notifier command available");

        let send_test = Confirm::with_theme(&theme)
            .with_prompt("  Send a test notification now?")
            .default(true)
            .interact()
            .context("Failed to read notification test input")?;

        if send_test {
            match notify::post_notification("Orbit", "Notifications are working.") {
                Ok(()) => println!("  ✓ Test notification sent"),
                Err(error) => println!("  ! Test notification failed: {error}"),
            }
        }
    } else {
        println!("  ! No notifier command found (alarms will be skipped until one is installed)");
    }

    println!("\n[2/7] Your name");
    let display_name: String = Input::with_theme(&theme)
        .with_prompt("  How should Orbit greet you? (blank to skip)")
        .allow_empty(true)
        .interact_text()
        .context("Failed to read display name")?;

    println!("\n[3/7] Timezone");
    let timezone: String = Input::with_theme(&theme)
        .with_prompt("  Timezone name")
        .default(default_timezone())
        .interact_text()
        .context("Failed to read timezone")?;

    println!("\n[4/7] Dashboard theme");
    let theme_index = Select::with_theme(&theme)
        .with_prompt("  Preferred theme")
        .default(2)
        .items(&THEMES)
        .interact()
        .context("Failed to select theme")?;
    let theme_preference = THEMES[theme_index];

    println!("\n[5/7] Monthly budget");
    let income_input: String = Input::with_theme(&theme)
        .with_prompt("  Monthly income (blank to skip)")
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            let trimmed = input.trim();
            if trimmed.is_empty() || trimmed.parse::<f64>().is_ok_and(|value| value >= 0.0) {
                Ok(())
            } else {
                Err("Enter a non-negative number or leave blank")
            }
        })
        .interact_text()
        .context("Failed to read monthly income")?;
    let monthly_income = income_input.trim().parse::<f64>().ok();

    let currency_index = Select::with_theme(&theme)
        .with_prompt("  Currency")
        .default(0)
        .items(&CURRENCIES)
        .interact()
        .context("Failed to select currency")?;
    let currency = CURRENCIES[currency_index];

    println!("\n[6/7] Evening review time");
    let review_time: String = Input::with_theme(&theme)
        .with_prompt("  Daily review notification time")
        .default(DEFAULT_REVIEW_TIME.to_string())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_hhmm(input)
                .map(|_| ())
                .map_err(|_| "Use HH:MM format (example: 21:00)")
        })
        .interact_text()
        .context("Failed to read review time")?;
    println!("  ✓ Review runs daily at {review_time}");

    println!("\n[7/7] Background service");
    println!("  Register a launchd service so alarms fire without a terminal open.");

    let install_daemon = if install_daemon_flag {
        true
    } else {
        Confirm::with_theme(&theme)
            .with_prompt("  Install the service now?")
            .default(true)
            .interact()
            .context("Failed to read daemon install input")?
    };

    let config = Config {
        review_time,
        ..Config::default()
    };

    config.ensure_bootstrap_files()?;
    config.save()?;

    let database = Database::open(&config.db_path)?;
    let trimmed_name = display_name.trim();
    database.upsert_profile(
        (!trimmed_name.is_empty()).then_some(trimmed_name),
        None,
        Some(timezone.trim()),
        Some(theme_preference),
    )?;
    database.upsert_finance_settings(monthly_income, Some(currency))?;

    if install_daemon {
        match daemon::install(&config) {
            Ok(plist_path) => println!("  ✓ Service installed ({})", plist_path.display()),
            Err(error) => println!("  ! Service install failed: {error}"),
        }
    } else {
        println!("  ✓ Skipped service installation");
    }

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Create your first routine: orbit routine add \"Morning run\" --at 06:30");
    println!("  Check state anytime: orbit status");
    println!("──────────────────────────────────────────");

    Ok(config)
}

fn default_timezone() -> String {
    std::env::var("TZ")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "UTC".to_string())
}
