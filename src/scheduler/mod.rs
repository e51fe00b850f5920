use crate::config::{Config, parse_hhmm};
use crate::db::Database;
use crate::notify::{Notifier, sync_routine_alarms};
use anyhow::{Context, Result, bail};
use chrono::{
    DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone,
    Timelike,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

const RESCHEDULE_POLL_SECONDS: u64 = 30;

/// Keeps the notifier's pending set in line with the database and delivers
/// due alarms. Re-plans every poll interval, or immediately when the
/// refresh channel is poked by an in-process write.
pub async fn run_alarm_scheduler(
    config: Arc<Config>,
    mut notifier: Box<dyn Notifier>,
    refresh: Arc<Notify>,
) -> Result<()> {
    let poll = Duration::from_secs(RESCHEDULE_POLL_SECONDS);
    let mut permission_warned = false;
    let mut last_logged_fire: Option<DateTime<Local>> = None;

    loop {
        match notifier.request_permission() {
            Ok(true) => {
                permission_warned = false;
            }
            Ok(false) => {
                if !permission_warned {
                    warn!("notification permission unavailable; alarms are disabled");
                    permission_warned = true;
                }
                sleep(poll).await;
                continue;
            }
            Err(error) => {
                error!(error = %error, "failed to probe notification permission");
                sleep(poll).await;
                continue;
            }
        }

        let now = Local::now();
        match Database::open(&config.db_path) {
            Ok(database) => {
                if let Err(error) = sync_routine_alarms(&database, notifier.as_mut(), now) {
                    error!(error = %error, "failed to sync routine alarms");
                }
            }
            Err(error) => {
                error!(error = %error, "failed to open database for alarm sync");
            }
        }

        let next = notifier.next_fire();
        if next != last_logged_fire {
            match next {
                Some(at) => info!(
                    next_fire = %at.format("%Y-%m-%d %H:%M"),
                    pending = notifier.pending().len(),
                    "next alarm set"
                ),
                None => debug!("no pending alarms"),
            }
            last_logged_fire = next;
        }

        let wait = wait_for_next(next, now, poll);
        tokio::select! {
            _ = sleep(wait) => {}
            _ = refresh.notified() => {
                debug!("alarm plan refresh requested");
                continue;
            }
        }

        match notifier.deliver_due(Local::now()) {
            Ok(0) => {}
            Ok(count) => info!(count, "alarms delivered"),
            Err(error) => error!(error = %error, "alarm delivery failed"),
        }
    }
}

fn wait_for_next(
    next: Option<DateTime<Local>>,
    now: DateTime<Local>,
    poll: Duration,
) -> Duration {
    match next {
        Some(at) => (at - now).to_std().unwrap_or(Duration::ZERO).min(poll),
        None => poll,
    }
}

pub fn cron_from_review_time(review_time: &str) -> Result<String> {
    let time = parse_hhmm(review_time)?;
    Ok(format!("{} {} * * *", time.minute(), time.hour()))
}

/// Daily cron loop for the evening review. The provider is re-read every
/// poll so a config change takes effect without a restart; `Ok(None)`
/// means the review is disabled.
pub async fn run_review_scheduler<S, F, Fut>(mut schedule_provider: S, mut task: F) -> Result<()>
where
    S: FnMut() -> Result<Option<String>>,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut last_logged_cron = String::new();

    loop {
        let cron_expr = match schedule_provider() {
            Ok(Some(value)) => value,
            Ok(None) => {
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
            Err(error) => {
                error!(error = %error, "failed to load review schedule");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        let delay = match seconds_until_next_run(&cron_expr) {
            Ok(value) => value,
            Err(error) => {
                error!(error = %error, cron = %cron_expr, "invalid review cron expression");
                sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
                continue;
            }
        };

        if cron_expr != last_logged_cron {
            info!(seconds = delay.as_secs(), cron = %cron_expr, "next review schedule set");
            last_logged_cron = cron_expr.clone();
        }

        if delay > Duration::from_secs(RESCHEDULE_POLL_SECONDS) {
            sleep(Duration::from_secs(RESCHEDULE_POLL_SECONDS)).await;
            continue;
        }

        sleep(delay).await;

        let date = Local::now().date_naive();
        let result = task(date).await;

        if let Err(error) = result {
            error!(error = %error, date = %date, "scheduled review failed");
        }

        sleep(Duration::from_secs(1)).await;
    }
}

fn seconds_until_next_run(cron_expr: &str) -> Result<Duration> {
    let target_time = parse_daily_cron_time(cron_expr)?;
    let now = Local::now();
    let today = now.date_naive();

    let candidate_today = match Local.from_local_datetime(&today.and_time(target_time)) {
        LocalResult::Single(datetime) => datetime,
        _ => {
            let fallback_day = today + ChronoDuration::days(1);
            Local
                .from_local_datetime(&fallback_day.and_time(target_time))
                .single()
                .context("Failed to convert schedule time")?
        }
    };

    let next_run = if candidate_today > now {
        candidate_today
    } else {
        let tomorrow = today + ChronoDuration::days(1);
        Local
            .from_local_datetime(&tomorrow.and_time(target_time))
            .single()
            .context("Failed to convert next execution time")?
    };

    (next_run - now)
        .to_std()
        .context("Failed to compute next execution delay")
}

fn parse_daily_cron_time(cron_expr: &str) -> Result<NaiveTime> {
    let fields = cron_expr.split_whitespace().collect::<Vec<_>>();

    if fields.len() != 5 {
        bail!("Invalid cron expression: {cron_expr}. Expected format: '<minute> <hour> * * *'");
    }

    if fields[2] != "*" || fields[3] != "*" || fields[4] != "*" {
        bail!(
            "Unsupported cron expression: {cron_expr}. Only daily format '<minute> <hour> * * *' is supported"
        );
    }

    let minute = fields[0]
        .parse::<u32>()
        .with_context(|| format!("Invalid cron minute: {}", fields[0]))?;
    let hour = fields[1]
        .parse::<u32>()
        .with_context(|| format!("Invalid cron hour: {}", fields[1]))?;

    NaiveTime::from_hms_opt(hour, minute, 0)
        .with_context(|| format!("Invalid cron time values: hour={hour}, minute={minute}"))
}

#[cfg(test)]
mod tests {
    use super::{cron_from_review_time, seconds_until_next_run, wait_for_next};
    use chrono::{Duration as ChronoDuration, Local};
    use tokio::time::Duration;

    #[test]
    fn cron_conversion_from_review_time() {
        let expr = cron_from_review_time("21:30").expect("cron expression");
        assert_eq!(expr, "30 21 * * *");
    }

    #[test]
    fn schedule_delay_is_positive() {
        let delay = seconds_until_next_run("30 23 * * *").expect("delay computed");
        assert!(delay.as_secs() > 0);
    }

    #[test]
    fn rejects_non_daily_cron_expression() {
        assert!(seconds_until_next_run("*/5 * * * *").is_err());
    }

    #[test]
    fn wait_clamps_to_poll_window() {
        let now = Local::now();
        let poll = Duration::from_secs(30);

        assert_eq!(wait_for_next(None, now, poll), poll);
        assert_eq!(
            wait_for_next(Some(now + ChronoDuration::hours(2)), now, poll),
            poll
        );
        assert_eq!(
            wait_for_next(Some(now - ChronoDuration::seconds(5)), now, poll),
            Duration::ZERO
        );

        let soon = wait_for_next(Some(now + ChronoDuration::seconds(10)), now, poll);
        assert!(soon <= Duration::from_secs(10));
    }
}
