use crate::alarm::{self, AlarmEntry, cancellation_ids, plan_routine_alarms};
use crate::db::Database;
use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PendingAlarm {
    pub entry: AlarmEntry,
    pub next_fire: DateTime<Local>,
}

/// Seam to the platform notification layer. The service owns one notifier
/// for its lifetime; entries are keyed by id and re-scheduling an id
/// replaces the previous entry.
pub trait Notifier: Send {
    fn request_permission(&mut self) -> Result<bool>;
    fn schedule(&mut self, entries: &[AlarmEntry], now: DateTime<Local>) -> Result<()>;
    fn cancel(&mut self, ids: &[i64]) -> Result<()>;
    fn pending(&self) -> Vec<PendingAlarm>;
    fn next_fire(&self) -> Option<DateTime<Local>>;
    fn deliver_due(&mut self, now: DateTime<Local>) -> Result<usize>;
}

/// Posts desktop notifications through the platform notifier command and
/// keeps the pending set in memory. Delivery failures are logged and the
/// entry stays scheduled for its next occurrence.
pub struct DesktopNotifier {
    pending: BTreeMap<i64, PendingAlarm>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&mut self) -> Result<bool> {
        Ok(notifier_command_available())
    }

    fn schedule(&mut self, entries: &[AlarmEntry], now: DateTime<Local>) -> Result<()> {
        for entry in entries {
            match alarm::next_occurrence(entry.schedule, now) {
                Ok(next_fire) => {
                    self.pending.insert(
                        entry.id,
                        PendingAlarm {
                            entry: entry.clone(),
                            next_fire,
                        },
                    );
                }
                Err(error) => {
                    warn!(error = %error, id = entry.id, "skipping unschedulable alarm entry");
                }
            }
        }

        Ok(())
    }

    fn cancel(&mut self, ids: &[i64]) -> Result<()> {
        for id in ids {
            self.pending.remove(id);
        }

        Ok(())
    }

    fn pending(&self) -> Vec<PendingAlarm> {
        self.pending.values().cloned().collect()
    }

    fn next_fire(&self) -> Option<DateTime<Local>> {
        self.pending.values().map(|alarm| alarm.next_fire).min()
    }

    fn deliver_due(&mut self, now: DateTime<Local>) -> Result<usize> {
        let due_ids: Vec<i64> = self
            .pending
            .iter()
            .filter(|(_, alarm)| alarm.next_fire <= now)
            .map(|(id, _)| *id)
            .collect();

        let mut delivered = 0;
        for id in due_ids {
            let Some(alarm) = self.pending.get(&id) else {
                continue;
            };

            if let Err(error) = post_notification(&alarm.entry.title, &alarm.entry.body) {
                warn!(error = %error, id, "failed to post notification");
            } else {
                debug!(id, title = %alarm.entry.title, "notification delivered");
                delivered += 1;
            }

            // Both schedule kinds repeat, so a fired entry rolls forward
            // instead of leaving the pending set.
            let schedule = alarm.entry.schedule;
            match alarm::next_occurrence(schedule, now) {
                Ok(next_fire) => {
                    if let Some(alarm) = self.pending.get_mut(&id) {
                        alarm.next_fire = next_fire;
                    }
                }
                Err(error) => {
                    warn!(error = %error, id, "dropping alarm entry without next occurrence");
                    self.pending.remove(&id);
                }
            }
        }

        Ok(delivered)
    }
}

/// Re-plans every routine's alarms against the notifier: the full id range
/// is cancelled first, then active routines with alarms enabled get their
/// planned entries scheduled. Returns the number of scheduled entries.
pub fn sync_routine_alarms(
    db: &Database,
    notifier: &mut dyn Notifier,
    now: DateTime<Local>,
) -> Result<usize> {
    let routines = db.list_routines()?;
    let mut scheduled = 0;

    for routine in &routines {
        notifier.cancel(&cancellation_ids(&routine.id))?;

        if !routine.is_active || !routine.alarm_enabled {
            continue;
        }

        match plan_routine_alarms(routine) {
            Ok(entries) => {
                scheduled += entries.len();
                notifier.schedule(&entries, now)?;
            }
            Err(error) => {
                warn!(error = %error, routine = %routine.title, "skipping alarms for routine");
            }
        }
    }

    Ok(scheduled)
}

/// Whether the platform notifier command is usable from this process.
pub fn notifier_command_available() -> bool {
    #[cfg(target_os = "macos")]
    {
        // osascript ships with the OS.
        true
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        std::process::Command::new("notify-send")
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(target_os = "macos")]
pub fn post_notification(title: &str, body: &str) -> std::io::Result<()> {
    let script = format!(
        "display notification \"{}\" with title \"{}\" sound name \"default\"",
        applescript_quote(body),
        applescript_quote(title)
    );
    let output = std::process::Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(std::io::Error::other(stderr))
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn post_notification(title: &str, body: &str) -> std::io::Result<()> {
    let output = std::process::Command::new("notify-send")
        .arg(title)
        .arg(body)
        .output()?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(std::io::Error::other(stderr))
    }
}

#[cfg(not(unix))]
pub fn post_notification(_title: &str, _body: &str) -> std::io::Result<()> {
    Err(std::io::Error::other("no notifier command on this platform"))
}

#[cfg(target_os = "macos")]
fn applescript_quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
pub struct MemoryNotifier {
    pub granted: bool,
    pub pending: BTreeMap<i64, PendingAlarm>,
    pub cancelled: Vec<i64>,
    pub delivered: Vec<i64>,
}

#[cfg(test)]
impl MemoryNotifier {
    pub fn new() -> Self {
        Self {
            granted: true,
            pending: BTreeMap::new(),
            cancelled: Vec::new(),
            delivered: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Notifier for MemoryNotifier {
    fn request_permission(&mut self) -> Result<bool> {
        Ok(self.granted)
    }

    fn schedule(&mut self, entries: &[AlarmEntry], now: DateTime<Local>) -> Result<()> {
        for entry in entries {
            let next_fire = alarm::next_occurrence(entry.schedule, now)?;
            self.pending.insert(
                entry.id,
                PendingAlarm {
                    entry: entry.clone(),
                    next_fire,
                },
            );
        }
        Ok(())
    }

    fn cancel(&mut self, ids: &[i64]) -> Result<()> {
        for id in ids {
            self.cancelled.push(*id);
            self.pending.remove(id);
        }
        Ok(())
    }

    fn pending(&self) -> Vec<PendingAlarm> {
        self.pending.values().cloned().collect()
    }

    fn next_fire(&self) -> Option<DateTime<Local>> {
        self.pending.values().map(|alarm| alarm.next_fire).min()
    }

    fn deliver_due(&mut self, now: DateTime<Local>) -> Result<usize> {
        let due_ids: Vec<i64> = self
            .pending
            .iter()
            .filter(|(_, alarm)| alarm.next_fire <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &due_ids {
            self.delivered.push(*id);
            if let Some(alarm) = self.pending.get_mut(id) {
                alarm.next_fire = alarm::next_occurrence(alarm.entry.schedule, now)?;
            }
        }

        Ok(due_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::notification_base_id;
    use crate::db::NewRoutine;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::TempDir;

    fn local(date: (i32, u32, u32), time: (u32, u32)) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .expect("date")
            .and_hms_opt(time.0, time.1, 0)
            .expect("time");
        Local.from_local_datetime(&naive).single().expect("local")
    }

    fn new_routine(title: &str, frequency: &str, alarm_enabled: bool) -> NewRoutine {
        NewRoutine {
            title: title.to_string(),
            description: None,
            start_time: "07:00".to_string(),
            duration_minutes: 30,
            frequency: frequency.to_string(),
            custom_days: None,
            alarm_enabled,
        }
    }

    #[test]
    fn sync_schedules_active_alarm_routines() {
        let dir = TempDir::new().expect("tempdir");
        let db = Database::open(&dir.path().join("orbit.db")).expect("open db");
        let mut notifier = MemoryNotifier::new();

        let daily = db
            .insert_routine(&new_routine("Stretch", "daily", true))
            .expect("insert");
        db.insert_routine(&new_routine("Silent", "daily", false))
            .expect("insert");

        let scheduled =
            sync_routine_alarms(&db, &mut notifier, local((2024, 3, 11), (6, 0))).expect("sync");

        assert_eq!(scheduled, 1);
        assert_eq!(notifier.pending.len(), 1);
        assert!(notifier
            .pending
            .contains_key(&notification_base_id(&daily.id)));
        // Both routines had their full id range cancelled before scheduling.
        assert_eq!(notifier.cancelled.len(), 14);
    }

    #[test]
    fn sync_drops_entries_for_deactivated_routine() {
        let dir = TempDir::new().expect("tempdir");
        let db = Database::open(&dir.path().join("orbit.db")).expect("open db");
        let mut notifier = MemoryNotifier::new();
        let now = local((2024, 3, 11), (6, 0));

        let routine = db
            .insert_routine(&new_routine("Stretch", "weekdays", true))
            .expect("insert");
        sync_routine_alarms(&db, &mut notifier, now).expect("sync");
        assert_eq!(notifier.pending.len(), 5);

        let mut updated = routine.clone();
        updated.is_active = false;
        db.update_routine(&updated).expect("update");

        sync_routine_alarms(&db, &mut notifier, now).expect("sync");
        assert!(notifier.pending.is_empty());
    }

    #[test]
    fn delivery_rolls_daily_entry_to_next_day() {
        let mut notifier = MemoryNotifier::new();
        let entry = AlarmEntry {
            id: 100,
            title: "⏰ Stretch".to_string(),
            body: "Time for your routine!".to_string(),
            schedule: crate::alarm::AlarmSchedule::Daily {
                at: chrono::NaiveTime::from_hms_opt(7, 0, 0).expect("time"),
            },
        };

        notifier
            .schedule(std::slice::from_ref(&entry), local((2024, 3, 11), (6, 0)))
            .expect("schedule");
        assert_eq!(notifier.next_fire(), Some(local((2024, 3, 11), (7, 0))));

        let delivered = notifier
            .deliver_due(local((2024, 3, 11), (7, 0)))
            .expect("deliver");
        assert_eq!(delivered, 1);
        assert_eq!(notifier.delivered, vec![100]);
        assert_eq!(notifier.next_fire(), Some(local((2024, 3, 12), (7, 0))));
    }
}
