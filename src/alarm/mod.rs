use crate::config::parse_hhmm;
use crate::db::RoutineRow;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Weekday};

pub const DEFAULT_ALARM_BODY: &str = "Time for your routine!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekends,
    Weekly,
    Custom,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekdays,
        Frequency::Weekends,
        Frequency::Weekly,
        Frequency::Custom,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "daily" => Some(Frequency::Daily),
            "weekdays" => Some(Frequency::Weekdays),
            "weekends" => Some(Frequency::Weekends),
            "weekly" => Some(Frequency::Weekly),
            "custom" => Some(Frequency::Custom),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekdays => "weekdays",
            Frequency::Weekends => "weekends",
            Frequency::Weekly => "weekly",
            Frequency::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmSchedule {
    Daily { at: NaiveTime },
    Weekly { weekday: Weekday, at: NaiveTime },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlarmEntry {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub schedule: AlarmSchedule,
}

/// Maps a routine id to the base of its notification id block. Stable per
/// routine; the low digit is left at zero so the per-weekday entries can
/// occupy offsets 0..=6. Distinct routine ids may collide into the same
/// block; ids only need to be stable per routine, not globally unique.
pub fn notification_base_id(routine_id: &str) -> i64 {
    let mut hash: i32 = 0;
    for unit in routine_id.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }

    i64::from(hash).abs() % 1_000_000 * 10
}

/// The full id range a routine's alarms can occupy. Cancellation always
/// covers all seven offsets regardless of frequency, so a frequency edit
/// never strands stale entries.
pub fn cancellation_ids(routine_id: &str) -> [i64; 7] {
    let base = notification_base_id(routine_id);
    std::array::from_fn(|offset| base + offset as i64)
}

fn weekday_from_index(day: u8) -> Option<Weekday> {
    match day {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

fn entry(routine: &RoutineRow, id: i64, schedule: AlarmSchedule) -> AlarmEntry {
    AlarmEntry {
        id,
        title: format!("⏰ {}", routine.title),
        body: routine
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_ALARM_BODY.to_string()),
        schedule,
    }
}

/// Translates a routine's recurrence rule into notification entries.
/// Daily routines get a single repeating entry; weekdays, weekends and
/// custom fan out into one weekly entry per day, ids base + position.
/// Weekly routines get no entries.
pub fn plan_routine_alarms(routine: &RoutineRow) -> Result<Vec<AlarmEntry>> {
    let at = parse_hhmm(&routine.start_time)
        .with_context(|| format!("Invalid start time for routine '{}'", routine.title))?;
    let base = notification_base_id(&routine.id);

    let frequency = match Frequency::parse(&routine.frequency) {
        Some(value) => value,
        None => return Ok(Vec::new()),
    };

    let entries = match frequency {
        Frequency::Daily => vec![entry(routine, base, AlarmSchedule::Daily { at })],
        Frequency::Weekdays => [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .iter()
        .enumerate()
        .map(|(offset, weekday)| {
            entry(
                routine,
                base + offset as i64,
                AlarmSchedule::Weekly {
                    weekday: *weekday,
                    at,
                },
            )
        })
        .collect(),
        Frequency::Weekends => [Weekday::Sun, Weekday::Sat]
            .iter()
            .enumerate()
            .map(|(offset, weekday)| {
                entry(
                    routine,
                    base + offset as i64,
                    AlarmSchedule::Weekly {
                        weekday: *weekday,
                        at,
                    },
                )
            })
            .collect(),
        Frequency::Custom => routine
            .custom_days
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|day| weekday_from_index(*day))
            .enumerate()
            .map(|(offset, weekday)| {
                entry(
                    routine,
                    base + offset as i64,
                    AlarmSchedule::Weekly { weekday, at },
                )
            })
            .collect(),
        Frequency::Weekly => Vec::new(),
    };

    Ok(entries)
}

/// First local datetime strictly after `now` matching the schedule.
pub fn next_occurrence(schedule: AlarmSchedule, now: DateTime<Local>) -> Result<DateTime<Local>> {
    match schedule {
        AlarmSchedule::Daily { at } => {
            let candidate = at_local(now.date_naive(), at)?;
            if candidate > now {
                Ok(candidate)
            } else {
                at_local(now.date_naive() + Duration::days(1), at)
            }
        }
        AlarmSchedule::Weekly { weekday, at } => {
            let today = now.date_naive();
            let ahead = i64::from(
                (7 + weekday.num_days_from_sunday() - today.weekday().num_days_from_sunday()) % 7,
            );
            let candidate = at_local(today + Duration::days(ahead), at)?;
            if candidate > now {
                Ok(candidate)
            } else {
                at_local(today + Duration::days(ahead + 7), at)
            }
        }
    }
}

fn at_local(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&date.and_time(time))
        .single()
        .with_context(|| format!("Failed to resolve local time {date} {time}"))
}

/// Earliest upcoming alarm across the given routines, with the routine title.
/// Routines whose start time fails to parse are skipped.
pub fn next_planned_fire(
    routines: &[RoutineRow],
    now: DateTime<Local>,
) -> Option<(String, DateTime<Local>)> {
    routines
        .iter()
        .filter_map(|routine| {
            let entries = plan_routine_alarms(routine).ok()?;
            let earliest = entries
                .into_iter()
                .filter_map(|entry| next_occurrence(entry.schedule, now).ok())
                .min()?;
            Some((routine.title.clone(), earliest))
        })
        .min_by_key(|(_, at)| *at)
}

/// Whether a routine's recurrence covers the given date. Weekly routines
/// recur on the weekday they were created.
pub fn due_on(routine: &RoutineRow, date: NaiveDate) -> bool {
    let frequency = match Frequency::parse(&routine.frequency) {
        Some(value) => value,
        None => return false,
    };

    match frequency {
        Frequency::Daily => true,
        Frequency::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        Frequency::Weekends => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        Frequency::Weekly => Local
            .timestamp_opt(routine.created_at, 0)
            .single()
            .is_some_and(|created| created.date_naive().weekday() == date.weekday()),
        Frequency::Custom => routine
            .custom_days
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|day| weekday_from_index(*day))
            .any(|weekday| weekday == date.weekday()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routine(frequency: &str, custom_days: Option<Vec<u8>>) -> RoutineRow {
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

    fn local(date: (i32, u32, u32), time: (u32, u32)) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .expect("date")
            .and_hms_opt(time.0, time.1, 0)
            .expect("time");
        Local.from_local_datetime(&naive).single().expect("local")
    }

    #[test]
    fn base_id_matches_reference_hash() {
        assert_eq!(notification_base_id("abc"), 963_540);
        assert_eq!(notification_base_id(""), 0);
    }

    #[test]
    fn base_id_is_stable_and_in_range() {
        let ids = [
            "2f1f9a1e-1111-4a5b-9a2e-7c246ef0b0aa",
            "b68cc929-7b44-4e7c-bd9d-1a8f9d0f3a11",
            "a-short-id",
        ];

        for id in ids {
            let first = notification_base_id(id);
            let second = notification_base_id(id);
            assert_eq!(first, second);
            assert!((0..=9_999_990).contains(&first));
            assert_eq!(first % 10, 0);
        }
    }

    #[test]
    fn cancellation_covers_seven_consecutive_ids() {
        let ids = cancellation_ids("some-routine");
        let base = notification_base_id("some-routine");

        assert_eq!(ids.len(), 7);
        for (offset, id) in ids.iter().enumerate() {
            assert_eq!(*id, base + offset as i64);
        }
    }

    #[test]
    fn daily_routine_plans_single_repeating_entry() {
        let routine = routine("daily", None);
        let entries = plan_routine_alarms(&routine).expect("plan");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, notification_base_id(&routine.id));
        assert_eq!(entries[0].title, "⏰ Morning run");
        assert_eq!(entries[0].body, DEFAULT_ALARM_BODY);
        assert_eq!(
            entries[0].schedule,
            AlarmSchedule::Daily {
                at: NaiveTime::from_hms_opt(6, 30, 0).expect("time")
            }
        );
    }

    #[test]
    fn weekday_routine_plans_five_weekly_entries() {
        let routine = routine("weekdays", None);
        let entries = plan_routine_alarms(&routine).expect("plan");
        let base = notification_base_id(&routine.id);

        assert_eq!(entries.len(), 5);
        let expected = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
        for (offset, entry) in entries.iter().enumerate() {
            assert_eq!(entry.id, base + offset as i64);
            assert_eq!(
                entry.schedule,
                AlarmSchedule::Weekly {
                    weekday: expected[offset],
                    at: NaiveTime::from_hms_opt(6, 30, 0).expect("time")
                }
            );
        }
    }

    #[test]
    fn weekend_routine_plans_sunday_then_saturday() {
        let routine = routine("weekends", None);
        let entries = plan_routine_alarms(&routine).expect("plan");
        let base = notification_base_id(&routine.id);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, base);
        assert!(matches!(
            entries[0].schedule,
            AlarmSchedule::Weekly {
                weekday: Weekday::Sun,
                ..
            }
        ));
        assert_eq!(entries[1].id, base + 1);
        assert!(matches!(
            entries[1].schedule,
            AlarmSchedule::Weekly {
                weekday: Weekday::Sat,
                ..
            }
        ));
    }

    #[test]
    fn custom_routine_plans_listed_days_in_order() {
        let routine = routine("custom", Some(vec![1, 3, 5]));
        let entries = plan_routine_alarms(&routine).expect("plan");
        let base = notification_base_id(&routine.id);

        let days: Vec<(i64, Weekday)> = entries
            .iter()
            .map(|entry| match entry.schedule {
                AlarmSchedule::Weekly { weekday, .. } => (entry.id, weekday),
                AlarmSchedule::Daily { .. } => panic!("custom plans weekly entries"),
            })
            .collect();

        assert_eq!(
            days,
            vec![
                (base, Weekday::Mon),
                (base + 1, Weekday::Wed),
                (base + 2, Weekday::Fri),
            ]
        );
    }

    #[test]
    fn weekly_and_empty_custom_plan_nothing() {
        assert!(plan_routine_alarms(&routine("weekly", None))
            .expect("plan")
            .is_empty());
        assert!(plan_routine_alarms(&routine("custom", None))
            .expect("plan")
            .is_empty());
        assert!(plan_routine_alarms(&routine("custom", Some(Vec::new())))
            .expect("plan")
            .is_empty());
    }

    #[test]
    fn routine_description_becomes_alarm_body() {
        let mut routine = routine("daily", None);
        routine.description = Some("Shoes by the door".to_string());

        let entries = plan_routine_alarms(&routine).expect("plan");
        assert_eq!(entries[0].body, "Shoes by the door");
    }

    #[test]
    fn daily_occurrence_rolls_to_tomorrow_after_time_passes() {
        let at = NaiveTime::from_hms_opt(9, 0, 0).expect("time");
        let schedule = AlarmSchedule::Daily { at };

        let before = local((2024, 3, 11), (8, 0));
        assert_eq!(
            next_occurrence(schedule, before).expect("next"),
            local((2024, 3, 11), (9, 0))
        );

        let after = local((2024, 3, 11), (10, 0));
        assert_eq!(
            next_occurrence(schedule, after).expect("next"),
            local((2024, 3, 12), (9, 0))
        );
    }

    #[test]
    fn weekly_occurrence_wraps_to_next_week() {
        // 2024-03-11 is a Monday.
        let at = NaiveTime::from_hms_opt(9, 0, 0).expect("time");
        let schedule = AlarmSchedule::Weekly {
            weekday: Weekday::Mon,
            at,
        };

        let monday_morning = local((2024, 3, 11), (8, 0));
        assert_eq!(
            next_occurrence(schedule, monday_morning).expect("next"),
            local((2024, 3, 11), (9, 0))
        );

        let monday_evening = local((2024, 3, 11), (19, 0));
        assert_eq!(
            next_occurrence(schedule, monday_evening).expect("next"),
            local((2024, 3, 18), (9, 0))
        );

        let wednesday = AlarmSchedule::Weekly {
            weekday: Weekday::Wed,
            at,
        };
        assert_eq!(
            next_occurrence(wednesday, monday_evening).expect("next"),
            local((2024, 3, 13), (9, 0))
        );
    }

    #[test]
    fn due_on_follows_frequency() {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).expect("date");
        let saturday = NaiveDate::from_ymd_opt(2024, 3, 16).expect("date");

        assert!(due_on(&routine("daily", None), monday));
        assert!(due_on(&routine("daily", None), saturday));

        assert!(due_on(&routine("weekdays", None), monday));
        assert!(!due_on(&routine("weekdays", None), saturday));

        assert!(!due_on(&routine("weekends", None), monday));
        assert!(due_on(&routine("weekends", None), saturday));

        assert!(due_on(&routine("custom", Some(vec![1])), monday));
        assert!(!due_on(&routine("custom", Some(vec![1])), saturday));
        assert!(!due_on(&routine("custom", None), monday));
    }

    #[test]
    fn next_planned_fire_picks_earliest_across_routines() {
        let mut evening = routine("daily", None);
        evening.id = "b68cc929-7b44-4e7c-bd9d-1a8f9d0f3a11".to_string();
        evening.title = "Evening stretch".to_string();
        evening.start_time = "21:00".to_string();

        let morning = routine("daily", None);
        let both = vec![morning, evening];

        let midday = local((2024, 3, 11), (12, 0));
        let (title, at) = next_planned_fire(&both, midday).expect("next fire");
        assert_eq!(title, "Evening stretch");
        assert_eq!(at, local((2024, 3, 11), (21, 0)));

        let late = local((2024, 3, 11), (22, 0));
        let (title, at) = next_planned_fire(&both, late).expect("next fire");
        assert_eq!(title, "Morning run");
        assert_eq!(at, local((2024, 3, 12), (6, 30)));

        assert!(next_planned_fire(&[routine("weekly", None)], midday).is_none());
    }
}
