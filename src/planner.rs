//! Fire-time planner: pure functions computing a [`Schedule`]'s first and subsequent firing.
//!
//! Nothing in this module touches the catalog, storage, or process handles; it is exercised
//! directly by unit tests and called by [`crate::execution`] with the execution table's
//! current `next_start_time`.

use crate::model::{Schedule, ScheduleType};
use crate::utils::{date_time_to_system_time, system_time_to_date_time};
use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use std::time::{Duration, SystemTime};

/// Sets the first `next_start_time` for a freshly loaded schedule (§4.3 `plan_first`).
/// Returns `None` when the schedule should never fire from the main loop
/// ([`ScheduleType::Manual`]), or when a [`ScheduleType::Interval`] row is missing its
/// `repeat` field (a malformed catalog row).
pub fn plan_first(schedule: &Schedule, start_time: SystemTime) -> Option<SystemTime> {
    match schedule.kind {
        ScheduleType::Interval => Some(start_time + schedule.repeat?),
        ScheduleType::Timed => {
            let civil_now = system_time_to_date_time(start_time);
            Some(date_time_to_system_time(plan_timed(schedule, &civil_now)))
        }
        ScheduleType::Startup => Some(start_time),
        ScheduleType::Manual => None,
    }
}

/// Computes the next firing after one has just occurred (§4.3 `plan_next`). `next_start_time`
/// is the firing that just happened; `now` is the current time used to compute catch-up
/// advancement for exclusive schedules. Returns `None` when the schedule is paused or has no
/// repeat — the caller should clear its stored `next_start_time` in that case.
pub fn plan_next(
    schedule: &Schedule,
    next_start_time: SystemTime,
    now: SystemTime,
    paused: bool,
) -> Option<SystemTime> {
    if paused {
        return None;
    }
    let repeat_seconds = schedule.repeat_seconds()?;

    let advance_seconds: u64 = if schedule.exclusive {
        if repeat_seconds == 0 {
            now.duration_since(next_start_time)
                .unwrap_or(Duration::ZERO)
                .as_secs()
        } else {
            let elapsed = now
                .duration_since(next_start_time)
                .unwrap_or(Duration::ZERO)
                .as_secs_f64();
            let periods = (elapsed / repeat_seconds as f64).ceil() as u64;
            periods * repeat_seconds
        }
    } else {
        repeat_seconds
    };

    match schedule.kind {
        ScheduleType::Timed => Some(advance_timed(schedule, next_start_time, advance_seconds)),
        _ => Some(next_start_time + Duration::from_secs(advance_seconds)),
    }
}

/// Advances a TIMED schedule's `next_start_time` by `advance_seconds` of civil time, then
/// re-derives the full civil instant if the resulting day no longer matches `schedule.day`
/// (§4.3, TIMED branch of `plan_next`).
fn advance_timed(schedule: &Schedule, next_start_time: SystemTime, advance_seconds: u64) -> SystemTime {
    let current_civil = system_time_to_date_time(next_start_time);
    let advanced_naive = current_civil.naive_local() + chrono::Duration::seconds(advance_seconds as i64);

    if let Some(day) = schedule.day {
        if iso_weekday(advanced_naive) != day {
            let midnight = advanced_naive.date().and_hms_opt(0, 0, 0).unwrap();
            let midnight_civil = resolve_civil(midnight);
            return date_time_to_system_time(plan_timed(schedule, &midnight_civil));
        }
    }

    date_time_to_system_time(resolve_civil(advanced_naive))
}

/// The TIMED civil algorithm (§4.3.1 `plan_timed`): computes the next local wall-clock
/// instant matching `schedule.time` (and `schedule.day`, if set) at or after `current_civil`.
pub fn plan_timed(schedule: &Schedule, current_civil: &DateTime<Local>) -> DateTime<Local> {
    resolve_civil(plan_timed_naive(schedule, current_civil))
}

fn plan_timed_naive(schedule: &Schedule, current_civil: &DateTime<Local>) -> NaiveDateTime {
    let target = schedule.time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    let current_date = current_civil.date_naive();

    let mut dt = if schedule.repeat_seconds() == Some(3600) {
        // Hourly repeat: keep the current hour, only the target's minute/second matter.
        let candidate = current_date
            .and_hms_opt(current_civil.hour(), target.minute(), target.second())
            .unwrap();
        if candidate.time() > target {
            candidate + chrono::Duration::hours(1)
        } else {
            candidate
        }
    } else {
        let candidate = current_date.and_time(target);
        if current_civil.time() > target {
            candidate + chrono::Duration::days(1)
        } else {
            candidate
        }
    };

    if let Some(day) = schedule.day {
        // Bounded at 6 iterations: one full week of candidate days.
        while iso_weekday(dt) != day {
            dt += chrono::Duration::days(1);
        }
    }

    dt
}

/// ISO weekday number, Monday = 1 … Sunday = 7.
fn iso_weekday(dt: NaiveDateTime) -> u8 {
    dt.weekday().number_from_monday() as u8
}

/// Resolves a naive civil datetime against `tz`, skipping forward to the next valid instant
/// when `naive` falls in a DST spring-forward gap (§9, resolved open question). Mirrors the
/// teacher's `rebuild_datetime_from_parts`: on an ambiguous instant (fall-back), picks the
/// earlier of the pair; on a nonexistent instant, probes forward a minute at a time before
/// giving up and forcing a UTC-based conversion. Generic over the timezone so it can be unit
/// tested against a fixed zone independent of the host's own `TZ`.
fn resolve_at<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earlier, _later) => earlier,
        LocalResult::None => {
            let mut candidate = naive;
            for _ in 0..10 {
                candidate += chrono::Duration::minutes(1);
                if let LocalResult::Single(dt) = tz.from_local_datetime(&candidate) {
                    return dt;
                }
            }
            chrono::Utc.from_utc_datetime(&naive).with_timezone(tz)
        }
    }
}

/// [`resolve_at`] pinned to the host's local timezone, used by the rest of this module.
fn resolve_civil(naive: NaiveDateTime) -> DateTime<Local> {
    resolve_at(&Local, naive)
}
