// Job schedules (all times UTC)

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use std::fmt;
use std::time::Duration;

/// When a registered job runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Every day at a fixed time of day
    Daily { at: NaiveTime },
    /// Every week on `day` at a fixed time of day
    Weekly { day: Weekday, at: NaiveTime },
    /// Exactly once, `delay` after the scheduler first sees the job
    Once { delay: Duration },
}

impl Schedule {
    /// First due time for a job registered at `now`
    pub fn first_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Daily { at } => daily_after(now, at),
            Schedule::Weekly { day, at } => weekly_after(now, day, at),
            Schedule::Once { delay } => {
                now + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::zero())
            }
        }
    }

    /// Next occurrence strictly after `after`; `None` once a one-shot job has run
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Schedule::Daily { at } => Some(daily_after(after, at)),
            Schedule::Weekly { day, at } => Some(weekly_after(after, day, at)),
            Schedule::Once { .. } => None,
        }
    }

    pub fn is_once(&self) -> bool {
        matches!(self, Schedule::Once { .. })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Daily { at } => write!(f, "daily at {}", at.format("%H:%M")),
            Schedule::Weekly { day, at } => write!(f, "weekly on {} at {}", day, at.format("%H:%M")),
            Schedule::Once { delay } => write!(f, "once after {}s", delay.as_secs()),
        }
    }
}

fn at_time(date: NaiveDate, at: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(at))
}

fn daily_after(after: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let candidate = at_time(after.date_naive(), at);
    if candidate > after {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    }
}

fn weekly_after(after: DateTime<Utc>, day: Weekday, at: NaiveTime) -> DateTime<Utc> {
    let today = after.weekday().num_days_from_monday() as i64;
    let target = day.num_days_from_monday() as i64;
    let days_ahead = (target - today).rem_euclid(7);

    let candidate = at_time(after.date_naive(), at) + ChronoDuration::days(days_ahead);
    if candidate > after {
        candidate
    } else {
        candidate + ChronoDuration::weeks(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_daily_later_today() {
        let schedule = Schedule::Daily { at: hm(0, 5) };
        assert_eq!(schedule.first_run(utc(2025, 9, 30, 0, 1)), utc(2025, 9, 30, 0, 5));
    }

    #[test]
    fn test_daily_rolls_over_month_and_year() {
        let schedule = Schedule::Daily { at: hm(0, 5) };
        assert_eq!(
            schedule.next_after(utc(2025, 9, 30, 0, 5)),
            Some(utc(2025, 10, 1, 0, 5))
        );
        assert_eq!(
            schedule.next_after(utc(2025, 12, 31, 23, 0)),
            Some(utc(2026, 1, 1, 0, 5))
        );
    }

    #[test]
    fn test_weekly_same_day_before_and_after() {
        // 2025-09-22 is a Monday
        let schedule = Schedule::Weekly { day: Weekday::Mon, at: hm(9, 0) };
        assert_eq!(schedule.first_run(utc(2025, 9, 22, 8, 0)), utc(2025, 9, 22, 9, 0));
        assert_eq!(
            schedule.next_after(utc(2025, 9, 22, 9, 0)),
            Some(utc(2025, 9, 29, 9, 0))
        );
    }

    #[test]
    fn test_weekly_from_midweek() {
        let schedule = Schedule::Weekly { day: Weekday::Mon, at: hm(9, 0) };
        // Wednesday 2025-09-24 -> Monday 2025-09-29
        assert_eq!(schedule.first_run(utc(2025, 9, 24, 12, 0)), utc(2025, 9, 29, 9, 0));
    }

    #[test]
    fn test_once_fires_after_delay_then_never() {
        let schedule = Schedule::Once { delay: Duration::from_secs(10) };
        let now = utc(2025, 9, 24, 12, 0);
        assert_eq!(schedule.first_run(now), now + ChronoDuration::seconds(10));
        assert_eq!(schedule.next_after(now), None);
        assert!(schedule.is_once());
    }

    #[test]
    fn test_display() {
        assert_eq!(Schedule::Daily { at: hm(0, 5) }.to_string(), "daily at 00:05");
        assert_eq!(
            Schedule::Weekly { day: Weekday::Mon, at: hm(9, 0) }.to_string(),
            "weekly on Mon at 09:00"
        );
    }
}
