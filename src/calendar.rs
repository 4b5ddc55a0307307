//! Swiggy settlement weeks.
//!
//! Swiggy settles on weeks that end on Saturday and never cross a month. The
//! first week of a month runs from the 1st to the first Saturday; every later
//! week is seven days long, cut short at the end of the month.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::error::{OutletError, Result};

/// One settlement week, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekBucket {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `2024-03-03 - 2024-03-09`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

/// Lazily yields the weeks of one month in order.
#[derive(Debug, Clone)]
pub struct Weeks {
    next_start: NaiveDate,
    last: NaiveDate,
    first: bool,
}

impl Iterator for Weeks {
    type Item = WeekBucket;

    fn next(&mut self) -> Option<WeekBucket> {
        if self.next_start > self.last {
            return None;
        }
        let start = self.next_start;
        let span = if self.first {
            self.first = false;
            first_week_span(start.weekday())
        } else {
            6
        };
        let end = (start + Duration::days(span)).min(self.last);
        self.next_start = end + Duration::days(1);
        Some(WeekBucket { start, end })
    }
}

/// Days to add to the 1st to reach the end of the first week.
fn first_week_span(weekday: Weekday) -> i64 {
    match weekday {
        Weekday::Sat => 0,
        Weekday::Sun => 6,
        other => 5 - other.num_days_from_monday() as i64,
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| OutletError::InvalidDate(format!("{year:04}-{month:02}")))
}

pub fn weeks_of_month(year: i32, month: u32) -> Result<Weeks> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| OutletError::InvalidDate(format!("{year:04}-{month:02}")))?;
    let last = last_day_of_month(year, month)?;
    Ok(Weeks {
        next_start: first,
        last,
        first: true,
    })
}

pub fn bucket_of(date: NaiveDate) -> Result<WeekBucket> {
    weeks_of_month(date.year(), date.month())?
        .find(|w| w.contains(date))
        .ok_or_else(|| OutletError::InvalidDate(date.to_string()))
}

/// Parse a `YYYY-MM-DD - YYYY-MM-DD` label back into a bucket.
pub fn parse_week_label(label: &str) -> Option<WeekBucket> {
    let (start, end) = label.trim().split_once(" - ")?;
    let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").ok()?;
    (start <= end).then_some(WeekBucket { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_march_2024_starts_on_friday() {
        let weeks: Vec<_> = weeks_of_month(2024, 3).unwrap().collect();
        assert_eq!(weeks[0], WeekBucket { start: d(2024, 3, 1), end: d(2024, 3, 2) });
        assert_eq!(weeks[1], WeekBucket { start: d(2024, 3, 3), end: d(2024, 3, 9) });
        assert_eq!(weeks.last().unwrap().end, d(2024, 3, 31));
        assert_eq!(weeks.last().unwrap().start, d(2024, 3, 31));
        assert_eq!(weeks.len(), 6);
    }

    #[test]
    fn test_month_starting_sunday_has_six_day_first_week() {
        // 2024-09-01 is a Sunday
        let first = weeks_of_month(2024, 9).unwrap().next().unwrap();
        assert_eq!(first.start, d(2024, 9, 1));
        assert_eq!(first.end, d(2024, 9, 7));
        assert_eq!(first.end.weekday(), Weekday::Sat);
        assert_eq!(first.days(), 7);
    }

    #[test]
    fn test_month_starting_saturday_has_single_day_first_week() {
        // 2024-06-01 is a Saturday
        let weeks: Vec<_> = weeks_of_month(2024, 6).unwrap().collect();
        assert_eq!(weeks[0], WeekBucket { start: d(2024, 6, 1), end: d(2024, 6, 1) });
        assert_eq!(weeks[1], WeekBucket { start: d(2024, 6, 2), end: d(2024, 6, 8) });
    }

    #[test]
    fn test_february_leap_and_common_years() {
        let leap: Vec<_> = weeks_of_month(2024, 2).unwrap().collect();
        assert_eq!(leap.last().unwrap().end, d(2024, 2, 29));
        let common: Vec<_> = weeks_of_month(2023, 2).unwrap().collect();
        assert_eq!(common.last().unwrap().end, d(2023, 2, 28));
    }

    #[test]
    fn test_weeks_partition_every_month() {
        for year in [2019, 2020, 2023, 2024, 2025] {
            for month in 1..=12 {
                let weeks: Vec<_> = weeks_of_month(year, month).unwrap().collect();
                let last = last_day_of_month(year, month).unwrap();
                assert_eq!(weeks[0].start, d(year, month, 1));
                assert_eq!(weeks.last().unwrap().end, last);
                for pair in weeks.windows(2) {
                    assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
                }
                for (i, w) in weeks.iter().enumerate() {
                    assert!(w.days() >= 1 && w.days() <= 7);
                    assert_eq!(w.start.month(), month);
                    assert_eq!(w.end.month(), month);
                    if w.end != last {
                        assert_eq!(w.end.weekday(), Weekday::Sat, "{year}-{month} week {i}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_weeks_restart_on_each_call() {
        let a: Vec<_> = weeks_of_month(2024, 3).unwrap().collect();
        let b: Vec<_> = weeks_of_month(2024, 3).unwrap().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bucket_of_every_day_is_unique_and_idempotent() {
        let mut day = d(2024, 1, 1);
        while day <= d(2024, 12, 31) {
            let bucket = bucket_of(day).unwrap();
            assert!(bucket.contains(day));
            assert_eq!(bucket_of(day).unwrap(), bucket);
            let owners = weeks_of_month(day.year(), day.month())
                .unwrap()
                .filter(|w| w.contains(day))
                .count();
            assert_eq!(owners, 1);
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_bucket_label_format() {
        let bucket = bucket_of(d(2024, 3, 5)).unwrap();
        assert_eq!(bucket.label(), "2024-03-03 - 2024-03-09");
        assert_eq!(parse_week_label("2024-03-03 - 2024-03-09"), Some(bucket));
        assert_eq!(parse_week_label("last week"), None);
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        assert!(matches!(weeks_of_month(2024, 13), Err(OutletError::InvalidDate(_))));
        assert!(matches!(weeks_of_month(2024, 0), Err(OutletError::InvalidDate(_))));
    }
}
