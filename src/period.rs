//! Previous-period inference for period-over-period comparisons.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::calendar::last_day_of_month;
use crate::error::Result;
use crate::filter::{FilterSelection, Selection};
use crate::models::Fact;

/// Months present in the data, per year.
#[derive(Debug, Clone, Default)]
pub struct PeriodIndex {
    months: BTreeMap<i32, BTreeSet<u32>>,
}

impl PeriodIndex {
    pub fn from_facts<'a, F, I>(facts: I) -> Self
    where
        F: Fact + 'a,
        I: IntoIterator<Item = &'a F>,
    {
        let mut months: BTreeMap<i32, BTreeSet<u32>> = BTreeMap::new();
        for f in facts {
            months.entry(f.year()).or_default().insert(f.month());
        }
        Self { months }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.months.keys().copied()
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.months.keys().next_back().copied()
    }

    pub fn months_of(&self, year: i32) -> BTreeSet<u32> {
        self.months.get(&year).cloned().unwrap_or_default()
    }
}

/// The period to compare against: one month, or a whole year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonPeriod {
    pub year: i32,
    pub month: Option<u32>,
}

impl ComparisonPeriod {
    pub fn contains<F: Fact + ?Sized>(&self, fact: &F) -> bool {
        fact.year() == self.year && self.month.map_or(true, |m| fact.month() == m)
    }

    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let (first_month, last_month) = match self.month {
            Some(m) => (m, m),
            None => (1, 12),
        };
        let start = NaiveDate::from_ymd_opt(self.year, first_month, 1).ok_or_else(|| {
            crate::error::OutletError::InvalidDate(format!("{}-{first_month:02}", self.year))
        })?;
        Ok((start, last_day_of_month(self.year, last_month)?))
    }

    pub fn label(&self) -> String {
        match self.month {
            Some(m) => format!("{:04}-{m:02}", self.year),
            None => format!("{}", self.year),
        }
    }
}

/// Infer the period preceding the current year/month selection.
///
/// One year and one month compares against the month before (January rolls
/// back to December of the previous year). One year with every month compares
/// against the whole previous year. Anything else has no comparison.
pub fn resolve_previous(
    index: &PeriodIndex,
    years: &Selection<i32>,
    months: &Selection<u32>,
) -> Option<ComparisonPeriod> {
    let year = match years {
        Selection::Only(set) if set.len() == 1 => *set.iter().next()?,
        Selection::All => {
            let mut known = index.years();
            let only = known.next()?;
            if known.next().is_some() {
                return None;
            }
            only
        }
        Selection::Only(_) => return None,
    };
    let known_months = index.months_of(year);

    if let Some(&month) = months.single() {
        if !known_months.contains(&month) {
            return Some(ComparisonPeriod { year: year - 1, month: None });
        }
        let (prev_year, prev_month) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
        return Some(ComparisonPeriod { year: prev_year, month: Some(prev_month) });
    }

    // An unconstrained month compares against the whole previous year, even
    // when the selected year only has data for one month.
    let covers_year = match months {
        Selection::All => true,
        Selection::Only(set) => !known_months.is_empty() && known_months.is_subset(set),
    };
    covers_year.then_some(ComparisonPeriod { year: year - 1, month: None })
}

/// Facts in the comparison period, narrowed by the current location filter.
pub fn previous_records<'a, F: Fact>(
    facts: &'a [F],
    period: &ComparisonPeriod,
    filter: &FilterSelection,
) -> Vec<&'a F> {
    facts
        .iter()
        .filter(|f| period.contains(*f) && filter.locations.allows_str(f.location()))
        .collect()
}

/// `(current - previous) / previous * 100`, or 0 when there is no baseline.
pub fn pct_delta(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

/// `part` as a percentage of `whole`; undefined when `whole` is 0.
pub fn share(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        None
    } else {
        Some(part / whole * 100.0)
    }
}

/// Which explicit filters drove the current sales window.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowBasis {
    pub days: bool,
    pub weeks: usize,
    pub months: bool,
    pub years: bool,
}

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn shifted_back(&self, days: i64) -> Window {
        Window {
            start: self.start - Duration::days(days),
            end: self.end - Duration::days(days),
        }
    }
}

/// The window a sales-growth figure is compared against.
pub fn sales_window(current: Window, basis: WindowBasis) -> Window {
    if basis.days {
        return current.shifted_back(current.days());
    }
    if basis.weeks > 0 {
        return current.shifted_back(7 * basis.weeks as i64);
    }
    if basis.months {
        let first_of_month = current.start.with_day(1).unwrap_or(current.start);
        let end = first_of_month - Duration::days(1);
        let start = end.with_day(1).unwrap_or(end);
        return Window { start, end };
    }
    if basis.years {
        let year_back = |d: NaiveDate| d.checked_sub_months(Months::new(12)).unwrap_or(d);
        return Window {
            start: year_back(current.start),
            end: year_back(current.end),
        };
    }
    current.shifted_back(current.days())
}
