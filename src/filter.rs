use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::calendar::bucket_of;
use crate::error::{OutletError, Result};
use crate::models::Fact;

const ALL_SENTINELS: &[&str] = &["all", "select all"];

/// One filter dimension: unconstrained, or a finite set of chosen values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T: Ord> {
    All,
    Only(BTreeSet<T>),
}

impl<T: Ord> Default for Selection<T> {
    fn default() -> Self {
        Selection::All
    }
}

impl<T: Ord> Selection<T> {
    pub fn only(values: impl IntoIterator<Item = T>) -> Self {
        let set: BTreeSet<T> = values.into_iter().collect();
        if set.is_empty() {
            Selection::All
        } else {
            Selection::Only(set)
        }
    }

    /// Parse CLI values. No values, or any `All`/`Select All`, means unconstrained.
    pub fn parse<F>(raw: &[String], parse: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<T>,
    {
        if raw.is_empty()
            || raw
                .iter()
                .any(|v| ALL_SENTINELS.contains(&v.trim().to_lowercase().as_str()))
        {
            return Ok(Selection::All);
        }
        let values = raw
            .iter()
            .map(|v| parse(v.trim()))
            .collect::<Result<BTreeSet<T>>>()?;
        Ok(Selection::Only(values))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    pub fn allows(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.contains(value),
        }
    }

    pub fn values(&self) -> Option<&BTreeSet<T>> {
        match self {
            Selection::All => None,
            Selection::Only(set) => Some(set),
        }
    }

    /// The single chosen value, if exactly one was chosen.
    pub fn single(&self) -> Option<&T> {
        match self {
            Selection::Only(set) if set.len() == 1 => set.iter().next(),
            _ => None,
        }
    }
}

impl Selection<String> {
    pub fn allows_str(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(set) => set.contains(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub years: Selection<i32>,
    pub months: Selection<u32>,
    pub locations: Selection<String>,
    /// Swiggy week labels, `YYYY-MM-DD - YYYY-MM-DD`.
    pub weeks: Selection<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl FilterSelection {
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        match (from, to) {
            (Some(f), Some(t)) if f > t => {
                return Err(OutletError::InvalidArgument(format!(
                    "--from {f} is after --to {t}"
                )));
            }
            _ => {}
        }
        self.from = from;
        self.to = to;
        Ok(self)
    }

    pub fn matches<F: Fact + ?Sized>(&self, fact: &F) -> bool {
        self.matches_period(fact) && self.locations.allows_str(fact.location())
    }

    /// Everything except the location dimension.
    pub fn matches_period<F: Fact + ?Sized>(&self, fact: &F) -> bool {
        if !self.years.allows(&fact.year()) || !self.months.allows(&fact.month()) {
            return false;
        }
        let Some(date) = fact.date() else {
            return self.weeks.is_all();
        };
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        match &self.weeks {
            Selection::All => true,
            Selection::Only(labels) => bucket_of(date)
                .map(|b| labels.contains(&b.label()))
                .unwrap_or(false),
        }
    }

    /// True when a `from`/`to` range is set but the facts carry no date.
    pub fn ignores_date_range<F: Fact>(&self, facts: &[F]) -> bool {
        (self.from.is_some() || self.to.is_some())
            && facts.first().map_or(false, |f| f.date().is_none())
    }

    pub fn apply<'a, F: Fact>(&self, facts: &'a [F]) -> Vec<&'a F> {
        if self.ignores_date_range(facts) {
            tracing::warn!("--from/--to ignored: this source has months, not dates");
        }
        facts.iter().filter(|f| self.matches(*f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PnlEntry;

    fn entry(year: i32, month: u32, location: &str) -> PnlEntry {
        PnlEntry {
            year,
            month,
            location: location.to_string(),
            category: "Revenue".to_string(),
            sub_category: String::new(),
            super_sub_category: String::new(),
            amount: 100.0,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_selection_sentinels_mean_all() {
        let parse = |s: &str| s.parse::<i32>().map_err(|e| OutletError::InvalidArgument(e.to_string()));
        assert!(Selection::parse(&[], parse).unwrap().is_all());
        assert!(Selection::parse(&strings(&["Select All", "2024"]), parse).unwrap().is_all());
        assert!(Selection::parse(&strings(&["ALL"]), parse).unwrap().is_all());
        let only = Selection::parse(&strings(&["2024", "2023"]), parse).unwrap();
        assert!(only.allows(&2023));
        assert!(!only.allows(&2022));
        assert_eq!(only.single(), None);
    }

    #[test]
    fn test_selection_parse_error_propagates() {
        let parse = |s: &str| s.parse::<i32>().map_err(|e| OutletError::InvalidArgument(e.to_string()));
        assert!(Selection::parse(&strings(&["twenty"]), parse).is_err());
    }

    #[test]
    fn test_filter_matches_each_dimension() {
        let filter = FilterSelection {
            years: Selection::only([2024]),
            months: Selection::only([3]),
            locations: Selection::only(["Indiranagar".to_string()]),
            ..FilterSelection::default()
        };
        assert!(filter.matches(&entry(2024, 3, "Indiranagar")));
        assert!(!filter.matches(&entry(2024, 4, "Indiranagar")));
        assert!(!filter.matches(&entry(2023, 3, "Indiranagar")));
        assert!(!filter.matches(&entry(2024, 3, "Koramangala")));
        assert!(filter.matches_period(&entry(2024, 3, "Koramangala")));
    }

    #[test]
    fn test_week_filter_rejects_undated_facts() {
        let filter = FilterSelection {
            weeks: Selection::only(["2024-03-03 - 2024-03-09".to_string()]),
            ..FilterSelection::default()
        };
        assert!(!filter.matches(&entry(2024, 3, "Indiranagar")));
    }

    #[test]
    fn test_date_range_must_be_ordered() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 10);
        let to = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert!(FilterSelection::default().with_date_range(from, to).is_err());
        assert!(FilterSelection::default().with_date_range(to, from).is_ok());
    }

    #[test]
    fn test_date_range_is_flagged_for_monthly_sources() {
        let filter = FilterSelection::default()
            .with_date_range(NaiveDate::from_ymd_opt(2024, 3, 5), None)
            .unwrap();
        let monthly = vec![entry(2024, 3, "HSR")];
        assert!(filter.ignores_date_range(&monthly));
        assert_eq!(filter.apply(&monthly).len(), 1);
        assert!(!FilterSelection::default().ignores_date_range(&monthly));

        let dated = vec![crate::models::PlatformOrder {
            order_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: "Delivered".to_string(),
            order_id: "1".to_string(),
            customer_paid: 10.0,
            source: String::new(),
        }];
        assert!(!filter.ignores_date_range(&dated));
        assert!(filter.apply(&dated).is_empty());
    }
}
