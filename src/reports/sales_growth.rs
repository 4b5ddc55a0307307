//! Sales trend over the POS bill exports, current window against the window
//! before it.

use chrono::{Datelike, Duration, NaiveDate};

use crate::aggregate::Aggregator;
use crate::error::{OutletError, Result};
use crate::filter::{FilterSelection, Selection};
use crate::models::{Fact, SaleEntry};
use crate::period::{pct_delta, sales_window, Window, WindowBasis};

use super::{Metric, Report, ReportTable, Value};

/// Monday to Sunday calendar week, `04 Mar - 10 Mar`.
pub fn week_label(date: NaiveDate) -> String {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let sunday = monday + Duration::days(6);
    format!("{} - {}", monday.format("%d %b"), sunday.format("%d %b"))
}

/// `04-Mar-2024`
pub fn day_label(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string()
}

pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d-%b-%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d"))
        .map_err(|_| OutletError::InvalidDate(raw.to_string()))
}

/// Filters for this view. `weeks` holds calendar-week labels rather than
/// settlement weeks.
#[derive(Debug, Clone, Default)]
pub struct SalesSelection {
    pub years: Selection<i32>,
    pub months: Selection<u32>,
    pub weeks: Selection<String>,
    pub days: Selection<NaiveDate>,
    pub outlets: Selection<String>,
}

impl SalesSelection {
    pub fn from_filter(filter: &FilterSelection, days: Selection<NaiveDate>) -> Self {
        Self {
            years: filter.years.clone(),
            months: filter.months.clone(),
            weeks: filter.weeks.clone(),
            days,
            outlets: filter.locations.clone(),
        }
    }

    fn matches_period(&self, sale: &SaleEntry) -> bool {
        self.years.allows(&sale.year())
            && self.months.allows(&sale.month())
            && self.weeks.allows_str(&week_label(sale.date))
            && self.days.allows(&sale.date)
    }

    fn basis(&self) -> WindowBasis {
        WindowBasis {
            days: !self.days.is_all(),
            weeks: self.weeks.values().map_or(0, |w| w.len()),
            months: !self.months.is_all(),
            years: !self.years.is_all(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesGrowth {
    pub current: Window,
    pub previous: Window,
    pub current_sales: f64,
    pub previous_sales: f64,
    pub growth: f64,
}

fn total_in(entries: &[SaleEntry], window: Window, outlets: &Selection<String>) -> f64 {
    entries
        .iter()
        .filter(|s| window.contains(s.date) && outlets.allows_str(&s.location))
        .map(SaleEntry::sales_value)
        .sum()
}

pub fn growth(entries: &[SaleEntry], selection: &SalesSelection) -> Result<SalesGrowth> {
    let mut dates = entries
        .iter()
        .filter(|s| selection.matches_period(s))
        .map(|s| s.date);
    let first = dates.next().ok_or(OutletError::NoDataForFilter)?;
    let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));

    let current = Window { start, end };
    let previous = sales_window(current, selection.basis());
    let current_sales = total_in(entries, current, &selection.outlets);
    let previous_sales = total_in(entries, previous, &selection.outlets);
    tracing::debug!(?current, ?previous, current_sales, previous_sales, "sales windows");

    Ok(SalesGrowth {
        current,
        previous,
        current_sales,
        previous_sales,
        growth: pct_delta(current_sales, previous_sales),
    })
}

fn growth_note(growth: f64) -> String {
    if growth > 0.0 {
        format!("▲ {growth:.2}% increase vs previous period")
    } else if growth < 0.0 {
        format!("▼ {:.2}% decrease vs previous period", growth.abs())
    } else {
        "No change vs previous period".to_string()
    }
}

fn window_note(w: &Window) -> String {
    format!("{} to {}", day_label(w.start), day_label(w.end))
}

pub fn build(entries: &[SaleEntry], selection: &SalesSelection) -> Result<Report> {
    let g = growth(entries, selection)?;

    let mut report = Report::new("Sales Trends");
    report.subtitle = Some(format!(
        "{} compared with {}",
        window_note(&g.current),
        window_note(&g.previous)
    ));
    report.metrics = vec![
        Metric::new("Current Period Sales", Value::Whole(g.current_sales)).note(growth_note(g.growth)),
        Metric::new("Previous Period Sales", Value::Whole(g.previous_sales)).note(window_note(&g.previous)),
    ];

    let current_rows: Vec<&SaleEntry> = entries
        .iter()
        .filter(|s| g.current.contains(s.date) && selection.outlets.allows_str(&s.location))
        .collect();
    let by_tab: fn(&SaleEntry) -> String = |s| s.tab.clone();
    let by_outlet: fn(&SaleEntry) -> String = |s| s.location.clone();
    for (slug, title, key, by) in [
        ("tabs", "Sales by Tab", "Tab", by_tab),
        ("outlets", "Sales by Outlet", "Outlet", by_outlet),
    ] {
        let grouped = Aggregator::new()
            .group_by(key, by)
            .sum("Sales Value", |s: &SaleEntry| s.sales_value())
            .run(current_rows.iter().copied());
        let mut table = ReportTable::new(slug, title, &[key, "Sales Value"]);
        for group in &grouped.groups {
            table.push(vec![
                Value::text(&group.keys[0]),
                Value::Whole(grouped.value(group, "Sales Value")),
            ]);
        }
        table.push_total(vec![Value::text("Total"), Value::Whole(grouped.total("Sales Value"))]);
        report.tables.push(table);
    }
    Ok(report)
}
