use std::collections::BTreeSet;

use crate::aggregate::{Aggregator, Grouped};
use crate::error::{OutletError, Result};
use crate::filter::{FilterSelection, Selection};
use crate::models::FoodCostEntry;
use crate::period::PeriodIndex;

use super::{require_data, Metric, Report, ReportTable, Value};

/// Divisors that turn sums into per-month / per-outlet averages.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Averaging {
    cards: f64,
    locations: f64,
    categories: f64,
}

fn averaging(rows: &[&FoodCostEntry], filter: &FilterSelection) -> Averaging {
    let months = rows.iter().map(|r| r.month).collect::<BTreeSet<_>>().len() as f64;
    let locations = rows.iter().map(|r| r.location.as_str()).collect::<BTreeSet<_>>().len() as f64;
    match (filter.months.is_all(), filter.locations.is_all()) {
        (true, true) => Averaging {
            cards: months * locations,
            locations: months,
            categories: months * locations,
        },
        (false, true) => Averaging {
            cards: locations,
            locations: 1.0,
            categories: locations,
        },
        _ => Averaging {
            cards: 1.0,
            locations: 1.0,
            categories: 1.0,
        },
    }
}

fn cost_table<'a>(key: &'static str, by: fn(&FoodCostEntry) -> String) -> Aggregator<'a, FoodCostEntry> {
    Aggregator::new()
        .group_by(key, by)
        .sum("Ideal Cost", |r: &FoodCostEntry| r.ideal_cost)
        .sum("Actual Cost", |r: &FoodCostEntry| r.actual_cost)
        .sum("Variance", |r: &FoodCostEntry| r.variance)
}

fn scaled(mut grouped: Grouped, divisor: f64) -> Grouped {
    for measure in ["Ideal Cost", "Actual Cost", "Variance"] {
        grouped.scale(measure, divisor);
    }
    grouped
}

fn to_table(slug: &'static str, title: &str, grouped: &Grouped) -> ReportTable {
    let key = grouped.key_names.first().copied().unwrap_or("");
    let mut table = ReportTable::new(slug, title, &[key, "Ideal Cost", "Actual Cost", "Variance"]);
    for g in &grouped.groups {
        table.push(vec![
            Value::text(g.keys.join(" / ")),
            Value::Money(grouped.value(g, "Ideal Cost")),
            Value::Money(grouped.value(g, "Actual Cost")),
            Value::Money(grouped.value(g, "Variance")),
        ]);
    }
    table
}

/// The year the view works on: the one selected, or the latest on file.
pub fn working_year(entries: &[FoodCostEntry], years: &Selection<i32>) -> Result<i32> {
    match years {
        Selection::All => PeriodIndex::from_facts(entries)
            .latest_year()
            .ok_or(OutletError::NoDataForFilter),
        Selection::Only(set) if set.len() == 1 => set
            .iter()
            .next()
            .copied()
            .ok_or(OutletError::NoDataForFilter),
        Selection::Only(_) => Err(OutletError::InvalidArgument(
            "food cost compares one year at a time; pass a single --year".to_string(),
        )),
    }
}

pub fn build(entries: &[FoodCostEntry], filter: &FilterSelection) -> Result<Report> {
    let year = working_year(entries, &filter.years)?;
    let filter = FilterSelection {
        years: Selection::only([year]),
        ..filter.clone()
    };
    let rows = filter.apply(entries);
    require_data(&rows)?;

    let avg = averaging(&rows, &filter);
    tracing::debug!(year, rows = rows.len(), ?avg, "food cost averaging");

    let div = |v: f64| if avg.cards == 0.0 { v } else { v / avg.cards };
    let mut report = Report::new("Ideal vs Actual Food Cost");
    report.subtitle = Some(format!("Year {year}"));
    report.metrics = vec![
        Metric::new("Ideal Food Cost", Value::Money(div(rows.iter().map(|r| r.ideal_cost).sum()))).cost(),
        Metric::new("Actual Food Cost", Value::Money(div(rows.iter().map(|r| r.actual_cost).sum()))).cost(),
        Metric::new("Variance", Value::Money(div(rows.iter().map(|r| r.variance).sum()))),
    ];

    let by_location = scaled(
        cost_table("Location", |r| r.location.clone()).run(rows.iter().copied()),
        avg.locations,
    );
    let by_category = scaled(
        cost_table("Category", |r| r.category.clone()).run(rows.iter().copied()),
        avg.categories,
    );
    report.tables.push(to_table("location", "Location-wise Food Cost", &by_location));
    report.tables.push(to_table("category", "Category-wise Food Cost", &by_category));
    Ok(report)
}
