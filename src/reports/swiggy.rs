use std::collections::HashMap;

use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::filter::FilterSelection;
use crate::models::{OutletMapping, SwiggyOrder};

use super::{require_data, Metric, Report, ReportTable, Value};

/// Fill in each order's Swiggy restaurant id from the deployment mapping.
/// The first mapping row for a deployment wins.
pub fn attach_restaurant_ids(orders: &mut [SwiggyOrder], mapping: &[OutletMapping]) {
    let mut by_deployment: HashMap<&str, &str> = HashMap::new();
    for m in mapping {
        by_deployment
            .entry(m.deployment.trim())
            .or_insert(m.restaurant_id.trim());
    }
    let mut unmapped = 0usize;
    for order in orders.iter_mut() {
        match by_deployment.get(order.location.trim()) {
            Some(id) => order.restaurant_id = Some(id.to_string()),
            None if order.restaurant_id.is_none() => unmapped += 1,
            None => {}
        }
    }
    if unmapped > 0 {
        tracing::warn!(unmapped, "orders without a restaurant id mapping");
    }
}

pub fn build(orders: &[SwiggyOrder], filter: &FilterSelection) -> Result<Report> {
    let rows = filter.apply(orders);
    require_data(&rows)?;

    let total: f64 = rows.iter().map(|o| o.gross).sum();
    let mut report = Report::new("Swiggy POS Sales");
    report.metrics = vec![
        Metric::new("Gross Bill Amount", Value::Whole(total)),
        Metric::new("Orders", Value::Count(rows.len())),
    ];

    let by_week = Aggregator::new()
        .group_by("Week", |o: &SwiggyOrder| o.week.label())
        .sum("Gross Bill Amount", |o: &SwiggyOrder| o.gross)
        .run(rows.iter().copied());
    let mut weeks = ReportTable::new("weeks", "Sales by Swiggy Week", &["Week", "Orders", "Gross Bill Amount"]);
    for g in &by_week.groups {
        weeks.push(vec![
            Value::text(&g.keys[0]),
            Value::Count(g.count),
            Value::Whole(by_week.value(g, "Gross Bill Amount")),
        ]);
    }
    weeks.push_total(vec![Value::text("Total"), Value::Count(rows.len()), Value::Whole(total)]);

    let by_location = Aggregator::new()
        .group_by("Location", |o: &SwiggyOrder| o.location.clone())
        .group_by("Restaurant ID", |o: &SwiggyOrder| o.restaurant_id.clone().unwrap_or_default())
        .sum("Gross Bill Amount", |o: &SwiggyOrder| o.gross)
        .run(rows.iter().copied());
    let mut locations = ReportTable::new(
        "locations",
        "Sales by Location",
        &["Location", "Restaurant ID", "Orders", "Gross Bill Amount"],
    );
    for g in &by_location.groups {
        locations.push(vec![
            Value::text(&g.keys[0]),
            Value::text(&g.keys[1]),
            Value::Count(g.count),
            Value::Whole(by_location.value(g, "Gross Bill Amount")),
        ]);
    }

    report.tables.push(weeks);
    report.tables.push(locations);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::bucket_of;
    use crate::filter::Selection;
    use chrono::NaiveDate;

    fn order(id: &str, location: &str, day: u32, gross: f64) -> SwiggyOrder {
        let bill_date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        SwiggyOrder {
            location: location.to_string(),
            order_id: id.to_string(),
            bill_date,
            gross,
            source: "march.xlsx".to_string(),
            restaurant_id: None,
            week: bucket_of(bill_date).unwrap(),
        }
    }

    fn sample() -> Vec<SwiggyOrder> {
        vec![
            order("1", "HSR", 1, 100.0),
            order("2", "HSR", 2, 200.0),
            order("3", "HSR", 5, 300.0),
            order("4", "Indiranagar", 5, 400.0),
        ]
    }

    #[test]
    fn test_attach_restaurant_ids() {
        let mut orders = sample();
        let mapping = vec![
            OutletMapping { restaurant_id: " 5501 ".to_string(), deployment: "HSR".to_string() },
            OutletMapping { restaurant_id: "9999".to_string(), deployment: "HSR".to_string() },
        ];
        attach_restaurant_ids(&mut orders, &mapping);
        assert_eq!(orders[0].restaurant_id.as_deref(), Some("5501"));
        assert_eq!(orders[3].restaurant_id, None);
    }

    #[test]
    fn test_sales_by_week() {
        let report = build(&sample(), &FilterSelection::default()).unwrap();
        let weeks = report.table("weeks").unwrap();
        assert_eq!(weeks.cell("2024-03-01 - 2024-03-02", "Gross Bill Amount"), Some(&Value::Whole(300.0)));
        assert_eq!(weeks.cell("2024-03-03 - 2024-03-09", "Orders"), Some(&Value::Count(2)));
        assert_eq!(report.metric("Gross Bill Amount").unwrap().value, Value::Whole(1000.0));
    }

    #[test]
    fn test_week_filter_uses_settlement_weeks() {
        let filter = FilterSelection {
            weeks: Selection::only(["2024-03-03 - 2024-03-09".to_string()]),
            locations: Selection::only(["HSR".to_string()]),
            ..FilterSelection::default()
        };
        let report = build(&sample(), &filter).unwrap();
        assert_eq!(report.metric("Gross Bill Amount").unwrap().value, Value::Whole(300.0));
        let locations = report.table("locations").unwrap();
        assert_eq!(locations.rows.len(), 1);
    }
}
