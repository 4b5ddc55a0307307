use crate::error::Result;
use crate::filter::FilterSelection;
use crate::models::DishEntry;
use crate::period::share;

use super::{require_data, Metric, Report, ReportTable, Value};

pub fn build(entries: &[DishEntry], filter: &FilterSelection) -> Result<Report> {
    let mut rows = filter.apply(entries);
    require_data(&rows)?;
    rows.sort_by(|a, b| b.total_revenue().total_cmp(&a.total_revenue()));

    let total_cost: f64 = rows.iter().map(|r| r.total_cost()).sum();
    let total_revenue: f64 = rows.iter().map(|r| r.total_revenue()).sum();

    let mut report = Report::new("Dish Level Costing");
    report.metrics = vec![
        Metric::new("Total Cost Value", Value::Whole(total_cost)).cost(),
        Metric::new("Total Revenue", Value::Whole(total_revenue)),
        Metric::new(
            "Food Cost %",
            Value::Percent(Some(share(total_cost, total_revenue).unwrap_or(0.0))),
        )
        .cost(),
    ];

    let mut table = ReportTable::new(
        "items",
        "Item-wise Food Cost Details",
        &[
            "Item Name",
            "Cost Price",
            "Selling Qty",
            "Total Cost",
            "Total Revenue",
            "% of Cost",
            "% of Margin",
        ],
    );
    for r in &rows {
        let cost_pct = share(r.total_cost(), r.total_revenue());
        table.push(vec![
            Value::text(&r.item),
            Value::Money(r.cost_price),
            Value::Qty(r.selling_qty),
            Value::Money(r.total_cost()),
            Value::Money(r.total_revenue()),
            Value::Percent(cost_pct),
            Value::Percent(cost_pct.map(|p| 100.0 - p)),
        ]);
    }
    report.tables.push(table);
    Ok(report)
}
