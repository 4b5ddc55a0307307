//! Inventory consumption and stock-loss views over the monthly stock extract.

use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::filter::FilterSelection;
use crate::models::{ConsumptionEntry, StockLossEntry};

use super::{require_data, Metric, Report, ReportTable, Value};

// ---------------------------------------------------------------------------
// Consumption
// ---------------------------------------------------------------------------

pub fn consumption(entries: &[ConsumptionEntry], filter: &FilterSelection) -> Result<Report> {
    let rows = filter.apply(entries);
    require_data(&rows)?;

    let grouped = Aggregator::new()
        .group_by("Item", |r: &ConsumptionEntry| r.item.clone())
        .group_by("UOM", |r: &ConsumptionEntry| r.uom.clone())
        .mean("Price", |r: &ConsumptionEntry| r.price)
        .sum("Opening Stock (Qty)", |r: &ConsumptionEntry| r.opening_qty)
        .sum("Purchases (Qty)", |r: &ConsumptionEntry| r.purchases_qty)
        .sum("Closing Stock", |r: &ConsumptionEntry| r.closing_qty)
        .sum("Consumption (Qty)", |r: &ConsumptionEntry| r.consumption_qty)
        .run(rows.iter().copied());

    let mut table = ReportTable::new(
        "consumption",
        "Inventory Consumption Details",
        &[
            "Item",
            "UOM",
            "Price",
            "Opening Stock (Qty)",
            "Purchases (Qty)",
            "Closing Stock",
            "Consumption (Qty)",
            "Consumption (Value)",
        ],
    );
    let mut total_value = 0.0;
    for g in &grouped.groups {
        let price = grouped.value(g, "Price");
        let qty = grouped.value(g, "Consumption (Qty)");
        total_value += qty * price;
        table.push(vec![
            Value::text(&g.keys[0]),
            Value::text(&g.keys[1]),
            Value::Money(price),
            Value::Qty(grouped.value(g, "Opening Stock (Qty)")),
            Value::Qty(grouped.value(g, "Purchases (Qty)")),
            Value::Qty(grouped.value(g, "Closing Stock")),
            Value::Qty(qty),
            Value::Money(qty * price),
        ]);
    }
    table.push_total(vec![
        Value::text("Total"),
        Value::Blank,
        Value::Money(grouped.mean_of_groups("Price")),
        Value::Qty(grouped.total("Opening Stock (Qty)")),
        Value::Qty(grouped.total("Purchases (Qty)")),
        Value::Qty(grouped.total("Closing Stock")),
        Value::Qty(grouped.total("Consumption (Qty)")),
        Value::Money(total_value),
    ]);

    let mut report = Report::new("Inventory Consumption");
    report.metrics = vec![
        Metric::new("Items", Value::Count(grouped.groups.len())),
        Metric::new("Consumption Value", Value::Money(total_value)).cost(),
    ];
    report.tables.push(table);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Stock loss
// ---------------------------------------------------------------------------

pub fn loss(entries: &[StockLossEntry], filter: &FilterSelection) -> Result<Report> {
    let rows = filter.apply(entries);
    require_data(&rows)?;

    let ideal: f64 = rows.iter().map(|r| r.ideal_closing_value).sum();
    let actual: f64 = rows.iter().map(|r| r.actual_closing_value).sum();
    // The card sums the sheet's own Variance column.
    let variance: f64 = rows.iter().map(|r| r.variance_qty).sum();

    let grouped = Aggregator::new()
        .group_by("Item", |r: &StockLossEntry| r.item.clone())
        .group_by("UOM", |r: &StockLossEntry| r.uom.clone())
        .mean("Avg Price", |r: &StockLossEntry| r.price)
        .sum("Ideal Closing Stock (Qty)", |r: &StockLossEntry| r.ideal_closing_qty)
        .sum("Actual Closing Stock (Qty)", |r: &StockLossEntry| r.actual_closing_qty)
        .sum("Variance (Qty)", |r: &StockLossEntry| r.variance_qty)
        .run(rows.iter().copied());

    let mut table = ReportTable::new(
        "items",
        "Inventory Details by Item",
        &[
            "Item",
            "UOM",
            "Avg Price",
            "Ideal Closing Stock (Qty)",
            "Actual Closing Stock (Qty)",
            "Variance (Qty)",
        ],
    );
    for g in &grouped.groups {
        table.push(vec![
            Value::text(&g.keys[0]),
            Value::text(&g.keys[1]),
            Value::Money(grouped.value(g, "Avg Price")),
            Value::Qty(grouped.value(g, "Ideal Closing Stock (Qty)")),
            Value::Qty(grouped.value(g, "Actual Closing Stock (Qty)")),
            Value::Qty(grouped.value(g, "Variance (Qty)")),
        ]);
    }

    let mut report = Report::new("Inventory Loss Analysis");
    report.metrics = vec![
        Metric::new("Ideal Closing Stock Value", Value::Money(ideal)),
        Metric::new("Actual Closing Stock Value", Value::Money(actual)),
        Metric::new("Variance", Value::Money(variance)),
    ];
    report.tables.push(table);
    Ok(report)
}
