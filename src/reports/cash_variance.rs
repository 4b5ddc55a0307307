use crate::error::Result;
use crate::filter::FilterSelection;
use crate::models::CashEntry;

use super::{require_data, Metric, Report, ReportTable, Value};

pub struct CashSummary {
    pub expected: f64,
    pub actual: f64,
    pub variance: f64,
}

pub fn summarize(rows: &[&CashEntry]) -> CashSummary {
    CashSummary {
        expected: rows.iter().map(|r| r.expected_cash).sum(),
        actual: rows.iter().map(|r| r.actual_cash).sum(),
        variance: rows.iter().map(|r| r.variance()).sum(),
    }
}

pub fn build(entries: &[CashEntry], filter: &FilterSelection) -> Result<Report> {
    let mut rows = filter.apply(entries);
    require_data(&rows)?;
    rows.sort_by(|a, b| a.date.cmp(&b.date));

    let summary = summarize(&rows);
    let mut report = Report::new("Cash Variance Report");
    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        report.subtitle = Some(format!(
            "{} to {}",
            first.date.format("%d-%m-%Y"),
            last.date.format("%d-%m-%Y")
        ));
    }
    report.metrics = vec![
        Metric::new("Expected Cash Sales", Value::Whole(summary.expected)),
        Metric::new("Actual Cash Sales", Value::Whole(summary.actual)),
        Metric::new("Variance", Value::Whole(summary.variance)),
    ];

    let mut table = ReportTable::new(
        "details",
        "Cash Variance Details",
        &[
            "Date",
            "Location",
            "Total Sales",
            "Swiggy",
            "Zomato",
            "Card Sales",
            "UPI",
            "Dineout",
            "Zomato Pro",
            "Expenses",
            "Expected Cash Sales",
            "Actual Cash Sales",
            "Variance",
        ],
    );
    for r in &rows {
        table.push(vec![
            Value::text(r.date.format("%d-%m-%Y").to_string()),
            Value::text(&r.location),
            Value::Money(r.total_sales),
            Value::Money(r.swiggy),
            Value::Money(r.zomato),
            Value::Money(r.card_sales),
            Value::Money(r.upi),
            Value::Money(r.dineout),
            Value::Money(r.zomato_pro),
            Value::Money(r.expenses),
            Value::Money(r.expected_cash),
            Value::Money(r.actual_cash),
            Value::Money(r.variance()),
        ]);
    }
    report.tables.push(table);
    Ok(report)
}
