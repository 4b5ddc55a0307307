//! Swiggy reconciliation: consolidate raw POS and platform exports into one
//! sheet each, then match orders by id per settlement week.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::calendar::{bucket_of, WeekBucket};
use crate::error::{OutletError, Result};
use crate::filter::FilterSelection;
use crate::loader::{list_files, read_sheet, ColumnMap, ReadOptions, Row};
use crate::models::{PlatformOrder, SwiggyOrder};
use crate::reports::{Metric, Report, ReportTable, Value};

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// POS Swiggy order reports.
    Pos,
    /// Swiggy partner payout workbooks.
    Platform,
}

impl Feed {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Feed::Pos => &["Deployment", "Order Id", "Bill Date", "Gross Bill Amount"],
            Feed::Platform => &["Order Date", "Order Status", "Order ID", "Total Customer Paid"],
        }
    }

    pub fn read_options(self) -> ReadOptions {
        match self {
            Feed::Pos => ReadOptions::skip(5),
            Feed::Platform => ReadOptions::skip(2).worksheet("Order Level"),
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            Feed::Pos => &["csv", "xlsx", "xls"],
            Feed::Platform => &["xlsx", "xls"],
        }
    }

    /// Rows that are report furniture rather than orders.
    fn keep(self, row: &Row<'_>) -> bool {
        match self {
            Feed::Pos => {
                !row.text("Deployment").eq_ignore_ascii_case("grand total")
                    && self.columns().iter().all(|c| !row.text(c).is_empty())
            }
            Feed::Platform => !row.is_blank(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consolidation {
    pub files_read: usize,
    pub files_skipped: usize,
    pub rows: usize,
}

/// Collect every matching file under `input` into one CSV at `output`, with a
/// `Source` column naming the file each row came from.
pub fn consolidate(feed: Feed, input: &Path, output: &Path) -> Result<Consolidation> {
    let columns = feed.columns();
    let opts = feed.read_options();
    let mut summary = Consolidation::default();
    let mut out_rows: Vec<Vec<String>> = Vec::new();

    for file in list_files(input, feed.extensions())? {
        let sheet = match read_sheet(&file, &opts) {
            Ok(sheet) => sheet,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping unreadable file");
                summary.files_skipped += 1;
                continue;
            }
        };
        let map = match ColumnMap::resolve(&sheet, columns, &[]) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "skipping file");
                summary.files_skipped += 1;
                continue;
            }
        };
        let before = out_rows.len();
        for cells in &sheet.rows {
            let row = Row::new(&map, cells);
            if !feed.keep(&row) {
                continue;
            }
            let mut record: Vec<String> = columns.iter().map(|c| row.text(c).to_string()).collect();
            record.push(sheet.file.clone());
            out_rows.push(record);
        }
        tracing::info!(file = %sheet.file, rows = out_rows.len() - before, "consolidated");
        summary.files_read += 1;
    }

    if out_rows.is_empty() {
        return Err(OutletError::SourceUnavailable(format!(
            "no matching data under {}",
            input.display()
        )));
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(output)?;
    let mut header: Vec<&str> = columns.to_vec();
    header.push("Source");
    wtr.write_record(&header)?;
    for record in &out_rows {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    summary.rows = out_rows.len();
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekRecon {
    pub pos_orders: usize,
    pub pos_amount: f64,
    pub platform_orders: usize,
    pub platform_amount: f64,
    pub only_pos: usize,
    pub only_platform: usize,
}

impl WeekRecon {
    pub fn difference(&self) -> f64 {
        self.pos_amount - self.platform_amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Pos,
    Platform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unmatched {
    pub order_id: String,
    pub week: WeekBucket,
    pub side: Side,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    pub weeks: BTreeMap<WeekBucket, WeekRecon>,
    pub unmatched: Vec<Unmatched>,
    pub cancelled: usize,
}

/// Match POS orders against platform orders by order id, per settlement week.
///
/// Cancelled platform orders are left out. The payout sheet has no outlet, so
/// with a location filter only platform orders whose id the POS billed at a
/// selected outlet are kept.
pub fn reconcile(
    pos: &[SwiggyOrder],
    platform: &[PlatformOrder],
    filter: &FilterSelection,
) -> Result<Reconciliation> {
    let pos_rows = filter.apply(pos);
    let located_ids: Option<HashSet<&str>> = (!filter.locations.is_all())
        .then(|| pos_rows.iter().map(|o| o.order_id.trim()).collect());

    let mut cancelled = 0usize;
    let mut platform_rows: Vec<(&PlatformOrder, WeekBucket)> = Vec::new();
    for order in platform.iter().filter(|o| filter.matches_period(*o)) {
        if order.is_cancelled() {
            cancelled += 1;
            continue;
        }
        if let Some(ids) = &located_ids {
            if !ids.contains(order.order_id.trim()) {
                continue;
            }
        }
        platform_rows.push((order, bucket_of(order.order_date)?));
    }
    if pos_rows.is_empty() && platform_rows.is_empty() {
        return Err(OutletError::NoDataForFilter);
    }

    let pos_ids: HashSet<&str> = pos_rows.iter().map(|o| o.order_id.trim()).collect();
    let platform_ids: HashSet<&str> = platform_rows.iter().map(|(o, _)| o.order_id.trim()).collect();

    let mut recon = Reconciliation {
        cancelled,
        ..Reconciliation::default()
    };
    for order in &pos_rows {
        let week = recon.weeks.entry(order.week).or_default();
        week.pos_orders += 1;
        week.pos_amount += order.gross;
        if !platform_ids.contains(order.order_id.trim()) {
            week.only_pos += 1;
            recon.unmatched.push(Unmatched {
                order_id: order.order_id.clone(),
                week: order.week,
                side: Side::Pos,
                amount: order.gross,
            });
        }
    }
    for (order, bucket) in &platform_rows {
        let week = recon.weeks.entry(*bucket).or_default();
        week.platform_orders += 1;
        week.platform_amount += order.customer_paid;
        if !pos_ids.contains(order.order_id.trim()) {
            week.only_platform += 1;
            recon.unmatched.push(Unmatched {
                order_id: order.order_id.clone(),
                week: *bucket,
                side: Side::Platform,
                amount: order.customer_paid,
            });
        }
    }
    recon.unmatched.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.order_id.cmp(&b.order_id)));
    tracing::debug!(
        weeks = recon.weeks.len(),
        unmatched = recon.unmatched.len(),
        cancelled,
        "reconciled"
    );
    Ok(recon)
}

impl Reconciliation {
    pub fn pos_amount(&self) -> f64 {
        self.weeks.values().map(|w| w.pos_amount).sum()
    }

    pub fn platform_amount(&self) -> f64 {
        self.weeks.values().map(|w| w.platform_amount).sum()
    }

    pub fn report(&self) -> Report {
        let mut report = Report::new("Swiggy Reconciliation");
        if self.cancelled > 0 {
            report.subtitle = Some(format!("{} cancelled platform orders excluded", self.cancelled));
        }
        report.metrics = vec![
            Metric::new("POS Gross Bill Amount", Value::Whole(self.pos_amount())),
            Metric::new("Swiggy Customer Paid", Value::Whole(self.platform_amount())),
            Metric::new("Difference", Value::Whole(self.pos_amount() - self.platform_amount())),
            Metric::new("Unmatched Orders", Value::Count(self.unmatched.len())).cost(),
        ];

        let mut weeks = ReportTable::new(
            "weeks",
            "Reconciliation by Swiggy Week",
            &[
                "Week",
                "POS Orders",
                "POS Amount",
                "Swiggy Orders",
                "Swiggy Amount",
                "Difference",
                "Only in POS",
                "Only on Swiggy",
            ],
        );
        for (bucket, w) in &self.weeks {
            weeks.push(vec![
                Value::text(bucket.label()),
                Value::Count(w.pos_orders),
                Value::Money(w.pos_amount),
                Value::Count(w.platform_orders),
                Value::Money(w.platform_amount),
                Value::Money(w.difference()),
                Value::Count(w.only_pos),
                Value::Count(w.only_platform),
            ]);
        }

        let mut unmatched = ReportTable::new("unmatched", "Unmatched Orders", &["Order ID", "Week", "Found In", "Amount"]);
        for u in &self.unmatched {
            unmatched.push(vec![
                Value::text(&u.order_id),
                Value::text(u.week.label()),
                Value::text(match u.side {
                    Side::Pos => "POS only",
                    Side::Platform => "Swiggy only",
                }),
                Value::Money(u.amount),
            ]);
        }

        report.tables.push(weeks);
        report.tables.push(unmatched);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;
    use crate::loader::load_records;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn pos(id: &str, location: &str, day: u32, gross: f64) -> SwiggyOrder {
        SwiggyOrder {
            location: location.to_string(),
            order_id: id.to_string(),
            bill_date: d(day),
            gross,
            source: String::new(),
            restaurant_id: None,
            week: bucket_of(d(day)).unwrap(),
        }
    }

    fn swiggy(id: &str, day: u32, status: &str, paid: f64) -> PlatformOrder {
        PlatformOrder {
            order_date: d(day),
            status: status.to_string(),
            order_id: id.to_string(),
            customer_paid: paid,
            source: String::new(),
        }
    }

    #[test]
    fn test_consolidate_pos_drops_totals_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("pos_input_swiggy");
        std::fs::create_dir_all(input.join("march")).unwrap();
        let preamble = "Order Report\nOutlet,All\nFrom,01-03-2024\nTo,31-03-2024\nGenerated,today\n";
        std::fs::write(
            input.join("march").join("week1.csv"),
            format!(
                "{preamble}Deployment,Order Id,Bill Date,Gross Bill Amount\n\
                 HSR,1001,01-03-2024 12:00,450\n\
                 HSR,,01-03-2024 13:00,100\n\
                 Grand Total,,,550\n"
            ),
        )
        .unwrap();
        std::fs::write(input.join("junk.csv"), "a,b\n1,2\n").unwrap();
        let output = dir.path().join("out").join("swiggy_pos.csv");

        let summary = consolidate(Feed::Pos, &input, &output).unwrap();
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.files_read, 1);
        assert_eq!(summary.files_skipped, 1);

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("Deployment,Order Id,Bill Date,Gross Bill Amount,Source\n"));
        assert!(written.contains("HSR,1001,01-03-2024 12:00,450,week1.csv"));

        let loaded = load_records::<SwiggyOrder>(&output, &ReadOptions::default()).unwrap();
        assert_eq!(loaded.records[0].source, "week1.csv");
    }

    #[test]
    fn test_consolidate_without_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");
        assert!(consolidate(Feed::Pos, dir.path(), &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_reconcile_per_week() {
        let pos_orders = vec![
            pos("A1", "HSR", 1, 100.0),
            pos("A2", "HSR", 4, 200.0),
            pos("A3", "HSR", 5, 300.0),
        ];
        let platform = vec![
            swiggy("A1", 1, "Delivered", 95.0),
            swiggy("A2", 4, "Delivered", 200.0),
            swiggy("B9", 6, "Delivered", 50.0),
            swiggy("C1", 6, "Cancelled", 80.0),
        ];
        let recon = reconcile(&pos_orders, &platform, &FilterSelection::default()).unwrap();
        assert_eq!(recon.cancelled, 1);
        let first = &recon.weeks[&bucket_of(d(1)).unwrap()];
        assert_eq!(first.difference(), 5.0);
        let second = &recon.weeks[&bucket_of(d(4)).unwrap()];
        assert_eq!(second.pos_orders, 2);
        assert_eq!(second.platform_orders, 2);
        assert_eq!(second.only_pos, 1);
        assert_eq!(second.only_platform, 1);
        let ids: Vec<_> = recon.unmatched.iter().map(|u| u.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A3", "B9"]);

        let report = recon.report();
        assert_eq!(report.metric("Difference").unwrap().value, Value::Whole(255.0));
        assert_eq!(report.table("unmatched").unwrap().rows.len(), 2);
    }

    #[test]
    fn test_location_filter_limits_platform_to_known_orders() {
        let pos_orders = vec![pos("A1", "HSR", 4, 100.0), pos("B1", "Indiranagar", 4, 100.0)];
        let platform = vec![swiggy("A1", 4, "Delivered", 100.0), swiggy("B1", 4, "Delivered", 100.0)];
        let filter = FilterSelection {
            locations: Selection::only(["HSR".to_string()]),
            ..FilterSelection::default()
        };
        let recon = reconcile(&pos_orders, &platform, &filter).unwrap();
        assert!(recon.unmatched.is_empty());
        assert_eq!(recon.platform_amount(), 100.0);
    }

    #[test]
    fn test_reconcile_empty_selection() {
        let filter = FilterSelection {
            years: Selection::only([2020]),
            ..FilterSelection::default()
        };
        assert!(matches!(
            reconcile(&[pos("A1", "HSR", 1, 1.0)], &[], &filter),
            Err(OutletError::NoDataForFilter)
        ));
    }
}
