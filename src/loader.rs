use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use crate::calendar::bucket_of;
use crate::error::{OutletError, Result};
use crate::models::{
    CashEntry, ConsumptionEntry, DishEntry, FoodCostEntry, OutletMapping, PlatformOrder,
    PnlEntry, SaleEntry, StockLossEntry, SwiggyOrder,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw
        .replace(',', "")
        .replace('"', "")
        .replace('$', "")
        .replace('₹', "");
    let s = s.trim();
    let v: f64 = match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => -inner.trim().parse::<f64>().unwrap_or(0.0),
        None => s.parse().unwrap_or(0.0),
    };
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%b-%Y"];

/// Parse `DD-MM-YYYY[ HH:MM]`, falling back to ISO and `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_whole(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f: f64 = raw.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

pub fn parse_year(raw: &str) -> Option<i32> {
    parse_whole(raw)
        .and_then(|y| i32::try_from(y).ok())
        .filter(|y| (1900..=9999).contains(y))
}

const MONTH_NAMES: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// `3`, `03`, `March` or `Mar`.
pub fn parse_month(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Some(n) = parse_whole(raw) {
        return u32::try_from(n).ok().filter(|m| (1..=12).contains(m));
    }
    let lower = raw.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(&lower)))
        .map(|i| i as u32 + 1)
}

pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August",
        "September", "October", "November", "December",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("")
}

#[cfg(any(feature = "xlsx", test))]
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

/// Where the header sits and, for workbooks, which worksheet to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReadOptions {
    pub skip_rows: usize,
    pub sheet: Option<String>,
}

impl ReadOptions {
    pub fn skip(skip_rows: usize) -> Self {
        Self {
            skip_rows,
            sheet: None,
        }
    }

    pub fn worksheet(mut self, name: &str) -> Self {
        self.sheet = Some(name.to_string());
        self
    }
}

/// A raw table: one header row and string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub file: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

type CacheKey = (PathBuf, String, ReadOptions);

static SHEET_CACHE: Lazy<Mutex<HashMap<CacheKey, Arc<Sheet>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"))
}

/// Read a CSV or workbook, memoized on path and content.
pub fn read_sheet(path: &Path, opts: &ReadOptions) -> Result<Arc<Sheet>> {
    let bytes = std::fs::read(path)
        .map_err(|e| OutletError::SourceUnavailable(format!("{}: {e}", path.display())))?;
    let key = (path.to_path_buf(), compute_checksum(&bytes), opts.clone());

    let mut cache = SHEET_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(sheet) = cache.get(&key) {
        tracing::debug!(file = %path.display(), "sheet cache hit");
        return Ok(Arc::clone(sheet));
    }

    let (headers, rows) = if is_workbook(path) {
        read_workbook(path, opts)?
    } else {
        read_csv_bytes(&bytes, opts.skip_rows)?
    };
    tracing::debug!(file = %path.display(), rows = rows.len(), "sheet loaded");
    let sheet = Arc::new(Sheet {
        file: file_label(path),
        headers,
        rows,
    });
    cache.insert(key, Arc::clone(&sheet));
    Ok(sheet)
}

type RawTable = (Vec<String>, Vec<Vec<String>>);

fn split_header(mut records: impl Iterator<Item = Vec<String>>, skip_rows: usize) -> RawTable {
    let headers: Vec<String> = records
        .nth(skip_rows)
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let width = headers.len();
    let rows = records
        .map(|mut r| {
            r.resize(width.max(r.len()), String::new());
            r
        })
        .collect();
    (headers, rows)
}

fn read_csv_bytes(bytes: &[u8], skip_rows: usize) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result?;
        records.push(record.iter().map(|f| f.to_string()).collect::<Vec<_>>());
    }
    Ok(split_header(records.into_iter(), skip_rows))
}

#[cfg(feature = "xlsx")]
fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::Error(_) => String::new(),
    }
}

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, opts: &ReadOptions) -> Result<RawTable> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| OutletError::Workbook(format!("{}: {e}", path.display())))?;
    let name = match &opts.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| OutletError::Workbook(format!("{}: no worksheets", path.display())))?,
    };
    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| OutletError::Workbook(format!("{} [{name}]: {e}", path.display())))?;
    let records = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    Ok(split_header(records.into_iter(), opts.skip_rows))
}

#[cfg(not(feature = "xlsx"))]
fn read_workbook(path: &Path, _opts: &ReadOptions) -> Result<RawTable> {
    Err(OutletError::Workbook(format!(
        "{}: workbook support requires the 'xlsx' feature",
        path.display()
    )))
}

/// Files under `dir` (recursively) with one of `extensions`, sorted.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OutletError::SourceUnavailable(dir.display().to_string()));
    }
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Exact (case-insensitive) header match first, then keyword containment.
pub fn find_column(headers: &[String], keyword: &str) -> Option<usize> {
    let wanted = keyword.trim().to_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_lowercase() == wanted)
        .or_else(|| headers.iter().position(|h| h.to_lowercase().contains(&wanted)))
}

#[derive(Debug, Clone)]
pub struct ColumnMap {
    index: HashMap<&'static str, usize>,
}

impl ColumnMap {
    pub fn resolve(
        sheet: &Sheet,
        required: &[&'static str],
        optional: &[&'static str],
    ) -> Result<Self> {
        let mut index = HashMap::new();
        let mut missing = Vec::new();
        for name in required {
            match find_column(&sheet.headers, name) {
                Some(i) => {
                    index.insert(*name, i);
                }
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(OutletError::MissingSourceColumn {
                file: sheet.file.clone(),
                columns: missing,
            });
        }
        for name in optional {
            if let Some(i) = find_column(&sheet.headers, name) {
                index.insert(*name, i);
            }
        }
        Ok(Self { index })
    }
}

/// One data row viewed through a [`ColumnMap`].
pub struct Row<'a> {
    columns: &'a ColumnMap,
    cells: &'a [String],
}

impl<'a> Row<'a> {
    pub fn new(columns: &'a ColumnMap, cells: &'a [String]) -> Self {
        Self { columns, cells }
    }

    /// Trimmed cell text; empty when the column is absent.
    pub fn text(&self, col: &str) -> &'a str {
        self.columns
            .index
            .get(col)
            .and_then(|&i| self.cells.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    pub fn opt_text(&self, col: &str) -> Option<&'a str> {
        Some(self.text(col)).filter(|s| !s.is_empty())
    }

    pub fn amount(&self, col: &str) -> f64 {
        parse_amount(self.text(col))
    }

    pub fn year(&self, col: &str) -> Option<i32> {
        parse_year(self.text(col))
    }

    pub fn month(&self, col: &str) -> Option<u32> {
        parse_month(self.text(col))
    }

    pub fn date(&self, col: &str) -> Result<NaiveDate> {
        let raw = self.text(col);
        parse_date(raw).ok_or_else(|| OutletError::InvalidDate(raw.to_string()))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A record type that can be built from one sheet row.
///
/// `Ok(None)` skips the row quietly; `Err(InvalidDate)` drops it and counts
/// it towards the load warning.
pub trait FromRow: Sized {
    const REQUIRED: &'static [&'static str];
    const OPTIONAL: &'static [&'static str] = &[];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>>;
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

pub fn records_from_sheet<T: FromRow>(sheet: &Sheet) -> Result<Loaded<T>> {
    let columns = ColumnMap::resolve(sheet, T::REQUIRED, T::OPTIONAL)?;
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for cells in &sheet.rows {
        let row = Row::new(&columns, cells);
        if row.is_blank() {
            continue;
        }
        match T::from_row(&row) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(OutletError::InvalidDate(_)) => dropped += 1,
            Err(e) => return Err(e),
        }
    }
    if dropped > 0 {
        tracing::warn!(file = %sheet.file, dropped, "rows with unparseable dates dropped");
    }
    Ok(Loaded { records, dropped })
}

pub fn load_records<T: FromRow>(path: &Path, opts: &ReadOptions) -> Result<Loaded<T>> {
    let sheet = read_sheet(path, opts)?;
    records_from_sheet(&sheet)
}

/// Load every CSV under `dir`. Files that cannot be read or lack a required
/// column are skipped with a warning.
pub fn load_folder<T: FromRow>(dir: &Path, opts: &ReadOptions) -> Result<Loaded<T>> {
    let mut all = Loaded {
        records: Vec::new(),
        dropped: 0,
    };
    for file in list_files(dir, &["csv"])? {
        match read_sheet(&file, opts).and_then(|s| records_from_sheet::<T>(&s)) {
            Ok(loaded) => {
                all.records.extend(loaded.records);
                all.dropped += loaded.dropped;
            }
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "skipping file"),
        }
    }
    Ok(all)
}

impl FromRow for PnlEntry {
    const REQUIRED: &'static [&'static str] = &["Year", "Month", "Location", "Category", "Amount"];
    const OPTIONAL: &'static [&'static str] = &["Sub-Category", "Super-Sub-Category"];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(year), Some(month)) = (row.year("Year"), row.month("Month")) else {
            return Ok(None);
        };
        Ok(Some(PnlEntry {
            year,
            month,
            location: row.text("Location").to_string(),
            category: row.text("Category").to_string(),
            sub_category: row.text("Sub-Category").to_string(),
            super_sub_category: row.text("Super-Sub-Category").to_string(),
            amount: row.amount("Amount"),
        }))
    }
}

impl FromRow for CashEntry {
    const REQUIRED: &'static [&'static str] = &[
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
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        Ok(Some(CashEntry {
            date: row.date("Date")?,
            location: row.text("Location").to_string(),
            total_sales: row.amount("Total Sales"),
            swiggy: row.amount("Swiggy"),
            zomato: row.amount("Zomato"),
            card_sales: row.amount("Card Sales"),
            upi: row.amount("UPI"),
            dineout: row.amount("Dineout"),
            zomato_pro: row.amount("Zomato Pro"),
            expenses: row.amount("Expenses"),
            expected_cash: row.amount("Expected Cash Sales"),
            actual_cash: row.amount("Actual Cash Sales"),
        }))
    }
}

impl FromRow for FoodCostEntry {
    const REQUIRED: &'static [&'static str] = &[
        "Year",
        "Month",
        "Location",
        "Category",
        "Ideal Cost",
        "Actual Cost",
        "Variance",
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(year), Some(month)) = (row.year("Year"), row.month("Month")) else {
            return Ok(None);
        };
        Ok(Some(FoodCostEntry {
            year,
            month,
            location: row.text("Location").to_string(),
            category: row.text("Category").to_string(),
            ideal_cost: row.amount("Ideal Cost"),
            actual_cost: row.amount("Actual Cost"),
            variance: row.amount("Variance"),
        }))
    }
}

impl FromRow for ConsumptionEntry {
    const REQUIRED: &'static [&'static str] = &[
        "Year",
        "Month",
        "Location",
        "Item",
        "UOM",
        "Price",
        "Opening Stock (Qty)",
        "Purchases (Qty)",
        "Ideal Closing Stock",
        "Consumption (Qty)",
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(year), Some(month)) = (row.year("Year"), row.month("Month")) else {
            return Ok(None);
        };
        Ok(Some(ConsumptionEntry {
            year,
            month,
            location: row.text("Location").to_string(),
            item: row.text("Item").to_string(),
            uom: row.text("UOM").to_string(),
            price: row.amount("Price"),
            opening_qty: row.amount("Opening Stock (Qty)"),
            purchases_qty: row.amount("Purchases (Qty)"),
            closing_qty: row.amount("Ideal Closing Stock"),
            consumption_qty: row.amount("Consumption (Qty)"),
        }))
    }
}

impl FromRow for StockLossEntry {
    const REQUIRED: &'static [&'static str] = &[
        "Year",
        "Month",
        "Location",
        "Item",
        "UOM",
        "Price",
        "Ideal Closing Stock",
        "Actual Closing Stock",
        "Variance",
        "Ideal Closing stock Value",
        "Actual Closing stock Value",
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(year), Some(month)) = (row.year("Year"), row.month("Month")) else {
            return Ok(None);
        };
        Ok(Some(StockLossEntry {
            year,
            month,
            location: row.text("Location").to_string(),
            item: row.text("Item").to_string(),
            uom: row.text("UOM").to_string(),
            price: row.amount("Price"),
            ideal_closing_qty: row.amount("Ideal Closing Stock"),
            actual_closing_qty: row.amount("Actual Closing Stock"),
            variance_qty: row.amount("Variance"),
            ideal_closing_value: row.amount("Ideal Closing stock Value"),
            actual_closing_value: row.amount("Actual Closing stock Value"),
        }))
    }
}

impl FromRow for DishEntry {
    const REQUIRED: &'static [&'static str] = &[
        "Outlet",
        "Year",
        "Month",
        "Item Name",
        "Cost Price",
        "Selling Qty",
        "Selling Price",
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(year), Some(month)) = (row.year("Year"), row.month("Month")) else {
            return Ok(None);
        };
        Ok(Some(DishEntry {
            year,
            month,
            location: row.text("Outlet").to_string(),
            item: row.text("Item Name").to_string(),
            cost_price: row.amount("Cost Price"),
            selling_qty: row.amount("Selling Qty"),
            selling_price: row.amount("Selling Price"),
        }))
    }
}

impl FromRow for SaleEntry {
    const REQUIRED: &'static [&'static str] = &[
        "Date",
        "Tabs",
        "Sale",
        "Discount",
        "Net Sale",
        "Charges",
        "Total Tax",
        "Gross Amount",
        "Outlet Name",
    ];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        Ok(Some(SaleEntry {
            date: row.date("Date")?,
            tab: row.opt_text("Tabs").unwrap_or("Unknown").to_string(),
            location: row.opt_text("Outlet Name").unwrap_or("Unknown").to_string(),
            net_sale: row.amount("Net Sale"),
            charges: row.amount("Charges"),
        }))
    }
}

impl FromRow for SwiggyOrder {
    const REQUIRED: &'static [&'static str] =
        &["Deployment", "Order Id", "Bill Date", "Gross Bill Amount"];
    const OPTIONAL: &'static [&'static str] = &["Source", "Restaurant ID"];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let bill_date = row.date("Bill Date")?;
        Ok(Some(SwiggyOrder {
            location: row.text("Deployment").to_string(),
            order_id: row.text("Order Id").to_string(),
            bill_date,
            gross: row.amount("Gross Bill Amount"),
            source: row.text("Source").to_string(),
            restaurant_id: row.opt_text("Restaurant ID").map(str::to_string),
            week: bucket_of(bill_date)?,
        }))
    }
}

impl FromRow for OutletMapping {
    const REQUIRED: &'static [&'static str] = &["Restaurant ID", "Deployment"];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        let (Some(restaurant_id), Some(deployment)) =
            (row.opt_text("Restaurant ID"), row.opt_text("Deployment"))
        else {
            return Ok(None);
        };
        Ok(Some(OutletMapping {
            restaurant_id: restaurant_id.to_string(),
            deployment: deployment.to_string(),
        }))
    }
}

impl FromRow for PlatformOrder {
    const REQUIRED: &'static [&'static str] =
        &["Order Date", "Order Status", "Order ID", "Total Customer Paid"];
    const OPTIONAL: &'static [&'static str] = &["Source"];

    fn from_row(row: &Row<'_>) -> Result<Option<Self>> {
        Ok(Some(PlatformOrder {
            order_date: row.date("Order Date")?,
            status: row.text("Order Status").to_string(),
            order_id: row.text("Order ID").to_string(),
            customer_paid: row.amount("Total Customer Paid"),
            source: row.text("Source").to_string(),
        }))
    }
}
