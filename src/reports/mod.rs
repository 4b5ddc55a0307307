//! Report views: each turns loaded facts plus a filter selection into cards
//! and tables that the CLI renders or exports.

pub mod cash_variance;
pub mod dish;
pub mod food_cost;
pub mod inventory;
pub mod pnl;
pub mod sales_growth;
pub mod swiggy;

use crate::error::{OutletError, Result};
use crate::fmt::{percent, quantity, rupees, rupees_whole};

/// One table cell. Numbers keep their raw value for CSV export.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Money(f64),
    /// Money rounded to whole rupees.
    Whole(f64),
    Qty(f64),
    Percent(Option<f64>),
    Count(usize),
    Blank,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Money(v) => rupees(*v),
            Value::Whole(v) => rupees_whole(*v),
            Value::Qty(v) => quantity(*v),
            Value::Percent(p) => percent(*p),
            Value::Count(n) => n.to_string(),
            Value::Blank => String::new(),
        }
    }

    /// Unformatted form for CSV.
    pub fn raw(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Money(v) | Value::Qty(v) => format!("{v:.2}"),
            Value::Whole(v) => format!("{:.0}", v.round()),
            Value::Percent(Some(p)) => format!("{p:.2}"),
            Value::Percent(None) | Value::Blank => String::new(),
            Value::Count(n) => n.to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Money(v) | Value::Whole(v) | Value::Qty(v) => Some(*v),
            Value::Percent(p) => *p,
            Value::Count(n) => Some(*n as f64),
            Value::Text(_) | Value::Blank => None,
        }
    }
}

/// A summary card.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: Value,
    pub note: Option<String>,
    /// Whether a higher value is good news (drives the card colour).
    pub positive: bool,
}

impl Metric {
    pub fn new(label: &str, value: Value) -> Self {
        Self {
            label: label.to_string(),
            value,
            note: None,
            positive: true,
        }
    }

    pub fn cost(mut self) -> Self {
        self.positive = false;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        if !note.is_empty() {
            self.note = Some(note);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// File-name slug used when several tables are exported.
    pub slug: &'static str,
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Rows (by index) rendered as totals.
    pub emphasis: Vec<usize>,
}

impl ReportTable {
    pub fn new(slug: &'static str, title: &str, headers: &[&str]) -> Self {
        Self {
            slug,
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            emphasis: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub fn push_total(&mut self, row: Vec<Value>) {
        self.emphasis.push(self.rows.len());
        self.rows.push(row);
    }

    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// The cell at `header` in the first row whose first cell is `key`.
    pub fn cell(&self, key: &str, header: &str) -> Option<&Value> {
        let col = self.column(header)?;
        self.rows
            .iter()
            .find(|r| matches!(r.first(), Some(Value::Text(t)) if t == key))
            .and_then(|r| r.get(col))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    /// Context line, e.g. the comparison period.
    pub subtitle: Option<String>,
    pub metrics: Vec<Metric>,
    pub tables: Vec<ReportTable>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: None,
            metrics: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn metric(&self, label: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.label == label)
    }

    pub fn table(&self, slug: &str) -> Option<&ReportTable> {
        self.tables.iter().find(|t| t.slug == slug)
    }
}

pub(crate) fn require_data<T>(rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        Err(OutletError::NoDataForFilter)
    } else {
        Ok(())
    }
}
