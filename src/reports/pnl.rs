use crate::aggregate::sum_where;
use crate::filter::FilterSelection;
use crate::models::PnlEntry;
use crate::period::{pct_delta, previous_records, resolve_previous, share, ComparisonPeriod, PeriodIndex};

use super::{Metric, Report, ReportTable, Value};

pub const SALES_ITEMS: &[&str] = &["Non AC", "AC", "Swiggy", "Zomato", "Takeaway"];

pub const FOOD_ITEMS: &[&str] = &[
    "Bakery",
    "Beverages",
    "Fruits",
    "Groceries",
    "Milk products",
    "Ready to eat",
    "Spices",
    "Vegetables",
];

pub const EXPENSE_ITEMS: &[&str] = &[
    "Salaries",
    "Rent",
    "Water",
    "Electricity",
    "Staff room rent",
    "Staff electricity",
    "Commission",
    "Admin expenses",
    "Repairs and maintenance",
    "Advertisement",
];

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

/// Top-level category sums that drive the cards and profit lines.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub revenue: f64,
    pub food_cost: f64,
    pub operating_cost: f64,
}

impl Totals {
    pub fn of(entries: &[&PnlEntry]) -> Self {
        let by_category = |name: &str| {
            sum_where(entries.iter().copied(), |e: &PnlEntry| e.category == name, |e: &PnlEntry| e.amount)
        };
        Self {
            revenue: by_category("Revenue"),
            food_cost: by_category("Food Cost"),
            operating_cost: by_category("Operating Cost"),
        }
    }

    pub fn expenses(&self) -> f64 {
        self.food_cost + self.operating_cost
    }

    pub fn gross_profit(&self) -> f64 {
        self.revenue - self.food_cost
    }

    pub fn net_profit(&self) -> f64 {
        self.revenue - self.food_cost - self.operating_cost
    }
}

fn item_amount(entries: &[&PnlEntry], name: &str) -> f64 {
    sum_where(entries.iter().copied(), |e: &PnlEntry| e.is(name), |e: &PnlEntry| e.amount)
}

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Section,
    Item,
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub name: String,
    pub kind: LineKind,
    pub amount: f64,
    pub previous: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PnlStatement {
    pub current: Totals,
    pub previous: Totals,
    pub comparison: Option<ComparisonPeriod>,
    /// False when there is no comparison period or it has no rows.
    pub has_previous: bool,
    pub lines: Vec<Line>,
}

pub fn statement(entries: &[PnlEntry], filter: &FilterSelection) -> PnlStatement {
    let current_rows = filter.apply(entries);
    let index = PeriodIndex::from_facts(entries);
    let comparison = resolve_previous(&index, &filter.years, &filter.months);
    let previous_rows = comparison
        .map(|p| previous_records(entries, &p, filter))
        .unwrap_or_default();
    tracing::debug!(
        current = current_rows.len(),
        previous = previous_rows.len(),
        comparison = ?comparison,
        "p&l rows selected"
    );

    let current = Totals::of(&current_rows);
    let previous = Totals::of(&previous_rows);

    let mut lines = vec![Line {
        name: "Revenue".to_string(),
        kind: LineKind::Section,
        amount: 0.0,
        previous: 0.0,
    }];
    let group = |names: &[&str], total_name: &str, lines: &mut Vec<Line>| {
        let (mut sum, mut prev_sum) = (0.0, 0.0);
        for name in names {
            let amount = item_amount(&current_rows, name);
            let previous = item_amount(&previous_rows, name);
            sum += amount;
            prev_sum += previous;
            lines.push(Line {
                name: name.to_string(),
                kind: LineKind::Item,
                amount,
                previous,
            });
        }
        lines.push(Line {
            name: total_name.to_string(),
            kind: LineKind::Total,
            amount: sum,
            previous: prev_sum,
        });
    };
    group(SALES_ITEMS, "Total Sales", &mut lines);
    group(FOOD_ITEMS, "Total Food Cost", &mut lines);
    lines.push(Line {
        name: "Gross Profit".to_string(),
        kind: LineKind::Total,
        amount: current.gross_profit(),
        previous: previous.gross_profit(),
    });
    group(EXPENSE_ITEMS, "Operating Cost", &mut lines);
    lines.push(Line {
        name: "Net Profit".to_string(),
        kind: LineKind::Total,
        amount: current.net_profit(),
        previous: previous.net_profit(),
    });

    PnlStatement {
        current,
        previous,
        comparison,
        has_previous: !previous_rows.is_empty(),
        lines,
    }
}

fn line_share(line: &Line, amount: f64, revenue: f64) -> Option<f64> {
    match line.kind {
        LineKind::Section => None,
        LineKind::Item if amount == 0.0 => None,
        _ => share(amount, revenue),
    }
}

impl PnlStatement {
    pub fn report(&self) -> Report {
        let mut report = Report::new("Profit & Loss");
        report.subtitle = Some(match (&self.comparison, self.has_previous) {
            (Some(p), true) => format!("Previous period: {}", p.label()),
            (Some(p), false) => format!("Previous period: {} (no data)", p.label()),
            (None, _) => "No previous period for this selection".to_string(),
        });

        let c = &self.current;
        let card = |label: &str, amount: f64| {
            Metric::new(label, Value::Whole(amount))
                .note(crate::fmt::percent(share(amount, c.revenue)))
        };
        report.metrics = vec![
            card("Revenue", c.revenue),
            card("Expenses", c.expenses()).cost(),
            card("Food Cost", c.food_cost).cost(),
            card("Operating Cost", c.operating_cost).cost(),
            card("Gross Profit", c.gross_profit()),
            card("Net Profit", c.net_profit()),
        ];

        let mut table = ReportTable::new(
            "pnl",
            "P&L Report",
            &["Particulars", "Amount", "%", "Previous Period", "% (Prev)", "Change"],
        );
        for line in &self.lines {
            if line.kind == LineKind::Section {
                table.push_total(vec![
                    Value::text(&line.name),
                    Value::Blank,
                    Value::Blank,
                    Value::Blank,
                    Value::Blank,
                    Value::Blank,
                ]);
                continue;
            }
            let change = if self.has_previous {
                Value::Percent(Some(pct_delta(line.amount, line.previous)))
            } else {
                Value::Percent(None)
            };
            let row = vec![
                Value::text(&line.name),
                Value::Whole(line.amount),
                Value::Percent(line_share(line, line.amount, c.revenue)),
                Value::Whole(line.previous),
                Value::Percent(line_share(line, line.previous, self.previous.revenue)),
                change,
            ];
            if line.kind == LineKind::Total {
                table.push_total(row);
            } else {
                table.push(row);
            }
        }
        report.tables.push(table);
        report
    }
}

pub fn build(entries: &[PnlEntry], filter: &FilterSelection) -> Report {
    statement(entries, filter).report()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;
    use crate::loader::{load_records, ReadOptions};

    fn e(year: i32, month: u32, location: &str, cat: &str, sub: &str, amount: f64) -> PnlEntry {
        PnlEntry {
            year,
            month,
            location: location.to_string(),
            category: cat.to_string(),
            sub_category: sub.to_string(),
            super_sub_category: String::new(),
            amount,
        }
    }

    fn sample() -> Vec<PnlEntry> {
        vec![
            e(2024, 2, "HSR", "Revenue", "AC", 800.0),
            e(2024, 2, "HSR", "Food Cost", "Vegetables", 200.0),
            e(2024, 3, "HSR", "Revenue", "AC", 600.0),
            e(2024, 3, "HSR", "Revenue", "Swiggy", 400.0),
            e(2024, 3, "HSR", "Food Cost", "Vegetables", 250.0),
            e(2024, 3, "HSR", "Food Cost", "Milk products", 50.0),
            e(2024, 3, "HSR", "Operating Cost", "Rent", 200.0),
            e(2024, 3, "Indiranagar", "Revenue", "AC", 5000.0),
        ]
    }

    fn march_hsr() -> FilterSelection {
        FilterSelection {
            years: Selection::only([2024]),
            months: Selection::only([3]),
            locations: Selection::only(["HSR".to_string()]),
            ..FilterSelection::default()
        }
    }

    fn amount(report: &Report, line: &str, col: &str) -> Option<f64> {
        report.tables[0].cell(line, col).and_then(Value::as_f64)
    }

    #[test]
    fn test_totals_and_profits() {
        let s = statement(&sample(), &march_hsr());
        assert_eq!(s.current.revenue, 1000.0);
        assert_eq!(s.current.expenses(), 500.0);
        assert_eq!(s.current.gross_profit(), 700.0);
        assert_eq!(s.current.net_profit(), 500.0);
    }

    #[test]
    fn test_statement_lines_and_previous_month() {
        let report = build(&sample(), &march_hsr());
        assert_eq!(amount(&report, "Total Sales", "Amount"), Some(1000.0));
        assert_eq!(amount(&report, "Total Food Cost", "Amount"), Some(300.0));
        assert_eq!(amount(&report, "Operating Cost", "Amount"), Some(200.0));
        assert_eq!(amount(&report, "AC", "Previous Period"), Some(800.0));
        assert_eq!(amount(&report, "Vegetables", "Change"), Some(25.0));
        assert_eq!(amount(&report, "Total Sales", "%"), Some(100.0));
        assert_eq!(report.subtitle.as_deref(), Some("Previous period: 2024-02"));
    }

    #[test]
    fn test_zero_line_has_blank_percent() {
        let report = build(&sample(), &march_hsr());
        assert_eq!(report.tables[0].cell("Bakery", "%"), Some(&Value::Percent(None)));
        assert_eq!(
            report.tables[0].cell("Salaries", "Amount"),
            Some(&Value::Whole(0.0))
        );
    }

    #[test]
    fn test_empty_comparison_leaves_change_blank() {
        let filter = FilterSelection {
            years: Selection::only([2024]),
            months: Selection::only([2]),
            ..FilterSelection::default()
        };
        let s = statement(&sample(), &filter);
        assert_eq!(s.comparison, Some(ComparisonPeriod { year: 2024, month: Some(1) }));
        assert!(!s.has_previous);
        let report = s.report();
        assert_eq!(report.tables[0].cell("AC", "Change"), Some(&Value::Percent(None)));
        assert_eq!(report.tables[0].cell("AC", "% (Prev)"), Some(&Value::Percent(None)));
    }

    #[test]
    fn test_multi_month_selection_has_no_comparison() {
        let filter = FilterSelection {
            years: Selection::only([2024]),
            months: Selection::only([2, 3]),
            ..FilterSelection::default()
        };
        let s = statement(&sample(), &filter);
        assert_eq!(s.comparison, None);
        assert_eq!(s.previous, Totals::default());
    }

    #[test]
    fn test_empty_selection_renders_zeros() {
        let filter = FilterSelection {
            years: Selection::only([2030]),
            ..FilterSelection::default()
        };
        let report = build(&sample(), &filter);
        assert_eq!(report.metric("Revenue").map(|m| &m.value), Some(&Value::Whole(0.0)));
        assert_eq!(report.metric("Revenue").and_then(|m| m.note.clone()), None);
    }

    #[test]
    fn test_filtering_then_aggregating_matches_direct_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PnL.csv");
        let mut csv = String::from("Year,Month,Location,Category,Sub-Category,Super-Sub-Category,Amount\n");
        for entry in sample() {
            csv.push_str(&format!(
                "{},{},{},{},{},,{}\n",
                entry.year, entry.month, entry.location, entry.category, entry.sub_category, entry.amount
            ));
        }
        std::fs::write(&path, csv).unwrap();
        let loaded = load_records::<PnlEntry>(&path, &ReadOptions::default()).unwrap();

        let via_filter = statement(&loaded.records, &march_hsr()).current;
        let direct: Vec<&PnlEntry> = loaded
            .records
            .iter()
            .filter(|e| e.year == 2024 && e.month == 3 && e.location == "HSR")
            .collect();
        assert_eq!(via_filter, Totals::of(&direct));
    }
}
