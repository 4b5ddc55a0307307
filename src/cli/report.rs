use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{OutletError, Result};
use crate::export::export_report;
use crate::loader::{load_folder, load_records, FromRow, ReadOptions};
use crate::models::{
    CashEntry, ConsumptionEntry, DishEntry, FoodCostEntry, OutletMapping, PnlEntry, SaleEntry,
    StockLossEntry, SwiggyOrder,
};
use crate::reports::{self, sales_growth::SalesSelection, Report, Value};

use super::{parse_days, OutputArgs, ReportCommands, Session};

pub(crate) fn load<T: FromRow>(path: &Path) -> Result<Vec<T>> {
    let loaded = load_records::<T>(path, &ReadOptions::default())?;
    tracing::info!(file = %path.display(), rows = loaded.records.len(), dropped = loaded.dropped, "loaded");
    Ok(loaded.records)
}

/// Swiggy POS orders with restaurant ids from the mapping table, if present.
pub(crate) fn load_swiggy_orders(session: &Session, pos: &Path, mapping: Option<&str>) -> Result<Vec<SwiggyOrder>> {
    let mut orders = load::<SwiggyOrder>(pos)?;
    let mapping_path = session.source_path(mapping, &session.settings.sources.swiggy_mapping);
    if mapping_path.exists() {
        let mapping = load::<OutletMapping>(&mapping_path)?;
        reports::swiggy::attach_restaurant_ids(&mut orders, &mapping);
    } else {
        tracing::warn!(file = %mapping_path.display(), "mapping table not found; restaurant ids left blank");
    }
    Ok(orders)
}

fn build(cmd: &ReportCommands, session: &Session) -> Result<Report> {
    let sources = &session.settings.sources;
    let path = |output: &OutputArgs, configured: &str| session.source_path(output.source.as_deref(), configured);
    match cmd {
        ReportCommands::Pnl { filters, output } => {
            let entries = load::<PnlEntry>(&path(output, &sources.pnl))?;
            Ok(reports::pnl::build(&entries, &filters.selection()?))
        }
        ReportCommands::CashVariance { filters, output } => {
            let entries = load::<CashEntry>(&path(output, &sources.cash_variance))?;
            reports::cash_variance::build(&entries, &filters.selection()?)
        }
        ReportCommands::FoodCost { filters, output } => {
            let entries = load::<FoodCostEntry>(&path(output, &sources.food_cost))?;
            reports::food_cost::build(&entries, &filters.selection()?)
        }
        ReportCommands::InventoryConsumption { filters, output } => {
            let entries = load::<ConsumptionEntry>(&path(output, &sources.inventory))?;
            reports::inventory::consumption(&entries, &filters.selection()?)
        }
        ReportCommands::InventoryLoss { filters, output } => {
            let entries = load::<StockLossEntry>(&path(output, &sources.inventory))?;
            reports::inventory::loss(&entries, &filters.selection()?)
        }
        ReportCommands::DishCosting { filters, output } => {
            let entries = load::<DishEntry>(&path(output, &sources.dish_costing))?;
            reports::dish::build(&entries, &filters.selection()?)
        }
        ReportCommands::SalesGrowth { filters, day, output } => {
            let dir = path(output, &sources.sales_dir);
            let loaded = load_folder::<SaleEntry>(&dir, &ReadOptions::default())?;
            if loaded.records.is_empty() {
                return Err(OutletError::SourceUnavailable(format!(
                    "no usable sales CSV files under {}",
                    dir.display()
                )));
            }
            let selection = SalesSelection::from_filter(&filters.selection()?, parse_days(day)?);
            reports::sales_growth::build(&loaded.records, &selection)
        }
        ReportCommands::Swiggy { filters, mapping, output } => {
            let orders = load_swiggy_orders(session, &path(output, &sources.swiggy_pos), mapping.as_deref())?;
            reports::swiggy::build(&orders, &filters.settlement_selection()?)
        }
    }
}

fn csv_target(cmd: &ReportCommands) -> Option<&str> {
    match cmd {
        ReportCommands::Pnl { output, .. }
        | ReportCommands::CashVariance { output, .. }
        | ReportCommands::FoodCost { output, .. }
        | ReportCommands::InventoryConsumption { output, .. }
        | ReportCommands::InventoryLoss { output, .. }
        | ReportCommands::DishCosting { output, .. }
        | ReportCommands::SalesGrowth { output, .. }
        | ReportCommands::Swiggy { output, .. } => output.csv.as_deref(),
    }
}

pub fn run(cmd: ReportCommands, session: &Session) -> Result<()> {
    let report = match build(&cmd, session) {
        Ok(report) => report,
        Err(OutletError::NoDataForFilter) => {
            println!("No data for the selected filters.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    print!("{}", render(&report, session));
    if let Some(target) = csv_target(&cmd) {
        write_csv(&report, &PathBuf::from(target))?;
    }
    Ok(())
}

pub(crate) fn write_csv(report: &Report, target: &Path) -> Result<()> {
    for path in export_report(report, target)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn colored_value(value: &Value, positive: bool) -> String {
    let text = value.display();
    match value.as_f64() {
        Some(v) if v < 0.0 => text.red().to_string(),
        Some(_) if positive => text.green().to_string(),
        _ => text,
    }
}

pub fn render(report: &Report, session: &Session) -> String {
    let mut out = format!("{}\n", report.title.bold());
    if !session.user.is_empty() {
        out.push_str(&format!("{}\n", format!("Prepared for {}", session.user).dimmed()));
    }
    if let Some(subtitle) = &report.subtitle {
        out.push_str(&format!("{}\n", subtitle.dimmed()));
    }

    if !report.metrics.is_empty() {
        let mut cards = Table::new();
        cards.set_header(vec!["", "Value", ""]);
        for m in &report.metrics {
            let label = if m.positive {
                m.label.green().bold()
            } else {
                m.label.red().bold()
            };
            cards.add_row(vec![
                Cell::new(label),
                Cell::new(colored_value(&m.value, m.positive)),
                Cell::new(m.note.as_deref().unwrap_or("")),
            ]);
        }
        out.push_str(&format!("\n{cards}\n"));
    }

    for t in &report.tables {
        let mut table = Table::new();
        table.set_header(t.headers.clone());
        for (i, row) in t.rows.iter().enumerate() {
            let total = t.emphasis.contains(&i);
            table.add_row(row.iter().map(|v| {
                if total {
                    Cell::new(v.display().bold())
                } else {
                    Cell::new(v.display())
                }
            }));
        }
        if t.rows.is_empty() {
            out.push_str(&format!("\n{}\n(none)\n", t.title));
        } else {
            out.push_str(&format!("\n{}\n{table}\n", t.title));
        }
    }
    out
}
