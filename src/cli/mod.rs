pub mod init;
pub mod report;
pub mod status;
pub mod swiggy;
pub mod weeks;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::calendar::parse_week_label;
use crate::error::{OutletError, Result};
use crate::filter::{FilterSelection, Selection};
use crate::loader::{parse_date, parse_month};
use crate::reports::sales_growth::parse_day;
use crate::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(
    name = "outletbook",
    version,
    about = "Reporting for a restaurant chain: P&L, cash, food cost, inventory, sales and Swiggy reconciliation."
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG still wins)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings and create the data directory.
    Init {
        /// Directory holding the source extracts (default: ~/Documents/outletbook)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Name shown on reports
        #[arg(long)]
        user: Option<String>,
    },
    /// Show settings and which source files are present.
    Status,
    /// List the Swiggy settlement weeks of a month.
    Weeks {
        /// Month: YYYY-MM
        month: String,
    },
    /// Render a report view.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Consolidate and reconcile Swiggy orders.
    Swiggy {
        #[command(subcommand)]
        command: SwiggyCommands,
    },
}

/// Filter flags shared by every view. Repeat a flag to select several values;
/// `All` or `Select All` clears the dimension.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Year, e.g. 2024
    #[arg(long)]
    pub year: Vec<String>,
    /// Month number or name, e.g. 3 or March
    #[arg(long)]
    pub month: Vec<String>,
    /// Location / outlet name
    #[arg(long)]
    pub location: Vec<String>,
    /// Week label (Swiggy: "YYYY-MM-DD - YYYY-MM-DD"; sales growth: "DD Mon - DD Mon")
    #[arg(long)]
    pub week: Vec<String>,
    /// Start date: DD-MM-YYYY
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date: DD-MM-YYYY
    #[arg(long = "to")]
    pub to_date: Option<String>,
}

fn parse_year(raw: &str) -> Result<i32> {
    raw.parse()
        .map_err(|_| OutletError::InvalidArgument(format!("year '{raw}'")))
}

fn parse_bound(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref()
        .map(|s| parse_date(s).ok_or_else(|| OutletError::InvalidDate(s.to_string())))
        .transpose()
}

impl FilterArgs {
    pub fn selection(&self) -> Result<FilterSelection> {
        let selection = FilterSelection {
            years: Selection::parse(&self.year, parse_year)?,
            months: Selection::parse(&self.month, |m| {
                parse_month(m).ok_or_else(|| OutletError::UnknownMonth(m.to_string()))
            })?,
            locations: Selection::parse(&self.location, |l| Ok(l.to_string()))?,
            weeks: Selection::parse(&self.week, |w| Ok(w.to_string()))?,
            ..FilterSelection::default()
        };
        selection.with_date_range(parse_bound(&self.from_date)?, parse_bound(&self.to_date)?)
    }

    /// Like [`selection`](Self::selection), with weeks checked as settlement
    /// week labels.
    pub fn settlement_selection(&self) -> Result<FilterSelection> {
        let selection = self.selection()?;
        if let Some(labels) = selection.weeks.values() {
            if let Some(bad) = labels.iter().find(|l| parse_week_label(l).is_none()) {
                return Err(OutletError::InvalidArgument(format!(
                    "week '{bad}' (expected YYYY-MM-DD - YYYY-MM-DD)"
                )));
            }
        }
        Ok(selection)
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Read this file (or folder) instead of the configured source
    #[arg(long)]
    pub source: Option<String>,
    /// Also write the table(s) as CSV to this path
    #[arg(long)]
    pub csv: Option<String>,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Profit & Loss with previous-period comparison.
    Pnl {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Expected vs actual cash sales.
    CashVariance {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Ideal vs actual food cost.
    FoodCost {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Inventory consumption by item.
    InventoryConsumption {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Closing stock loss by item.
    InventoryLoss {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Dish level costing and margins.
    DishCosting {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Sales trend against the previous window.
    SalesGrowth {
        #[command(flatten)]
        filters: FilterArgs,
        /// Day: DD-Mon-YYYY
        #[arg(long)]
        day: Vec<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Swiggy POS sales by settlement week.
    Swiggy {
        #[command(flatten)]
        filters: FilterArgs,
        /// Restaurant id mapping table
        #[arg(long)]
        mapping: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeedArg {
    Pos,
    Platform,
}

#[derive(Subcommand)]
pub enum SwiggyCommands {
    /// Merge raw exports into one sheet.
    Consolidate {
        feed: FeedArg,
        /// Folder with the raw exports
        #[arg(long)]
        input: Option<String>,
        /// Output CSV
        #[arg(long)]
        output: Option<String>,
    },
    /// Match POS orders against the Swiggy payout sheet.
    Reconcile {
        #[command(flatten)]
        filters: FilterArgs,
        /// Consolidated POS orders
        #[arg(long)]
        pos: Option<String>,
        /// Consolidated platform orders
        #[arg(long)]
        platform: Option<String>,
        /// Also write the tables as CSV to this path
        #[arg(long)]
        csv: Option<String>,
    },
}

/// Explicit per-invocation state handed to every command.
#[derive(Debug, Clone)]
pub struct Session {
    pub settings: Settings,
    pub user: String,
}

impl Session {
    pub fn load() -> Self {
        Self::new(load_settings())
    }

    pub fn new(settings: Settings) -> Self {
        let user = settings.user_name.clone();
        Self { settings, user }
    }

    /// `--source` if given, otherwise the configured source.
    pub fn source_path(&self, given: Option<&str>, configured: &str) -> PathBuf {
        self.settings.resolve(given.unwrap_or(configured))
    }
}

pub(crate) fn parse_days(raw: &[String]) -> Result<Selection<NaiveDate>> {
    Selection::parse(raw, parse_day)
}
