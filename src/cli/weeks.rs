use comfy_table::Table;

use crate::calendar::weeks_of_month;
use crate::error::{OutletError, Result};
use crate::loader::month_name;

/// `2024-03` -> (2024, 3)
fn parse_year_month(raw: &str) -> Result<(i32, u32)> {
    let invalid = || OutletError::InvalidArgument(format!("month '{raw}' (expected YYYY-MM)"));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

pub fn run(raw: &str) -> Result<()> {
    let (year, month) = parse_year_month(raw)?;
    let mut table = Table::new();
    table.set_header(vec!["#", "Week", "Days"]);
    for (i, week) in weeks_of_month(year, month)?.enumerate() {
        table.add_row(vec![(i + 1).to_string(), week.label(), week.days().to_string()]);
    }
    println!("Swiggy weeks for {} {year}", month_name(month));
    println!("{table}");
    Ok(())
}
