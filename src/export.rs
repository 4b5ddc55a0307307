use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::reports::{Report, ReportTable};

/// Write one table as CSV: header row, then raw cell values.
pub fn write_table(table: &ReportTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(|v| v.raw()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// `out/pnl.csv` + `weeks` -> `out/pnl-weeks.csv`
fn table_path(target: &Path, slug: &str) -> PathBuf {
    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("csv");
    target.with_file_name(format!("{stem}-{slug}.{ext}"))
}

/// Export every table of `report`. A single table goes to `target` itself;
/// several tables each get `<stem>-<slug>.csv` beside it.
pub fn export_report(report: &Report, target: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let [table] = report.tables.as_slice() {
        write_table(table, target)?;
        written.push(target.to_path_buf());
    } else {
        for table in &report.tables {
            let path = table_path(target, table.slug);
            write_table(table, &path)?;
            written.push(path);
        }
    }
    tracing::info!(files = written.len(), "report exported");
    Ok(written)
}
