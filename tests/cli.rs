use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn outletbook(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("outletbook").unwrap();
    cmd.env("HOME", home).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

const PNL: &str = "\
Year,Month,Location,Category,Sub-Category,Super-Sub-Category,Amount
2024,March,HSR,Revenue,Dine In,AC,60000
2024,March,HSR,Revenue,Online,Swiggy,40000
2024,March,HSR,Food Cost,Raw Material,Vegetables,30000
2024,March,HSR,Operating Cost,Staff,Salaries,20000
2024,February,HSR,Revenue,Dine In,AC,50000
";

const CVR: &str = "\
Date,Location,Total Sales,Swiggy,Zomato,Card Sales,UPI,Dineout,Zomato Pro,Expenses,Expected Cash Sales,Actual Cash Sales
01-03-2024,HSR,10000,2000,1000,3000,2000,0,0,500,1500,1450
";

#[test]
fn weeks_lists_settlement_weeks() {
    let home = tempfile::tempdir().unwrap();
    outletbook(home.path())
        .args(["weeks", "2024-03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Swiggy weeks for March 2024"))
        .stdout(predicate::str::contains("2024-03-01 - 2024-03-02"))
        .stdout(predicate::str::contains("2024-03-31 - 2024-03-31"));
}

#[test]
fn weeks_rejects_bad_month() {
    let home = tempfile::tempdir().unwrap();
    outletbook(home.path())
        .args(["weeks", "2024-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn init_then_status_reports_sources() {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    outletbook(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap(), "--user", "Asha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized outletbook"));
    assert!(data.join("exports").is_dir());
    assert!(home.path().join(".config/outletbook/settings.json").exists());

    std::fs::write(data.join("PnL.csv"), PNL).unwrap();
    outletbook(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Asha"))
        .stdout(predicate::str::is_match(r"pnl\s+present").unwrap())
        .stdout(predicate::str::is_match(r"cash_variance\s+missing").unwrap());
}

#[test]
fn pnl_report_renders_and_exports() {
    let home = tempfile::tempdir().unwrap();
    let source = home.path().join("PnL.csv");
    std::fs::write(&source, PNL).unwrap();
    let out = home.path().join("exports").join("pnl.csv");

    outletbook(home.path())
        .args(["report", "pnl", "--year", "2024", "--month", "March"])
        .args(["--source", source.to_str().unwrap(), "--csv", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profit & Loss"))
        .stdout(predicate::str::contains("Previous period: 2024-02"))
        .stdout(predicate::str::contains("Net Profit"))
        .stdout(predicate::str::contains("Wrote"));

    let csv = std::fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("Particulars,Amount,%,Previous Period,% (Prev),Change\n"));
    assert!(csv.contains("Net Profit,50000,"));
}

#[test]
fn empty_selection_prints_message() {
    let home = tempfile::tempdir().unwrap();
    let source = home.path().join("CVR.csv");
    std::fs::write(&source, CVR).unwrap();

    outletbook(home.path())
        .args(["report", "cash-variance", "--location", "Nowhere"])
        .args(["--source", source.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No data for the selected filters."));
}

#[test]
fn missing_source_fails() {
    let home = tempfile::tempdir().unwrap();
    outletbook(home.path())
        .args(["report", "dish-costing", "--source"])
        .arg(home.path().join("absent.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source not found"));
}

#[test]
fn unknown_month_fails() {
    let home = tempfile::tempdir().unwrap();
    let source = home.path().join("PnL.csv");
    std::fs::write(&source, PNL).unwrap();
    outletbook(home.path())
        .args(["report", "pnl", "--month", "Smarch", "--source", source.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown month: Smarch"));
}

#[test]
fn swiggy_consolidate_writes_one_sheet() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("pos_input_swiggy");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(
        input.join("week1.csv"),
        "Order Report\nOutlet,All\nFrom,01-03-2024\nTo,31-03-2024\nGenerated,today\n\
         Deployment,Order Id,Bill Date,Gross Bill Amount\n\
         HSR,1001,01-03-2024 12:00,450\n\
         HSR,1002,04-03-2024 19:30,300\n\
         Grand Total,,,750\n",
    )
    .unwrap();
    let output = home.path().join("swiggy_pos.csv");

    outletbook(home.path())
        .args(["swiggy", "consolidate", "pos"])
        .args(["--input", input.to_str().unwrap(), "--output", output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Consolidated 2 rows from 1 file(s)"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("Deployment,Order Id,Bill Date,Gross Bill Amount,Source\n"));
    assert!(!written.contains("Grand Total"));
}
