use std::path::PathBuf;

use crate::error::{OutletError, Result};
use crate::models::PlatformOrder;
use crate::reconciler::{self, Feed};

use super::report::{load, load_swiggy_orders, render, write_csv};
use super::{FeedArg, FilterArgs, Session};

impl From<FeedArg> for Feed {
    fn from(arg: FeedArg) -> Self {
        match arg {
            FeedArg::Pos => Feed::Pos,
            FeedArg::Platform => Feed::Platform,
        }
    }
}

pub fn consolidate(session: &Session, feed: FeedArg, input: Option<String>, output: Option<String>) -> Result<()> {
    let sources = &session.settings.sources;
    let (default_input, default_output) = match feed {
        FeedArg::Pos => (&sources.swiggy_pos_input, &sources.swiggy_pos),
        FeedArg::Platform => (&sources.swiggy_platform_input, &sources.swiggy_platform),
    };
    let input = session.source_path(input.as_deref(), default_input);
    let output = session.source_path(output.as_deref(), default_output);

    let summary = reconciler::consolidate(feed.into(), &input, &output)?;
    println!(
        "Consolidated {} rows from {} file(s) into {}",
        summary.rows,
        summary.files_read,
        output.display()
    );
    if summary.files_skipped > 0 {
        println!("Skipped {} file(s); run with --verbose for details.", summary.files_skipped);
    }
    Ok(())
}

pub fn reconcile(
    session: &Session,
    filters: &FilterArgs,
    pos: Option<String>,
    platform: Option<String>,
    csv: Option<String>,
) -> Result<()> {
    let sources = &session.settings.sources;
    let pos_path = session.source_path(pos.as_deref(), &sources.swiggy_pos);
    let platform_path = session.source_path(platform.as_deref(), &sources.swiggy_platform);

    let pos_orders = load_swiggy_orders(session, &pos_path, None)?;
    let platform_orders = load::<PlatformOrder>(&platform_path)?;

    let recon = match reconciler::reconcile(&pos_orders, &platform_orders, &filters.settlement_selection()?) {
        Ok(recon) => recon,
        Err(OutletError::NoDataForFilter) => {
            println!("No data for the selected filters.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let report = recon.report();
    print!("{}", render(&report, session));
    if let Some(target) = csv {
        write_csv(&report, &PathBuf::from(target))?;
    }
    Ok(())
}
