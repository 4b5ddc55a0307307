mod aggregate;
mod calendar;
mod cli;
mod error;
mod export;
mod filter;
mod fmt;
mod loader;
mod logging;
mod models;
mod period;
mod reconciler;
mod reports;
mod settings;

use clap::Parser;

use cli::{Cli, Commands, Session, SwiggyCommands};

fn main() {
    let cli = Cli::parse();
    let session = Session::load();
    logging::init(if cli.verbose { "debug" } else { &session.settings.log_level });

    let result = match cli.command {
        Commands::Init { data_dir, user } => cli::init::run(data_dir, user),
        Commands::Status => cli::status::run(&session),
        Commands::Weeks { month } => cli::weeks::run(&month),
        Commands::Report { command } => cli::report::run(command, &session),
        Commands::Swiggy { command } => match command {
            SwiggyCommands::Consolidate { feed, input, output } => {
                cli::swiggy::consolidate(&session, feed, input, output)
            }
            SwiggyCommands::Reconcile {
                filters,
                pos,
                platform,
                csv,
            } => cli::swiggy::reconcile(&session, &filters, pos, platform, csv),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
