mod auth;
mod calc;
mod cli;
mod db;
mod error;
mod fmt;
mod household;
mod ledger;
mod models;
mod months;
mod remote;
mod sample;
mod settings;
mod tui;

use std::sync::Mutex;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ReportCommands};
use models::ExpenseDraft;

/// CLI commands log to stderr. The dashboard owns the terminal, so it logs to
/// `<data_dir>/kakeibo.log` instead.
fn init_logging(to_file: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if to_file {
        let dir = std::path::PathBuf::from(settings::load_settings().data_dir);
        let file = std::fs::create_dir_all(&dir).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("kakeibo.log"))
        });
        if let Ok(file) = file {
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        return;
    }
    builder.with_writer(std::io::stderr).init();
}

fn main() {
    let cli = Cli::parse();
    let offline = cli.offline;

    init_logging(matches!(cli.command, None | Some(Commands::Dashboard)));

    let result = match cli.command {
        None | Some(Commands::Dashboard) => cli::dashboard::run(offline),
        Some(command) => match command {
            Commands::Init { data_dir, endpoint, payers } => cli::init::run(data_dir, endpoint, payers),
            Commands::Config { set } => cli::config::run(&set),
            Commands::Login => cli::session::login(),
            Commands::Logout => cli::session::logout(),
            Commands::Add {
                item_name,
                amount,
                payer,
                category,
                date,
                settled,
            } => cli::expenses::add(
                ExpenseDraft {
                    date,
                    item_name,
                    category,
                    amount,
                    payer,
                    is_settled: settled,
                },
                offline,
            ),
            Commands::List { month, unsettled } => cli::expenses::list(month, unsettled, offline),
            Commands::Settle { id } => cli::expenses::set_settled(&id, true, offline),
            Commands::Unsettle { id } => cli::expenses::set_settled(&id, false, offline),
            Commands::Delete { id, yes } => cli::expenses::delete(&id, yes, offline),
            Commands::Summary { month } => cli::summary::run(month, offline),
            Commands::Report { command } => match command {
                ReportCommands::Categories { month } => cli::report::categories(month, offline),
                ReportCommands::Monthly => cli::report::monthly(offline),
                ReportCommands::Balances => cli::report::balances(offline),
            },
            Commands::Months => cli::report::months(offline),
            Commands::Sync { prune } => cli::sync::run(prune, offline),
            Commands::Status => cli::status::run(offline),
            Commands::Export { month, output } => cli::export::run(month, output, offline),
            Commands::Backup { output } => cli::backup::run(output),
            Commands::Completions { shell } => {
                clap_complete::generate(shell, &mut Cli::command(), "kakeibo", &mut std::io::stdout());
                Ok(())
            }
            Commands::Dashboard => cli::dashboard::run(offline),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
