pub mod backup;
pub mod config;
pub mod dashboard;
pub mod expenses;
pub mod export;
pub mod init;
pub mod report;
pub mod session;
pub mod status;
pub mod summary;
pub mod sync;

use std::io::Write;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::auth;
use crate::error::Result;
use crate::household::{Household, LoadSource, Mutation, Outcome};
use crate::settings::{load_settings, Settings};

/// Load settings, pass the passphrase gate, and open the household.
pub(crate) fn open_household(offline: bool) -> Result<(Settings, Household)> {
    let settings = load_settings();
    auth::ensure_unlocked(&settings)?;
    let household = Household::open(&settings, offline)?;
    Ok((settings, household))
}

/// One-line note about where the data came from, when it is not the remote.
pub(crate) fn print_source_note(household: &Household) {
    match household.source() {
        LoadSource::Remote => {}
        LoadSource::Cache if household.has_remote() => {
            println!("{}", "Remote unreachable; showing local cache.".yellow());
        }
        LoadSource::Cache => {}
        LoadSource::Fallback => {
            println!("{}", "Nothing stored yet; showing sample data.".dimmed());
        }
    }
}

/// Tell the user what happened to the remote copy of a change.
pub(crate) fn print_outcome(mutation: &Mutation) {
    match &mutation.outcome {
        Outcome::Synced => {}
        Outcome::LocalOnly => println!("{}", "Saved locally; run `kakeibo sync` once the endpoint is set.".dimmed()),
        Outcome::Failed(err) => println!("{} {err}", "Remote update failed; kept the local change:".yellow()),
        Outcome::Preview => println!("{}", "Sample data only; nothing was stored.".dimmed()),
    }
}

/// Ask a yes/no question on stdin. Anything but y/yes is no.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[derive(Parser)]
#[command(name = "kakeibo", about = "Shared household-expense tracker for two.")]
pub struct Cli {
    /// Skip the remote endpoint and work from the local cache only
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up kakeibo: choose a data directory, endpoint and payer names.
    Init {
        /// Path for kakeibo data (default: ~/Documents/kakeibo)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Spreadsheet web-app URL
        #[arg(long)]
        endpoint: Option<String>,
        /// The two payers, comma separated, e.g. "Ryo,Mari"
        #[arg(long)]
        payers: Option<String>,
    },
    /// Show settings, or change them with --set key=value.
    Config {
        /// key=value; keys: data_dir, endpoint_url, passphrase, payers, categories, timeout_secs
        #[arg(long = "set")]
        set: Vec<String>,
    },
    /// Enter the passphrase to unlock this machine.
    Login,
    /// Forget the remembered passphrase.
    Logout,
    /// Record a new expense.
    Add {
        /// What was bought, e.g. 'Supermarket'
        item_name: String,
        /// Amount in yen
        amount: String,
        /// Who paid (one of the two configured payers)
        #[arg(long, short)]
        payer: String,
        /// Category (default: first configured category)
        #[arg(long, short)]
        category: Option<String>,
        /// Date: YYYY/MM/DD or YYYY-MM-DD (default: today)
        #[arg(long, short)]
        date: Option<String>,
        /// Already split between the two of you
        #[arg(long)]
        settled: bool,
    },
    /// List expenses.
    List {
        /// Month filter: YYYY/MM or 'all' (default: current month)
        #[arg(long, short)]
        month: Option<String>,
        /// Only show unsettled expenses
        #[arg(long)]
        unsettled: bool,
    },
    /// Mark an expense as settled.
    Settle {
        /// Expense id or a unique prefix (4+ characters)
        id: String,
    },
    /// Mark an expense as not yet settled.
    Unsettle {
        /// Expense id or a unique prefix (4+ characters)
        id: String,
    },
    /// Delete an expense.
    Delete {
        /// Expense id or a unique prefix (4+ characters)
        id: String,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Month total, who owes whom, and what is still unsettled.
    Summary {
        /// Month filter for the total: YYYY/MM or 'all' (default: current month)
        #[arg(long, short)]
        month: Option<String>,
    },
    /// Spending breakdowns.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// List months that have expenses, newest first.
    Months,
    /// Push queued changes to the remote endpoint.
    Sync {
        /// Drop confirmed operations from the outbox afterwards
        #[arg(long)]
        prune: bool,
    },
    /// Show configuration, data source and queued changes.
    Status,
    /// Export expenses to CSV.
    Export {
        /// Month filter: YYYY/MM or 'all' (default: all)
        #[arg(long, short)]
        month: Option<String>,
        /// Output path (default: <data_dir>/exports/kakeibo-<month>.csv)
        #[arg(long, short)]
        output: Option<String>,
    },
    /// Back up the local database.
    Backup {
        /// Output path (default: <data_dir>/backups/kakeibo-YYYYMMDD-HHMMSS.sqlite3)
        #[arg(long)]
        output: Option<String>,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
    /// Interactive dashboard (default).
    Dashboard,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Totals per category, largest first.
    Categories {
        /// Month filter: YYYY/MM or 'all' (default: all)
        #[arg(long, short)]
        month: Option<String>,
    },
    /// Category totals per month.
    Monthly,
    /// Who paid what and the transfers that even it out.
    Balances,
}
