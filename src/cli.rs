// src/cli.rs

use crate::config::DEFAULT_PAGE_SIZE;
use crate::logs::SortOption;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "masslog - A personal body-mass tracker for the command line",
    long_about = "masslog records dated body-mass measurements per user, keeps a target goal, and lets you page through, sort and search your history. Data is stored locally in SQLite."
)]
pub struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Directory holding the database and session file. Defaults to ~/.config/masslog.
    #[arg(long, global = true, env = "MASSLOG_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Creates the database if needed and reports where it lives.
    Init,

    /// Registers a new user. Prompts for the password if -p is omitted.
    Register {
        username: String,
        #[arg(short, long, help = "Password for the new account")]
        password: Option<String>,
    },

    /// Logs in and remembers the user for later commands.
    Login {
        username: String,
        #[arg(short, long, help = "Account password")]
        password: Option<String>,
    },

    /// Forgets the logged-in user.
    Logout,

    /// Shows the logged-in user and their goal.
    Whoami,

    /// Shows the goal, or sets it when a mass is given.
    Goal {
        #[arg(value_parser = parse_mass, help = "New goal mass in kg")]
        mass: Option<f64>,
    },

    /// Records a mass measurement. An existing entry for the same date is overwritten.
    ///
    /// Goal notifications are shown each time the logs are loaded: once when
    /// the command reads them and again after the write, so entries already at
    /// or below the goal are announced twice.
    Add {
        #[arg(value_parser = parse_mass, allow_negative_numbers = true, help = "Mass in kg")]
        mass: f64,
        #[arg(short = 'D', long, value_parser = parse_date, help = "Date of the measurement (default: today, YYYY-MM-DD)")]
        date: Option<String>,
    },

    /// Lists one page of logs.
    List {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Changes the date and/or mass of a log entry.
    Update {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long = "new-date", value_parser = parse_date, help = "New date for the entry")]
        new_date: Option<String>,
        #[arg(long = "new-mass", value_parser = parse_mass, help = "New mass for the entry")]
        new_mass: Option<f64>,
    },

    /// Deletes a log entry after confirmation.
    Del {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Finds the log entry nearest to a mass or a date.
    Search {
        #[command(subcommand)]
        by: SearchBy,
    },

    /// Copies the database to a backup file.
    Export { path: PathBuf },

    /// Replaces the database with a backup file.
    Restore {
        path: PathBuf,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    /// Drops all users and logs.
    Reset {
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

/// Page and ordering shared by `list`, `update --at` and `del --at`.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true, help = "Page number, starting at 0")]
    pub page: i64,
    #[arg(short = 'n', long = "page-size", default_value_t = DEFAULT_PAGE_SIZE, help = "Entries per page")]
    pub page_size: usize,
    #[arg(
        short,
        long,
        default_value = "date-asc",
        value_parser = parse_sort,
        help = "Sort order: date-asc, date-desc, mass-asc, mass-desc (or 0-3)"
    )]
    pub sort: SortOption,
}

/// An entry addressed either by date or by its row on a listed page.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(required_unless_present = "at", conflicts_with = "at", help = "Date of the entry")]
    pub date: Option<String>,
    #[arg(long, value_name = "ROW", help = "Row number on the page shown by `list` with the same -p/-n/-s")]
    pub at: Option<usize>,
    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Subcommand, Debug)]
pub enum SearchBy {
    /// Entry with the closest mass.
    Mass {
        #[arg(value_parser = parse_mass)]
        mass: f64,
    },
    /// Entry whose date compares closest to the given string.
    Date {
        #[arg(value_parser = parse_date)]
        date: String,
    },
}

fn parse_mass(s: &str) -> Result<f64, String> {
    let mass: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if !mass.is_finite() {
        return Err(format!("'{s}' is not a finite number"));
    }
    Ok(mass)
}

fn parse_date(s: &str) -> Result<String, String> {
    let date = s.trim();
    if date.is_empty() {
        return Err("date must not be empty".to_string());
    }
    Ok(date.to_string())
}

fn parse_sort(s: &str) -> Result<SortOption, String> {
    s.parse().map_err(|e: crate::error::MassLogError| e.to_string())
}
