// src/main.rs

mod cli;
mod commands;
mod config;
mod db;
mod error;
mod logging;
mod logs;
mod models;
mod notify;
mod session;
mod store;

use clap::Parser;
use cli::{Cli, Commands};
use config::AppPaths;
use error::Result;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "masslog starting");

    if let Err(e) = run(cli) {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::resolve(cli.home.as_deref())?;
    tracing::debug!(db = %paths.db_path.display(), "Resolved paths");

    match cli.command {
        Commands::Init => commands::handle_init(&paths),
        Commands::Register { username, password } => {
            commands::handle_register(&paths, &username, password)
        }
        Commands::Login { username, password } => {
            commands::handle_login(&paths, &username, password)
        }
        Commands::Logout => commands::handle_logout(&paths),
        Commands::Whoami => commands::handle_whoami(&paths),
        Commands::Goal { mass } => commands::handle_goal(&paths, mass),
        Commands::Add { mass, date } => commands::handle_add(&paths, mass, date),
        Commands::List { view } => commands::handle_list(&paths, &view),
        Commands::Update {
            target,
            new_date,
            new_mass,
        } => commands::handle_update(&paths, &target, new_date, new_mass),
        Commands::Del { target, yes } => commands::handle_del(&paths, &target, yes),
        Commands::Search { by } => commands::handle_search(&paths, &by),
        Commands::Export { path } => commands::handle_export(&paths, &path),
        Commands::Restore { path, yes } => commands::handle_restore(&paths, &path, yes),
        Commands::Reset { yes } => commands::handle_reset(&paths, yes),
    }
}
