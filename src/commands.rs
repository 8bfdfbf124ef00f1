// src/commands.rs

use crate::cli::{SearchBy, TargetArgs, ViewArgs};
use crate::config::AppPaths;
use crate::db;
use crate::error::{MassLogError, Result};
use crate::logs;
use crate::models::{LogEntry, User};
use crate::notify::ConsoleNotifier;
use crate::session::{LogSession, LoginState};
use crate::store::LogStore;
use rusqlite::Connection;
use std::io::{self, Write};
use std::path::Path;

type Session<'a> = LogSession<'a, Connection, ConsoleNotifier>;

/// 处理 'init' 命令
pub fn handle_init(paths: &AppPaths) -> Result<()> {
    let conn = db::open_connection(paths)?;
    println!("✓ Database ready at: {}", paths.db_path.display());
    println!("  {} registered user(s).", db::count_users(&conn)?);
    Ok(())
}

/// 处理 'register' 命令
pub fn handle_register(paths: &AppPaths, username: &str, password: Option<String>) -> Result<()> {
    let (username, password) = credentials(username, password)?;
    let conn = db::open_connection(paths)?;
    db::register_user(&conn, &username, &password)?;
    println!("✓ Registration successful. Run `masslog login {}` to log in.", username);
    Ok(())
}

/// 处理 'login' 命令
pub fn handle_login(paths: &AppPaths, username: &str, password: Option<String>) -> Result<()> {
    let (username, password) = credentials(username, password)?;
    let conn = db::open_connection(paths)?;
    let user = db::authenticate(&conn, &username, &password)?;
    LoginState {
        user_id: user.id,
        username: user.username.clone(),
    }
    .save(&paths.session_path)?;
    tracing::info!(user_id = user.id, "Logged in");

    println!("✓ Logged in as {}.", user.username);
    if user.goal.is_none() {
        println!("You have no goal yet. Set one with `masslog goal <mass>`.");
    }
    Ok(())
}

/// 处理 'logout' 命令
pub fn handle_logout(paths: &AppPaths) -> Result<()> {
    if LoginState::clear(&paths.session_path)? {
        println!("✓ Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

/// 处理 'whoami' 命令
pub fn handle_whoami(paths: &AppPaths) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let count = conn.load_all(user.id)?.len();
    println!("{} ({} log entries)", user.username, count);
    match user.goal {
        Some(goal) => println!("Goal: {} kg", goal),
        None => println!("Goal: not set"),
    }
    Ok(())
}

/// 处理 'goal' 命令
pub fn handle_goal(paths: &AppPaths, mass: Option<f64>) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;

    let Some(goal) = mass else {
        let goal = user.goal.ok_or(MassLogError::NoGoalSet)?;
        println!("Goal: {} kg", goal);
        return Ok(());
    };

    let mut session = open_session(&conn, &user)?;
    session.set_goal(goal)?;
    println!("✓ Goal set to {} kg.", goal);
    let reached = logs::goal_hits(session.logs(), goal).count();
    if reached > 0 {
        println!("  {} logged entries already at or below it.", reached);
    }
    Ok(())
}

/// 处理 'add' 命令
pub fn handle_add(paths: &AppPaths, mass: f64, date: Option<String>) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    let mut session = open_session(&conn, &user)?;
    session.add(&date, mass)?;
    tracing::debug!(notified = session.notifier().sent, "Add finished");
    println!("✓ Mass log added: {} - {} kg", date, mass);
    Ok(())
}

/// 处理 'list' 命令
pub fn handle_list(paths: &AppPaths, view: &ViewArgs) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let mut session = open_session(&conn, &user)?;

    if session.logs().is_empty() {
        println!("No logs found.");
        return Ok(());
    }

    session.sort(view.sort);
    let page = session.page(view.page, view.page_size);
    if page.is_empty() {
        println!("No logs on page {}.", view.page);
        return Ok(());
    }

    for (row, entry) in page.iter().enumerate() {
        print_entry(Some(row), entry, session.goal());
    }
    println!("{}", "─".repeat(40));

    let first = view.page as usize * view.page_size + 1;
    println!(
        "Page {} · entries {}-{} of {} · sorted by {}",
        view.page,
        first,
        first + page.len() - 1,
        session.logs().len(),
        session.order().label()
    );
    if session.has_next_page(view.page, view.page_size) {
        println!("More: masslog list -p {}", view.page + 1);
    }
    Ok(())
}

/// 处理 'update' 命令
pub fn handle_update(
    paths: &AppPaths,
    target: &TargetArgs,
    new_date: Option<String>,
    new_mass: Option<f64>,
) -> Result<()> {
    if new_date.is_none() && new_mass.is_none() {
        return Err(MassLogError::InvalidInput(
            "Nothing to change. Pass --new-date and/or --new-mass.".to_string(),
        ));
    }

    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let mut session = open_session(&conn, &user)?;

    let selected = select_target(&mut session, target)?;
    let date = new_date.unwrap_or_else(|| selected.date.clone());
    let mass = new_mass.unwrap_or(selected.mass);

    session.update_selected(&date, mass)?;
    println!(
        "✓ Mass log updated: {} - {} kg → {} - {} kg",
        selected.date, selected.mass, date, mass
    );
    Ok(())
}

/// 处理 'del' 命令
pub fn handle_del(paths: &AppPaths, target: &TargetArgs, yes: bool) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let mut session = open_session(&conn, &user)?;

    let selected = select_target(&mut session, target)?;
    if !yes && !confirm(&format!("Delete {} - {} kg?", selected.date, selected.mass))? {
        println!("Cancelled.");
        return Ok(());
    }

    session.delete_selected()?;
    println!("✓ Record deleted.");
    Ok(())
}

/// 处理 'search' 命令
pub fn handle_search(paths: &AppPaths, by: &SearchBy) -> Result<()> {
    let conn = db::open_connection(paths)?;
    let user = require_login(paths, &conn)?;
    let session = open_session(&conn, &user)?;

    let found = match by {
        SearchBy::Mass { mass } => session.search_by_mass(*mass),
        SearchBy::Date { date } => session.search_by_date(date),
    };
    match found {
        Some(entry) => print_entry(None, entry, session.goal()),
        None => println!("No logs found."),
    }
    Ok(())
}

/// 处理 'export' 命令
pub fn handle_export(paths: &AppPaths, dest: &Path) -> Result<()> {
    if !paths.db_path.exists() {
        return Err(MassLogError::InvalidInput(
            "No database yet. Run `masslog init` first.".to_string(),
        ));
    }
    let bytes = db::export_db(paths, dest)?;
    println!("✓ Exported {} bytes to {}", bytes, dest.display());
    Ok(())
}

/// 处理 'restore' 命令
pub fn handle_restore(paths: &AppPaths, src: &Path, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Replace the current database with {}?", src.display()))? {
        println!("Cancelled.");
        return Ok(());
    }
    db::restore_db(paths, src)?;
    println!("✓ Database restored from {}", src.display());
    Ok(())
}

/// 处理 'reset' 命令
pub fn handle_reset(paths: &AppPaths, yes: bool) -> Result<()> {
    if !yes && !confirm("Permanently delete ALL users and mass logs?")? {
        println!("Cancelled.");
        return Ok(());
    }
    let conn = db::open_connection(paths)?;
    db::reset_db(&conn)?;
    LoginState::clear(&paths.session_path)?;
    println!("✓ Database reset.");
    Ok(())
}

fn open_session<'a>(conn: &'a Connection, user: &User) -> Result<Session<'a>> {
    LogSession::open(conn, user.id, ConsoleNotifier::default())
}

/// 读取 session 文件并确认用户仍然存在
fn require_login(paths: &AppPaths, conn: &Connection) -> Result<User> {
    let state = LoginState::load(&paths.session_path)?.ok_or(MassLogError::NotLoggedIn)?;
    match db::find_user(conn, state.user_id)? {
        Some(user) => Ok(user),
        None => {
            tracing::warn!(user_id = state.user_id, "Session refers to a missing user");
            LoginState::clear(&paths.session_path)?;
            Err(MassLogError::NotLoggedIn)
        }
    }
}

/// 选中目标条目, 返回它的副本
fn select_target(session: &mut Session<'_>, target: &TargetArgs) -> Result<LogEntry> {
    let selected = match (&target.date, target.at) {
        (_, Some(row)) => {
            let view = &target.view;
            session.sort(view.sort);
            session
                .select_on_page(view.page, view.page_size, row)
                .ok_or_else(|| {
                    MassLogError::InvalidInput(format!("No row {} on page {}", row, view.page))
                })?
        }
        (Some(date), None) => session
            .select_date(date)
            .ok_or_else(|| MassLogError::LogNotFound(date.clone()))?,
        (None, None) => {
            // clap应该已经阻止了这种情况
            return Err(MassLogError::InvalidInput(
                "You must provide a date or --at <ROW>.".to_string(),
            ));
        }
    };
    Ok(selected.clone())
}

fn credentials(username: &str, password: Option<String>) -> Result<(String, String)> {
    let username = username.trim().to_string();
    let password = match password {
        Some(p) => p,
        None => prompt("Password: ")?,
    };
    let password = password.trim().to_string();
    if username.is_empty() || password.is_empty() {
        return Err(MassLogError::InvalidInput(
            "Please enter both username and password".to_string(),
        ));
    }
    Ok((username, password))
}

fn print_entry(row: Option<usize>, entry: &LogEntry, goal: Option<f64>) {
    let marker = match goal {
        Some(goal) if entry.mass <= goal => "  ★",
        _ => "",
    };
    match row {
        Some(row) => println!("[{}] {} - {} kg{}", row, entry.date, entry.mass, marker),
        None => println!("{} - {} kg{}", entry.date, entry.mass, marker),
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input)
}

fn confirm(question: &str) -> Result<bool> {
    let input = prompt(&format!("{} (y/N): ", question))?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
