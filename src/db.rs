// src/db.rs

use crate::config::AppPaths;
use crate::error::{MassLogError, Result};
use crate::models::{User, UserId};
use crate::store::LogStore;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        goal REAL
    );
    CREATE TABLE IF NOT EXISTS mass (
        date TEXT NOT NULL,
        mass REAL NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        UNIQUE(user_id, date)
    );
    CREATE INDEX IF NOT EXISTS idx_mass_date ON mass(date);
    CREATE INDEX IF NOT EXISTS idx_mass_mass ON mass(mass);
";

/// 打开数据库连接, 必要时创建目录和表
pub fn open_connection(paths: &AppPaths) -> Result<Connection> {
    paths.ensure_base_dir()?;
    let conn = Connection::open(&paths.db_path)?;
    initialize_db(&conn)?;
    Ok(conn)
}

/// 初始化数据库，如果表不存在则创建
pub fn initialize_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// 删除所有表并重新创建
pub fn reset_db(conn: &Connection) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS mass; DROP TABLE IF EXISTS users;")?;
    initialize_db(conn)?;
    tracing::info!("Database reset");
    Ok(())
}

/// 把数据库文件复制到 `dest`
pub fn export_db(paths: &AppPaths, dest: &Path) -> Result<u64> {
    let bytes = std::fs::copy(&paths.db_path, dest)?;
    tracing::info!(dest = %dest.display(), bytes, "Database exported");
    Ok(bytes)
}

/// 用备份文件替换当前数据库。先写入同目录的临时文件, 再原子替换
pub fn restore_db(paths: &AppPaths, src: &Path) -> Result<()> {
    if !is_masslog_db(src)? {
        return Err(MassLogError::InvalidInput(format!(
            "{} is not a masslog database",
            src.display()
        )));
    }
    paths.ensure_base_dir()?;
    let mut temp_file = tempfile::NamedTempFile::new_in(&paths.base_dir)?;
    std::io::copy(&mut File::open(src)?, temp_file.as_file_mut())?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(&paths.db_path)
        .map_err(|e| MassLogError::Io(e.error))?;
    tracing::info!(src = %src.display(), "Database restored");
    Ok(())
}

fn is_masslog_db(path: &Path) -> Result<bool> {
    if !path.is_file() {
        return Err(MassLogError::InvalidInput(format!(
            "Backup file not found: {}",
            path.display()
        )));
    }
    let conn = match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => conn,
        Err(_) => return Ok(false),
    };
    let tables: rusqlite::Result<i64> = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'mass')",
        [],
        |row| row.get(0),
    );
    // 不是 SQLite 文件时查询会失败
    Ok(matches!(tables, Ok(2)))
}

/// 注册新用户, 返回用户 ID
pub fn register_user(conn: &Connection, username: &str, password: &str) -> Result<UserId> {
    match conn.execute(
        "INSERT INTO users (username, password) VALUES (?1, ?2)",
        params![username, password],
    ) {
        Ok(_) => {
            let id = conn.last_insert_rowid();
            tracing::info!(user_id = id, username, "User registered");
            Ok(id)
        }
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Err(MassLogError::UsernameTaken(username.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// 校验用户名和密码
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User> {
    conn.query_row(
        "SELECT id, username, goal FROM users WHERE username = ?1 AND password = ?2",
        params![username, password],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                goal: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(MassLogError::InvalidCredentials)
}

/// 根据 ID 查找用户
pub fn find_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, goal FROM users WHERE id = ?",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    goal: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    Ok(count)
}

impl LogStore for Connection {
    fn load_all(&self, user: UserId) -> Result<BTreeMap<String, f64>> {
        let mut stmt = self.prepare("SELECT date, mass FROM mass WHERE user_id = ?")?;
        let logs = stmt
            .query_map([user], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
        tracing::debug!(user_id = user, count = logs.len(), "Loaded mass logs");
        Ok(logs)
    }

    fn insert(&self, user: UserId, date: &str, mass: f64) -> Result<()> {
        self.execute(
            "INSERT INTO mass (date, mass, user_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, date) DO UPDATE SET mass = excluded.mass",
            params![date, mass, user],
        )?;
        tracing::info!(user_id = user, date, mass, "Mass log recorded");
        Ok(())
    }

    fn update(&self, user: UserId, old_date: &str, new_date: &str, new_mass: f64) -> Result<usize> {
        // OR REPLACE: moving onto an existing date overwrites that entry
        let count = self.execute(
            "UPDATE OR REPLACE mass SET date = ?1, mass = ?2 WHERE user_id = ?3 AND date = ?4",
            params![new_date, new_mass, user, old_date],
        )?;
        if count == 0 {
            tracing::warn!(user_id = user, date = old_date, "No mass log to update");
        } else {
            tracing::info!(user_id = user, old_date, new_date, new_mass, "Mass log updated");
        }
        Ok(count)
    }

    fn delete(&self, user: UserId, date: &str) -> Result<usize> {
        let count = self.execute(
            "DELETE FROM mass WHERE user_id = ?1 AND date = ?2",
            params![user, date],
        )?;
        if count == 0 {
            tracing::warn!(user_id = user, date, "No mass log to delete");
        } else {
            tracing::info!(user_id = user, date, "Mass log deleted");
        }
        Ok(count)
    }

    fn get_goal(&self, user: UserId) -> Result<Option<f64>> {
        let goal = self.query_row("SELECT goal FROM users WHERE id = ?", [user], |row| row.get(0))?;
        Ok(goal)
    }

    fn set_goal(&self, user: UserId, goal: f64) -> Result<usize> {
        let count = self.execute("UPDATE users SET goal = ?1 WHERE id = ?2", params![goal, user])?;
        if count == 0 {
            tracing::warn!(user_id = user, "Goal not saved, user does not exist");
        } else {
            tracing::info!(user_id = user, goal, "Goal updated");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_db(&conn).unwrap();
        conn
    }

    #[test]
    fn test_register_and_authenticate() {
        let conn = memory_db();
        let id = register_user(&conn, "alice", "pw").unwrap();
        let user = authenticate(&conn, "alice", "pw").unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.goal, None);
        assert!(matches!(
            authenticate(&conn, "alice", "wrong"),
            Err(MassLogError::InvalidCredentials)
        ));
        assert_eq!(find_user(&conn, id).unwrap().unwrap().username, "alice");
        assert!(find_user(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username() {
        let conn = memory_db();
        register_user(&conn, "alice", "pw").unwrap();
        assert!(matches!(
            register_user(&conn, "alice", "other"),
            Err(MassLogError::UsernameTaken(name)) if name == "alice"
        ));
        assert_eq!(count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn test_logs_are_scoped_to_owner() {
        let conn = memory_db();
        let alice = register_user(&conn, "alice", "pw").unwrap();
        let bob = register_user(&conn, "bob", "pw").unwrap();
        conn.insert(alice, "2024-01-01", 70.0).unwrap();
        conn.insert(bob, "2024-01-01", 90.0).unwrap();

        let logs = conn.load_all(alice).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs["2024-01-01"], 70.0);
    }

    #[test]
    fn test_insert_same_date_overwrites() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        conn.insert(user, "2024-01-01", 70.0).unwrap();
        conn.insert(user, "2024-01-01", 69.5).unwrap();
        let logs = conn.load_all(user).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs["2024-01-01"], 69.5);
    }

    #[test]
    fn test_update_and_delete_report_rows() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        conn.insert(user, "2024-01-01", 70.0).unwrap();

        assert_eq!(conn.update(user, "2024-01-01", "2024-01-02", 69.0).unwrap(), 1);
        assert_eq!(conn.update(user, "2024-01-01", "2024-01-03", 68.0).unwrap(), 0);
        let logs = conn.load_all(user).unwrap();
        assert_eq!(logs.into_iter().collect::<Vec<_>>(), vec![("2024-01-02".to_string(), 69.0)]);

        assert_eq!(conn.delete(user, "2024-01-05").unwrap(), 0);
        assert_eq!(conn.delete(user, "2024-01-02").unwrap(), 1);
        assert!(conn.load_all(user).unwrap().is_empty());
    }

    #[test]
    fn test_update_onto_existing_date_replaces() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        conn.insert(user, "2024-01-01", 70.0).unwrap();
        conn.insert(user, "2024-01-02", 69.0).unwrap();
        conn.update(user, "2024-01-01", "2024-01-02", 71.0).unwrap();
        let logs = conn.load_all(user).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs["2024-01-02"], 71.0);
    }

    #[test]
    fn test_goal_roundtrip() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        assert_eq!(conn.get_goal(user).unwrap(), None);
        assert_eq!(conn.set_goal(user, 65.0).unwrap(), 1);
        assert_eq!(conn.get_goal(user).unwrap(), Some(65.0));
    }

    #[test]
    fn test_set_goal_for_missing_user_reports_zero_rows() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        assert_eq!(conn.set_goal(user + 1, 65.0).unwrap(), 0);
        assert_eq!(conn.get_goal(user).unwrap(), None);
    }

    #[test]
    fn test_reset_drops_everything() {
        let conn = memory_db();
        let user = register_user(&conn, "alice", "pw").unwrap();
        conn.insert(user, "2024-01-01", 70.0).unwrap();
        reset_db(&conn).unwrap();
        assert_eq!(count_users(&conn).unwrap(), 0);
        assert!(conn.load_all(user).unwrap().is_empty());
    }

    #[test]
    fn test_export_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::in_dir(tmp.path().join("home"));
        let backup = tmp.path().join("backup.db");

        let conn = open_connection(&paths).unwrap();
        let user = register_user(&conn, "alice", "pw").unwrap();
        conn.insert(user, "2024-01-01", 70.0).unwrap();
        drop(conn);
        export_db(&paths, &backup).unwrap();

        let conn = open_connection(&paths).unwrap();
        conn.delete(user, "2024-01-01").unwrap();
        drop(conn);

        restore_db(&paths, &backup).unwrap();
        let conn = open_connection(&paths).unwrap();
        assert_eq!(conn.load_all(user).unwrap()["2024-01-01"], 70.0);
    }

    #[test]
    fn test_restore_rejects_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::in_dir(tmp.path().join("home"));
        let junk = tmp.path().join("notes.txt");
        std::fs::write(&junk, "not a database").unwrap();

        assert!(matches!(
            restore_db(&paths, &junk),
            Err(MassLogError::InvalidInput(_))
        ));
        assert!(matches!(
            restore_db(&paths, &tmp.path().join("missing.db")),
            Err(MassLogError::InvalidInput(_))
        ));
    }
}
