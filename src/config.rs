// src/config.rs

use crate::error::{MassLogError, Result};
use std::path::{Path, PathBuf};

pub const DB_FILE_NAME: &str = "masslog.db";
pub const SESSION_FILE_NAME: &str = "session";
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Locations of everything masslog keeps on disk.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    pub session_path: PathBuf,
}

impl AppPaths {
    /// Uses `home` if given (from `--home` or `MASSLOG_HOME`), otherwise
    /// `~/.config/masslog`.
    pub fn resolve(home: Option<&Path>) -> Result<Self> {
        let base_dir = match home {
            Some(dir) => dir.to_path_buf(),
            None => dirs::home_dir()
                .ok_or(MassLogError::HomeDirNotFound)?
                .join(".config/masslog"),
        };
        Ok(Self::in_dir(base_dir))
    }

    pub fn in_dir(base_dir: PathBuf) -> Self {
        Self {
            db_path: base_dir.join(DB_FILE_NAME),
            session_path: base_dir.join(SESSION_FILE_NAME),
            base_dir,
        }
    }

    pub fn ensure_base_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            std::fs::create_dir_all(&self.base_dir)?;
        }
        Ok(())
    }
}
