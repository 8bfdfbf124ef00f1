// src/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MassLogError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database Error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not logged in. Run `masslog login <username>` first")]
    NotLoggedIn,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User #{0} not found")]
    UserNotFound(i64),

    #[error("No goal set. Use `masslog goal <mass>` to set one")]
    NoGoalSet,

    #[error("No log entry selected")]
    NoSelection,

    #[error("No log entry found for date '{0}'")]
    LogNotFound(String),
}

pub type Result<T> = std::result::Result<T, MassLogError>;
