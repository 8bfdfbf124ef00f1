// src/models.rs

pub type UserId = i64;

/// One dated mass measurement. The date is an opaque, user-supplied string.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub date: String,
    pub mass: f64,
    pub owner: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub goal: Option<f64>, // None until the user sets one
}
