// src/store.rs

use crate::error::Result;
use crate::models::UserId;
use std::collections::BTreeMap;

/// Storage for one user's mass logs and goal.
///
/// `update`, `delete` and `set_goal` report the number of rows they touched so callers can
/// tell a missing date or user apart from a storage failure.
pub trait LogStore {
    fn load_all(&self, user: UserId) -> Result<BTreeMap<String, f64>>;

    /// Inserts a log, overwriting the mass if the date already exists.
    fn insert(&self, user: UserId, date: &str, mass: f64) -> Result<()>;

    fn update(&self, user: UserId, old_date: &str, new_date: &str, new_mass: f64) -> Result<usize>;

    fn delete(&self, user: UserId, date: &str) -> Result<usize>;

    fn get_goal(&self, user: UserId) -> Result<Option<f64>>;

    fn set_goal(&self, user: UserId, goal: f64) -> Result<usize>;
}
