// src/notify.rs

use crate::models::LogEntry;

pub const GOAL_REACHED_MESSAGE: &str = "Congratulations! You've reached your goal!";

/// Receives one call per logged entry at or below the user's goal.
pub trait GoalNotifier {
    fn goal_reached(&mut self, entry: &LogEntry, goal: f64);
}

/// Prints goal notifications to stdout.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    pub sent: usize,
}

impl GoalNotifier for ConsoleNotifier {
    fn goal_reached(&mut self, entry: &LogEntry, goal: f64) {
        tracing::info!(user_id = entry.owner, date = %entry.date, mass = entry.mass, goal, "Goal reached");
        println!("🎉 {} ({} - {} kg)", GOAL_REACHED_MESSAGE, entry.date, entry.mass);
        self.sent += 1;
    }
}
