// src/session.rs
//
// View state for one logged-in user: the loaded collection in its current
// ordering, the selected row and the goal. Also the session file that
// remembers who is logged in between runs.

use crate::error::{MassLogError, Result};
use crate::logs::{self, LogCollection, SortOption};
use crate::models::{LogEntry, UserId};
use crate::notify::GoalNotifier;
use crate::store::LogStore;
use std::path::Path;

pub struct LogSession<'a, S: LogStore, N: GoalNotifier> {
    store: &'a S,
    user: UserId,
    goal: Option<f64>,
    logs: LogCollection,
    order: SortOption,
    selected: Option<usize>,
    notifier: N,
}

impl<'a, S: LogStore, N: GoalNotifier> LogSession<'a, S, N> {
    pub fn open(store: &'a S, user: UserId, notifier: N) -> Result<Self> {
        let goal = store.get_goal(user)?;
        let mut session = Self {
            store,
            user,
            goal,
            logs: LogCollection::default(),
            order: SortOption::default(),
            selected: None,
            notifier,
        };
        session.reload()?;
        Ok(session)
    }

    /// Rebuilds the collection from the store and re-runs the goal check.
    /// Every entry at or below the goal is notified again on each reload, so
    /// `open` followed by a write notifies each such entry twice.
    pub fn reload(&mut self) -> Result<()> {
        let map = self.store.load_all(self.user)?;
        self.logs = LogCollection::from_map(self.user, map);
        self.order = SortOption::default();
        self.selected = None;
        tracing::debug!(user_id = self.user, count = self.logs.len(), "Session reloaded");

        if let Some(goal) = self.goal {
            for entry in logs::goal_hits(&self.logs, goal) {
                self.notifier.goal_reached(entry, goal);
            }
        }
        Ok(())
    }

    pub fn sort(&mut self, option: SortOption) {
        self.logs = logs::sort(&self.logs, option);
        self.order = option;
        self.selected = None;
    }

    pub fn order(&self) -> SortOption {
        self.order
    }

    pub fn logs(&self) -> &LogCollection {
        &self.logs
    }

    pub fn goal(&self) -> Option<f64> {
        self.goal
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn page(&self, page: i64, page_size: usize) -> &[LogEntry] {
        logs::paginate(&self.logs, page, page_size)
    }

    pub fn has_next_page(&self, page: i64, page_size: usize) -> bool {
        logs::has_next_page(&self.logs, page, page_size)
    }

    pub fn search_by_mass(&self, target: f64) -> Option<&LogEntry> {
        logs::search_by_mass(&self.logs, target)
    }

    pub fn search_by_date(&self, target: &str) -> Option<&LogEntry> {
        logs::search_by_date(&self.logs, target)
    }

    /// Selects the entry at `position` in the current ordering.
    pub fn select(&mut self, position: usize) -> Option<&LogEntry> {
        self.selected = self.logs.get(position).map(|_| position);
        self.selected()
    }

    /// Selects row `position` of the given page.
    pub fn select_on_page(&mut self, page: i64, page_size: usize, position: usize) -> Option<&LogEntry> {
        if position >= self.page(page, page_size).len() {
            self.selected = None;
            return None;
        }
        // page is non-negative here, otherwise the page above would be empty
        self.select(page as usize * page_size + position)
    }

    pub fn selected(&self) -> Option<&LogEntry> {
        self.selected.and_then(|position| self.logs.get(position))
    }

    /// Selects the entry with exactly this date.
    pub fn select_date(&mut self, date: &str) -> Option<&LogEntry> {
        let position = self.logs.entries().iter().position(|e| e.date == date);
        self.selected = position;
        self.selected()
    }

    pub fn add(&mut self, date: &str, mass: f64) -> Result<()> {
        self.store.insert(self.user, date, mass)?;
        self.reload()
    }

    pub fn update_selected(&mut self, new_date: &str, new_mass: f64) -> Result<()> {
        let old_date = self.selected().ok_or(MassLogError::NoSelection)?.date.clone();
        let count = self.store.update(self.user, &old_date, new_date, new_mass)?;
        if count == 0 {
            return Err(MassLogError::LogNotFound(old_date));
        }
        self.reload()
    }

    pub fn delete_selected(&mut self) -> Result<()> {
        let date = self.selected().ok_or(MassLogError::NoSelection)?.date.clone();
        let count = self.store.delete(self.user, &date)?;
        if count == 0 {
            return Err(MassLogError::LogNotFound(date));
        }
        self.reload()
    }

    pub fn set_goal(&mut self, goal: f64) -> Result<()> {
        if self.store.set_goal(self.user, goal)? == 0 {
            return Err(MassLogError::UserNotFound(self.user));
        }
        self.goal = Some(goal);
        Ok(())
    }
}

/// The user remembered by `masslog login`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginState {
    pub user_id: UserId,
    pub username: String,
}

impl LoginState {
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, format!("{}\t{}\n", self.user_id, self.username))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let (id, username) = content
            .trim_end()
            .split_once('\t')
            .ok_or_else(|| MassLogError::InvalidInput(format!("Corrupt session file: {}", path.display())))?;
        let user_id = id
            .parse()
            .map_err(|_| MassLogError::InvalidInput(format!("Corrupt session file: {}", path.display())))?;
        Ok(Some(Self {
            user_id,
            username: username.to_string(),
        }))
    }

    /// Returns whether a session file was removed.
    pub fn clear(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rusqlite::Connection;

    impl GoalNotifier for Vec<String> {
        fn goal_reached(&mut self, entry: &LogEntry, _goal: f64) {
            self.push(entry.date.clone());
        }
    }

    fn setup(logs: &[(&str, f64)], goal: Option<f64>) -> (Connection, UserId) {
        let conn = Connection::open_in_memory().unwrap();
        db::initialize_db(&conn).unwrap();
        let user = db::register_user(&conn, "alice", "pw").unwrap();
        for (date, mass) in logs {
            conn.insert(user, date, *mass).unwrap();
        }
        if let Some(goal) = goal {
            conn.set_goal(user, goal).unwrap();
        }
        (conn, user)
    }

    #[test]
    fn test_open_loads_in_date_order() {
        let (conn, user) = setup(&[("2024-01-02", 70.0), ("2024-01-01", 71.0)], None);
        let session = LogSession::open(&conn, user, Vec::new()).unwrap();
        let dates: Vec<_> = session.logs().entries().iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02"]);
        assert!(session.notifier().is_empty());
    }

    #[test]
    fn test_goal_notifications_repeat_on_every_load() {
        let (conn, user) = setup(
            &[("2024-01-01", 72.0), ("2024-01-02", 65.0), ("2024-01-03", 64.0)],
            Some(65.0),
        );
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        assert_eq!(session.notifier().as_slice(), ["2024-01-02", "2024-01-03"]);

        session.reload().unwrap();
        assert_eq!(session.notifier().len(), 4);

        session.add("2024-01-04", 70.0).unwrap();
        assert_eq!(session.notifier().len(), 6);
    }

    #[test]
    fn test_open_then_add_notifies_each_load() {
        let (conn, user) = setup(&[("2024-01-01", 64.0)], Some(65.0));
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        session.add("2024-01-02", 80.0).unwrap();
        assert_eq!(session.notifier().as_slice(), ["2024-01-01", "2024-01-01"]);
    }

    #[test]
    fn test_set_goal_for_deleted_user() {
        let (conn, user) = setup(&[("2024-01-01", 64.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        conn.execute("DELETE FROM users WHERE id = ?", [user]).unwrap();
        assert!(matches!(
            session.set_goal(60.0),
            Err(MassLogError::UserNotFound(id)) if id == user
        ));
        assert_eq!(session.goal(), None);
    }

    #[test]
    fn test_reload_and_sort_clear_selection() {
        let (conn, user) = setup(&[("2024-01-01", 72.0), ("2024-01-02", 70.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();

        assert_eq!(session.select(1).unwrap().date, "2024-01-02");
        session.sort(SortOption::MassAsc);
        assert!(session.selected().is_none());

        session.select(0);
        session.reload().unwrap();
        assert!(session.selected().is_none());
        assert_eq!(session.order(), SortOption::DateAsc);
    }

    #[test]
    fn test_select_out_of_range() {
        let (conn, user) = setup(&[("2024-01-01", 72.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        assert!(session.select(5).is_none());
        assert!(session.select_on_page(1, 10, 0).is_none());
        assert!(session.select_on_page(-1, 10, 0).is_none());
    }

    #[test]
    fn test_select_on_page_follows_sort() {
        let (conn, user) = setup(
            &[("2024-01-01", 72.0), ("2024-01-02", 70.0), ("2024-01-03", 71.0)],
            None,
        );
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        session.sort(SortOption::MassDesc);
        // page 1 of size 2 holds only the lightest entry
        assert_eq!(session.select_on_page(1, 2, 0).unwrap().date, "2024-01-02");
        assert!(!session.has_next_page(1, 2));
    }

    #[test]
    fn test_update_and_delete_selected() {
        let (conn, user) = setup(&[("2024-01-01", 72.0), ("2024-01-02", 70.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();

        assert!(matches!(session.delete_selected(), Err(MassLogError::NoSelection)));

        session.select_date("2024-01-01").unwrap();
        session.update_selected("2024-01-05", 69.0).unwrap();
        assert!(session.selected().is_none());
        assert_eq!(session.search_by_date("2024-01-05").unwrap().mass, 69.0);

        session.select_date("2024-01-02").unwrap();
        session.delete_selected().unwrap();
        assert_eq!(session.logs().len(), 1);
    }

    #[test]
    fn test_update_of_vanished_row() {
        let (conn, user) = setup(&[("2024-01-01", 72.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        session.select(0);
        // removed behind the session's back
        conn.delete(user, "2024-01-01").unwrap();
        assert!(matches!(
            session.update_selected("2024-01-02", 70.0),
            Err(MassLogError::LogNotFound(date)) if date == "2024-01-01"
        ));
    }

    #[test]
    fn test_set_goal_persists() {
        let (conn, user) = setup(&[("2024-01-01", 72.0)], None);
        let mut session = LogSession::open(&conn, user, Vec::new()).unwrap();
        session.set_goal(72.0).unwrap();
        assert_eq!(conn.get_goal(user).unwrap(), Some(72.0));
        session.reload().unwrap();
        assert_eq!(session.notifier().as_slice(), ["2024-01-01"]);
    }

    #[test]
    fn test_login_state_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session");
        assert_eq!(LoginState::load(&path).unwrap(), None);

        let state = LoginState {
            user_id: 7,
            username: "alice".to_string(),
        };
        state.save(&path).unwrap();
        assert_eq!(LoginState::load(&path).unwrap(), Some(state));

        assert!(LoginState::clear(&path).unwrap());
        assert!(!LoginState::clear(&path).unwrap());
    }

    #[test]
    fn test_corrupt_login_state() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("session");
        std::fs::write(&path, "garbage").unwrap();
        assert!(matches!(LoginState::load(&path), Err(MassLogError::InvalidInput(_))));
    }
}
