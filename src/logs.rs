// src/logs.rs
//
// Pagination, sorting and nearest-match search over one user's mass logs.
// Everything here is pure: no I/O, no shared state.

use crate::error::MassLogError;
use crate::models::{LogEntry, UserId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A user's mass logs in their current ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogCollection {
    entries: Vec<LogEntry>,
}

impl LogCollection {
    /// Builds the collection in canonical order (ascending date).
    pub fn from_map(owner: UserId, logs: BTreeMap<String, f64>) -> Self {
        let entries = logs
            .into_iter()
            .map(|(date, mass)| LogEntry { date, mass, owner })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&LogEntry> {
        self.entries.get(position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOption {
    #[default]
    DateAsc,
    DateDesc,
    MassAsc,
    MassDesc,
}

impl SortOption {
    pub fn label(self) -> &'static str {
        match self {
            Self::DateAsc => "date, oldest first",
            Self::DateDesc => "date, newest first",
            Self::MassAsc => "mass, lightest first",
            Self::MassDesc => "mass, heaviest first",
        }
    }
}

impl TryFrom<u8> for SortOption {
    type Error = MassLogError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::DateAsc),
            1 => Ok(Self::DateDesc),
            2 => Ok(Self::MassAsc),
            3 => Ok(Self::MassDesc),
            other => Err(MassLogError::InvalidInput(format!(
                "Unknown sort option {other}, expected 0-3"
            ))),
        }
    }
}

impl FromStr for SortOption {
    type Err = MassLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date-asc" | "date" => Ok(Self::DateAsc),
            "date-desc" => Ok(Self::DateDesc),
            "mass-asc" | "mass" => Ok(Self::MassAsc),
            "mass-desc" => Ok(Self::MassDesc),
            other => match other.parse::<u8>() {
                Ok(n) => Self::try_from(n),
                Err(_) => Err(MassLogError::InvalidInput(format!(
                    "Unknown sort order '{s}'. Use date-asc, date-desc, mass-asc or mass-desc"
                ))),
            },
        }
    }
}

/// Returns entries `[page*page_size, min(page*page_size + page_size, len))`.
///
/// Negative pages, pages past the end and a zero page size give an empty slice.
pub fn paginate(logs: &LogCollection, page: i64, page_size: usize) -> &[LogEntry] {
    let Some(start) = page_start(page, page_size) else {
        return &[];
    };
    if page_size == 0 || start >= logs.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(logs.len());
    &logs.entries[start..end]
}

/// True exactly when `paginate(logs, page + 1, page_size)` is non-empty.
pub fn has_next_page(logs: &LogCollection, page: i64, page_size: usize) -> bool {
    if page_size == 0 {
        return false;
    }
    match page_start(page.saturating_add(1), page_size) {
        Some(start) => start < logs.len(),
        None => false,
    }
}

fn page_start(page: i64, page_size: usize) -> Option<usize> {
    let page = usize::try_from(page).ok()?;
    page.checked_mul(page_size)
}

/// Stable sort; entries with equal keys keep their relative order.
pub fn sort(logs: &LogCollection, option: SortOption) -> LogCollection {
    let mut entries = logs.entries.clone();
    match option {
        SortOption::DateAsc => entries.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOption::DateDesc => entries.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOption::MassAsc => entries.sort_by(|a, b| a.mass.total_cmp(&b.mass)),
        SortOption::MassDesc => entries.sort_by(|a, b| b.mass.total_cmp(&a.mass)),
    }
    LogCollection { entries }
}

/// Entry whose mass is closest to `target`. Ties go to the lowest date.
pub fn search_by_mass(logs: &LogCollection, target: f64) -> Option<&LogEntry> {
    nearest(logs, |entry| (entry.mass - target).abs(), f64::total_cmp)
}

/// Entry whose date minimises `|string_compare(date, target)|`.
///
/// The distance is the magnitude of a lexicographic comparison, not a number
/// of days: "2024-01-09" and "2024-01-01" are 8 apart, while "2024-02-01" and
/// "2024-01-31" are only 1 apart. Ties go to the lowest date.
pub fn search_by_date<'a>(logs: &'a LogCollection, target: &str) -> Option<&'a LogEntry> {
    nearest(
        logs,
        |entry| string_compare(&entry.date, target).unsigned_abs(),
        u32::cmp,
    )
}

fn nearest<K, F, C>(logs: &LogCollection, distance: F, compare: C) -> Option<&LogEntry>
where
    F: Fn(&LogEntry) -> K,
    C: Fn(&K, &K) -> Ordering,
{
    let mut best: Option<(&LogEntry, K)> = None;
    for entry in &logs.entries {
        let d = distance(entry);
        let better = match &best {
            None => true,
            Some((current, current_d)) => match compare(&d, current_d) {
                Ordering::Less => true,
                Ordering::Equal => entry.date < current.date,
                Ordering::Greater => false,
            },
        };
        if better {
            best = Some((entry, d));
        }
    }
    best.map(|(entry, _)| entry)
}

/// Lexicographic comparison over UTF-16 code units that keeps the magnitude:
/// the difference of the first differing units, or the length difference
/// when one string is a prefix of the other.
pub fn string_compare(a: &str, b: &str) -> i32 {
    let mut left = a.encode_utf16();
    let mut right = b.encode_utf16();
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) if x != y => return i32::from(x) - i32::from(y),
            (Some(_), Some(_)) => continue,
            (Some(_), None) => return 1 + left.count() as i32,
            (None, Some(_)) => return -(1 + right.count() as i32),
            (None, None) => return 0,
        }
    }
}

/// Entries at or below the goal, in collection order.
pub fn goal_hits(logs: &LogCollection, goal: f64) -> impl Iterator<Item = &LogEntry> {
    logs.entries.iter().filter(move |entry| entry.mass <= goal)
}
