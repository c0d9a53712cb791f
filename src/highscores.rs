//! High score leaderboard system
//!
//! Persisted through a [`KeyValueStore`], tracks the top 10 scores on this
//! device.

use serde::{Deserialize, Serialize};

use crate::platform::KeyValueStore;
use crate::platform::storage::{self, keys};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Player's score
    pub score: u64,
    /// Display name at the time of the run
    pub name: String,
    /// Avatar data URL, if the player had one
    #[serde(default)]
    pub avatar: Option<String>,
    /// Device that set the score
    pub device_id: String,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// High score leaderboard, sorted by score descending
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Current ranking, best first
    pub fn ranking(&self) -> &[HighScoreEntry] {
        &self.entries
    }

    /// Insert an entry keeping the ranking sorted, stable on ties, and
    /// truncated to the top 10. Returns the resulting ranking.
    pub fn insert(&mut self, entry: HighScoreEntry) -> &[HighScoreEntry] {
        self.entries.push(entry);
        // sort_by is stable: earlier entries stay ahead of later equal scores
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(MAX_HIGH_SCORES);
        &self.entries
    }

    /// Record a finished run and persist the ranking.
    /// A failed write is logged and the in-memory ranking is still updated.
    pub fn record_score<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
        entry: HighScoreEntry,
    ) -> &[HighScoreEntry] {
        log::info!("Recording score {} for {}", entry.score, entry.name);
        self.insert(entry);
        self.save(store);
        &self.entries
    }

    /// 1-based position for a score set by `device_id`.
    ///
    /// Walks the ranking and stops at the first entry with a lower score, or
    /// the same score from the same device. Unmatched scores rank last + 1.
    pub fn rank_of(&self, score: u64, device_id: &str) -> usize {
        let mut rank = 1;
        for entry in &self.entries {
            if score > entry.score {
                break;
            }
            if score == entry.score && entry.device_id == device_id {
                break;
            }
            rank += 1;
        }
        rank
    }

    /// Whether a ranking row belongs to the run that just ended
    pub fn is_current(entry: &HighScoreEntry, score: u64, device_id: &str) -> bool {
        entry.score == score && entry.device_id == device_id
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load high scores; unreadable or corrupt data is an empty ranking
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match storage::load_json::<Self, S>(store, keys::RANKING) {
            Ok(Some(mut scores)) => {
                scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
                scores.entries.truncate(MAX_HIGH_SCORES);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Could not read high scores: {e}");
                Self::new()
            }
        }
    }

    /// Persist high scores; failures are logged and dropped
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        match storage::save_json(store, keys::RANKING, self) {
            Ok(()) => log::info!("High scores saved ({} entries)", self.entries.len()),
            Err(e) => log::warn!("Could not save high scores: {e}"),
        }
    }
}

/// Medal for the top three places (0-based index)
pub fn medal(index: usize) -> Option<&'static str> {
    match index {
        0 => Some("🥇"),
        1 => Some("🥈"),
        2 => Some("🥉"),
        _ => None,
    }
}

/// Format a timestamp relative to `now` (both ms since epoch)
pub fn format_date(timestamp: f64, now: f64) -> String {
    let diff_secs = (now - timestamp).max(0.0) / 1000.0;
    let diff_mins = diff_secs / 60.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        let days = diff_days.floor() as i64;
        if days == 1 {
            "Yesterday".to_string()
        } else if days < 7 {
            format!("{} days ago", days)
        } else {
            let (year, month, day) = civil_from_days((timestamp / 86_400_000.0).floor() as i64);
            format!("{}/{}/{:02}", month, day, year % 100)
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}

/// Days since 1970-01-01 to a (year, month, day) UTC date
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
