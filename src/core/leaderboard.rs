/// Bounded excuse leaderboard with votes, rankings and JSON snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::formatter::FormatError;
use crate::schema::excuse::{Excuse, ExcuseMetadata};
use crate::schema::severity::SeverityTier;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

pub const DEFAULT_MAX_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Insertion sequence number; breaks ranking ties.
    pub seq: u64,
    pub excuse_text: String,
    pub quality_score: u32,
    pub severity: SeverityTier,
    pub category: String,
    pub language: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    #[serde(default)]
    pub metadata: Option<ExcuseMetadata>,
}

impl LeaderboardEntry {
    pub fn net_votes(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    /// `min(up, down) / max(up, down, 1) * (up + down)`: high for large,
    /// evenly split votes.
    pub fn controversy_score(&self) -> f64 {
        let (up, down) = (f64::from(self.upvotes), f64::from(self.downvotes));
        up.min(down) / up.max(down).max(1.0) * (up + down)
    }
}

/// Leaderboard export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardFormat {
    Json,
    Csv,
    Markdown,
}

impl FromStr for LeaderboardFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(FormatError::InvalidFormat(s.to_string())),
        }
    }
}

/// Aggregate figures over all entries.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LeaderboardStats {
    pub total_excuses: usize,
    pub average_quality: f64,
    pub categories: BTreeMap<String, usize>,
    pub severities: BTreeMap<String, usize>,
    pub languages: BTreeMap<String, usize>,
    pub best_excuse: Option<String>,
    pub best_score: Option<u32>,
    pub worst_excuse: Option<String>,
    pub worst_score: Option<u32>,
    pub total_upvotes: u64,
    pub total_downvotes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    entries: Vec<LeaderboardEntry>,
    max_size: usize,
    #[serde(default)]
    next_seq: u64,
    saved_at: DateTime<Utc>,
}

/// Capacity-bounded set of excuses.
///
/// On overflow the lowest quality scores are evicted, never the oldest.
/// Equal scores keep insertion order everywhere.
#[derive(Debug, Clone)]
pub struct Leaderboard {
    max_size: usize,
    entries: Vec<LeaderboardEntry>,
    next_seq: u64,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl Leaderboard {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// Add an entry and return its sequence number. The entry may be
    /// evicted immediately if it scores below a full board.
    pub fn add(
        &mut self,
        excuse_text: &str,
        quality_score: u32,
        severity: SeverityTier,
        category: &str,
        language: &str,
    ) -> u64 {
        self.push(LeaderboardEntry {
            seq: 0,
            excuse_text: excuse_text.to_string(),
            quality_score,
            severity,
            category: category.to_string(),
            language: language.to_string(),
            timestamp: Utc::now(),
            upvotes: 0,
            downvotes: 0,
            metadata: None,
        })
    }

    pub fn add_excuse(&mut self, excuse: &Excuse) -> u64 {
        self.push(LeaderboardEntry {
            seq: 0,
            excuse_text: excuse.text.clone(),
            quality_score: excuse.quality_score,
            severity: excuse.severity,
            category: excuse.category.clone(),
            language: excuse.language.clone(),
            timestamp: excuse.timestamp,
            upvotes: 0,
            downvotes: 0,
            metadata: Some(excuse.metadata.clone()),
        })
    }

    fn push(&mut self, mut entry: LeaderboardEntry) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        entry.seq = seq;
        self.entries.push(entry);
        self.enforce_capacity();
        seq
    }

    fn enforce_capacity(&mut self) {
        if self.entries.len() <= self.max_size {
            return;
        }
        self.entries.sort_by(|a, b| {
            b.quality_score
                .cmp(&a.quality_score)
                .then(a.seq.cmp(&b.seq))
        });
        self.entries.truncate(self.max_size);
        self.entries.sort_by_key(|e| e.seq);
    }

    /// Vote on the first entry with this exact text. Returns whether one
    /// was found.
    pub fn vote(&mut self, excuse_text: &str, upvote: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.excuse_text == excuse_text) {
            Some(entry) => {
                if upvote {
                    entry.upvotes += 1;
                } else {
                    entry.downvotes += 1;
                }
                true
            }
            None => false,
        }
    }

    pub fn top_by_quality(&self, n: usize) -> Vec<&LeaderboardEntry> {
        self.ranked(n, |a, b| b.quality_score.cmp(&a.quality_score))
    }

    pub fn top_by_votes(&self, n: usize) -> Vec<&LeaderboardEntry> {
        self.ranked(n, |a, b| b.net_votes().cmp(&a.net_votes()))
    }

    pub fn most_controversial(&self, n: usize) -> Vec<&LeaderboardEntry> {
        self.ranked(n, |a, b| b.controversy_score().total_cmp(&a.controversy_score()))
    }

    /// Newest first; same-instant entries by descending sequence.
    pub fn recent(&self, n: usize) -> Vec<&LeaderboardEntry> {
        self.ranked(n, |a, b| b.timestamp.cmp(&a.timestamp).then(b.seq.cmp(&a.seq)))
    }

    pub fn by_category(&self, category: &str, n: usize) -> Vec<&LeaderboardEntry> {
        let mut filtered: Vec<&LeaderboardEntry> =
            self.entries.iter().filter(|e| e.category == category).collect();
        filtered.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
        filtered.truncate(n);
        filtered
    }

    pub fn by_severity(&self, severity: SeverityTier, n: usize) -> Vec<&LeaderboardEntry> {
        let mut filtered: Vec<&LeaderboardEntry> =
            self.entries.iter().filter(|e| e.severity == severity).collect();
        filtered.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
        filtered.truncate(n);
        filtered
    }

    // Entries are kept in sequence order, so a stable sort breaks ties by
    // insertion.
    fn ranked<F>(&self, n: usize, cmp: F) -> Vec<&LeaderboardEntry>
    where
        F: Fn(&LeaderboardEntry, &LeaderboardEntry) -> std::cmp::Ordering,
    {
        let mut sorted: Vec<&LeaderboardEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| cmp(a, b));
        sorted.truncate(n);
        sorted
    }

    pub fn stats(&self) -> LeaderboardStats {
        if self.entries.is_empty() {
            return LeaderboardStats::default();
        }

        let mut stats = LeaderboardStats {
            total_excuses: self.entries.len(),
            ..LeaderboardStats::default()
        };
        let mut quality_sum = 0u64;
        for entry in &self.entries {
            quality_sum += u64::from(entry.quality_score);
            *stats.categories.entry(entry.category.clone()).or_default() += 1;
            *stats
                .severities
                .entry(entry.severity.name().to_string())
                .or_default() += 1;
            *stats.languages.entry(entry.language.clone()).or_default() += 1;
            stats.total_upvotes += u64::from(entry.upvotes);
            stats.total_downvotes += u64::from(entry.downvotes);
        }
        stats.average_quality = quality_sum as f64 / self.entries.len() as f64;

        if let Some(best) = self.entries.iter().rev().max_by_key(|e| e.quality_score) {
            stats.best_excuse = Some(best.excuse_text.clone());
            stats.best_score = Some(best.quality_score);
        }
        if let Some(worst) = self.entries.iter().min_by_key(|e| e.quality_score) {
            stats.worst_excuse = Some(worst.excuse_text.clone());
            stats.worst_score = Some(worst.quality_score);
        }
        stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn export(&self, format: LeaderboardFormat) -> Result<String, LeaderboardError> {
        match format {
            LeaderboardFormat::Json => Ok(serde_json::to_string_pretty(&self.entries)?),
            LeaderboardFormat::Csv => Ok(self.export_csv()),
            LeaderboardFormat::Markdown => Ok(self.export_markdown()),
        }
    }

    fn export_csv(&self) -> String {
        let mut out =
            String::from("Excuse,Score,Severity,Category,Language,Upvotes,Downvotes,Timestamp\r\n");
        for e in &self.entries {
            let row = [
                csv_field(&e.excuse_text),
                e.quality_score.to_string(),
                e.severity.name().to_string(),
                csv_field(&e.category),
                csv_field(&e.language),
                e.upvotes.to_string(),
                e.downvotes.to_string(),
                e.timestamp.to_rfc3339(),
            ];
            out.push_str(&row.join(","));
            out.push_str("\r\n");
        }
        out
    }

    fn export_markdown(&self) -> String {
        let mut lines = vec![
            "# Excuse Leaderboard\n".to_string(),
            "## Top by Quality Score\n".to_string(),
        ];
        for (i, e) in self.top_by_quality(5).iter().enumerate() {
            lines.push(format!("{}. **Score {}**: {}", i + 1, e.quality_score, e.excuse_text));
        }
        lines.push("\n## Top by Votes\n".to_string());
        for (i, e) in self.top_by_votes(5).iter().enumerate() {
            lines.push(format!("{}. **{:+}**: {}", i + 1, e.net_votes(), e.excuse_text));
        }
        let stats = self.stats();
        lines.push("\n## Statistics\n".to_string());
        lines.push(format!("- Total Excuses: {}", stats.total_excuses));
        lines.push(format!("- Average Quality: {:.1}", stats.average_quality));
        lines.join("\n")
    }

    /// Write entries, capacity and sequence counter to a JSON file,
    /// creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), LeaderboardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = Snapshot {
            entries: self.entries.clone(),
            max_size: self.max_size,
            next_seq: self.next_seq,
            saved_at: Utc::now(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
        info!(entries = self.entries.len(), "saved leaderboard to {}", path.display());
        Ok(())
    }

    /// Strictly restore a snapshot written by [`save`](Self::save).
    pub fn try_load(path: &Path) -> Result<Leaderboard, LeaderboardError> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&contents)?;

        let mut entries = snapshot.entries;
        entries.sort_by_key(|e| e.seq);
        let next_seq = entries
            .last()
            .map(|e| e.seq + 1)
            .unwrap_or(0)
            .max(snapshot.next_seq);

        let mut board = Leaderboard {
            max_size: snapshot.max_size,
            entries,
            next_seq,
        };
        board.enforce_capacity();
        Ok(board)
    }

    /// Restore a snapshot, starting with an empty board of `max_size` when
    /// the file is missing or unreadable.
    pub fn load_or_default(path: &Path, max_size: usize) -> Leaderboard {
        if !path.exists() {
            return Leaderboard::new(max_size);
        }
        match Self::try_load(path) {
            Ok(board) => board,
            Err(e) => {
                warn!(error = %e, "unreadable leaderboard at {}, starting empty", path.display());
                Leaderboard::new(max_size)
            }
        }
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
