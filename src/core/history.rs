/// Session history of generated excuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::core::formatter::FormatError;
use crate::core::pipeline::{ExcuseGenerator, PipelineError};
use crate::schema::excuse::Excuse;
use crate::schema::severity::SeverityTier;

/// History export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
}

impl FromStr for ExportFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(FormatError::InvalidFormat(s.to_string())),
        }
    }
}

/// JSON projection of one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub text: String,
    pub recommendation: String,
    pub severity: SeverityTier,
    pub category: String,
    pub quality_score: u32,
    pub timestamp: DateTime<Utc>,
    pub language: String,
}

impl From<&Excuse> for HistoryRecord {
    fn from(excuse: &Excuse) -> Self {
        Self {
            text: excuse.text.clone(),
            recommendation: excuse.recommendation.clone(),
            severity: excuse.severity,
            category: excuse.category.clone(),
            quality_score: excuse.quality_score,
            timestamp: excuse.timestamp,
            language: excuse.language.clone(),
        }
    }
}

/// Append-only, insertion-ordered log of excuses.
///
/// Entries are shared with the caller rather than copied. Not synchronized;
/// wrap in a lock if several threads append.
#[derive(Debug, Clone, Default)]
pub struct ExcuseHistory {
    entries: Vec<Arc<Excuse>>,
}

impl ExcuseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, excuse: Arc<Excuse>) {
        self.entries.push(excuse);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Excuse>> {
        self.entries.iter()
    }

    /// Highest quality score; the earliest entry wins ties.
    pub fn best(&self) -> Option<&Arc<Excuse>> {
        self.entries.iter().rev().max_by_key(|e| e.quality_score)
    }

    /// Up to `n` entries by descending quality score, ties in insertion order.
    pub fn top_by_quality(&self, n: usize) -> Vec<&Arc<Excuse>> {
        let mut sorted: Vec<&Arc<Excuse>> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.quality_score.cmp(&a.quality_score));
        sorted.truncate(n);
        sorted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.entries.iter().map(|e| HistoryRecord::from(e.as_ref())).collect()
    }

    pub fn export(&self, format: ExportFormat) -> Result<String, FormatError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&self.records())?),
            ExportFormat::Text => Ok(self
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    format!(
                        "Excuse #{} (Score: {}/100):\n{}\nRecommendation: {}",
                        i + 1,
                        e.quality_score,
                        e.text,
                        e.recommendation
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")),
        }
    }

    /// Parse a JSON export back into records.
    pub fn parse_json(input: &str) -> Result<Vec<HistoryRecord>, FormatError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// A generator paired with the history of what it produced.
#[derive(Debug, Clone)]
pub struct ExcuseSession {
    generator: ExcuseGenerator,
    history: ExcuseHistory,
}

impl ExcuseSession {
    pub fn new(generator: ExcuseGenerator) -> Self {
        Self {
            generator,
            history: ExcuseHistory::new(),
        }
    }

    pub fn generator(&self) -> &ExcuseGenerator {
        &self.generator
    }

    pub fn history(&self) -> &ExcuseHistory {
        &self.history
    }

    /// Generate an excuse, appending it to the history when `save` is set.
    pub fn generate(
        &mut self,
        error_message: &str,
        context: Option<&str>,
        category: Option<&str>,
        save: bool,
    ) -> Result<Arc<Excuse>, PipelineError> {
        let excuse = Arc::new(self.generator.generate(error_message, context, category)?);
        if save {
            self.history.push(Arc::clone(&excuse));
        }
        Ok(excuse)
    }

    pub fn best(&self) -> Option<&Arc<Excuse>> {
        self.history.best()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn export_history(&self, format: &str) -> Result<String, FormatError> {
        self.history.export(format.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::excuse::ExcuseMetadata;

    fn excuse(text: &str, score: u32) -> Arc<Excuse> {
        Arc::new(Excuse {
            text: text.to_string(),
            recommendation: "Wait it out".to_string(),
            severity: SeverityTier::Medium,
            category: "cosmic".to_string(),
            quality_score: score,
            quantum_probability: 0.5,
            language: "en".to_string(),
            timestamp: Utc::now(),
            metadata: ExcuseMetadata {
                secondary_category: "ai".to_string(),
                markov_component: String::new(),
                context: None,
                error_message: String::new(),
            },
        })
    }

    #[test]
    fn best_prefers_earliest_on_tie() {
        let mut history = ExcuseHistory::new();
        history.push(excuse("a", 40));
        history.push(excuse("b", 70));
        history.push(excuse("c", 70));
        assert_eq!(history.best().unwrap().text, "b");
    }

    #[test]
    fn best_of_empty_is_none() {
        assert!(ExcuseHistory::new().best().is_none());
    }

    #[test]
    fn push_shares_entries() {
        let mut history = ExcuseHistory::new();
        let e = excuse("a", 1);
        history.push(Arc::clone(&e));
        assert!(Arc::ptr_eq(&e, history.iter().next().unwrap()));
    }

    #[test]
    fn top_by_quality_orders_and_truncates() {
        let mut history = ExcuseHistory::new();
        for (text, score) in [("a", 10), ("b", 90), ("c", 50), ("d", 90)] {
            history.push(excuse(text, score));
        }
        let top: Vec<&str> = history.top_by_quality(3).iter().map(|e| e.text.as_str()).collect();
        assert_eq!(top, vec!["b", "d", "c"]);
    }

    #[test]
    fn text_export_format() {
        let mut history = ExcuseHistory::new();
        history.push(excuse("first", 12));
        history.push(excuse("second", 34));
        let text = history.export(ExportFormat::Text).unwrap();
        assert_eq!(
            text,
            "Excuse #1 (Score: 12/100):\nfirst\nRecommendation: Wait it out\n\n\
             Excuse #2 (Score: 34/100):\nsecond\nRecommendation: Wait it out"
        );
    }

    #[test]
    fn unknown_export_format_is_rejected() {
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(FormatError::InvalidFormat(ref f)) if f == "xml"
        ));
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ExcuseHistory::new();
        history.push(excuse("a", 1));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.export(ExportFormat::Json).unwrap(), "[]");
    }
}
