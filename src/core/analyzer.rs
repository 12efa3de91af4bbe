/// Severity analyzer: weighted keyword and pattern scoring.

use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::schema::severity::SeverityTier;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Total score at or above which a message is severe.
const SEVERE_THRESHOLD: f64 = 8.0;
/// Total score at or above which a message is medium.
const MEDIUM_THRESHOLD: f64 = 4.0;
/// Score contributed by each shouted (all-caps) word.
const SHOUT_WEIGHT: f64 = 0.5;

/// Keywords and patterns attached to one tier name.
///
/// The tier is kept as a string so that rule files may carry tiers the
/// analyzer does not know about; those contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRule {
    pub tier: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Immutable scoring configuration for a [`SeverityAnalyzer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRules {
    pub tiers: Vec<TierRule>,
    /// All-caps tokens that do not count as shouting.
    #[serde(default)]
    pub uppercase_exclusions: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierRule {
                    tier: "severe".to_string(),
                    keywords: strings(&[
                        "fatal", "critical", "crash", "panic", "doom", "catastrophic",
                        "emergency", "disaster", "meltdown", "apocalypse", "dead",
                        "explosion", "fire", "burning", "destroyed", "corrupted",
                        "segmentation", "core dump", "kernel panic",
                    ]),
                    patterns: strings(&[
                        r"FATAL",
                        r"CRITICAL",
                        r"PANIC",
                        r"EMERGENCY",
                        r"!!!+",
                        r"SYSTEM.*DOWN",
                        r"KERNEL.*PANIC",
                        r"SEGMENTATION.*FAULT",
                        r"CORE.*DUMP",
                    ]),
                },
                TierRule {
                    tier: "medium".to_string(),
                    keywords: strings(&[
                        "error", "fail", "failed", "exception", "problem", "issue",
                        "broken", "invalid", "denied", "refused", "timeout", "overflow",
                        "leak", "violation", "conflict", "missing", "undefined",
                        "null pointer", "not found",
                    ]),
                    patterns: strings(&[
                        r"\bERROR\b",
                        r"EXCEPTION",
                        r"FAILED",
                        r"!!",
                        r"\bFAIL\b",
                        r"NULL.*POINTER",
                        r"STACK.*OVERFLOW",
                        r"MEMORY.*LEAK",
                    ]),
                },
                TierRule {
                    tier: "mild".to_string(),
                    keywords: strings(&[
                        "warning", "warn", "deprecated", "notice", "info", "debug",
                        "trace", "minor", "slight", "temporary", "recoverable", "retry",
                        "pending", "delayed", "obsolete", "legacy",
                    ]),
                    patterns: strings(&[
                        r"\bWARN(ING)?\b",
                        r"\bINFO\b",
                        r"DEBUG",
                        r"NOTICE",
                        r"DEPRECATED",
                        r"TRACE",
                        r"\bretry",
                        r"pending",
                    ]),
                },
            ],
            uppercase_exclusions: strings(&["CPU", "RAM", "API", "URL", "ID"]),
        }
    }
}

impl ScoringRules {
    /// Load scoring rules from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ScoringRules, AnalyzerError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse scoring rules from a RON string.
    pub fn parse_ron(input: &str) -> Result<ScoringRules, AnalyzerError> {
        Ok(ron::from_str(input)?)
    }
}

/// A compiled case-insensitive pattern with its source text.
#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

#[derive(Debug, Clone)]
struct CompiledTier {
    tier: Option<SeverityTier>,
    keywords: Vec<String>,
    patterns: Vec<CompiledPattern>,
}

/// Diagnostic breakdown of a single analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityDetails {
    pub severity: SeverityTier,
    pub matched_keywords: Vec<String>,
    pub matched_patterns: Vec<String>,
    pub exclamation_count: usize,
    pub uppercase_ratio: f64,
    pub message_length: usize,
}

/// Classifies error messages into mild, medium or severe.
#[derive(Debug, Clone)]
pub struct SeverityAnalyzer {
    tiers: Vec<CompiledTier>,
    uppercase_exclusions: FxHashSet<String>,
}

impl Default for SeverityAnalyzer {
    fn default() -> Self {
        Self::new(&ScoringRules::default())
    }
}

impl SeverityAnalyzer {
    /// Compile an analyzer from scoring rules. Patterns that fail to
    /// compile are skipped with a warning.
    pub fn new(rules: &ScoringRules) -> Self {
        let tiers = rules
            .tiers
            .iter()
            .map(|rule| {
                let tier = SeverityTier::from_name(&rule.tier);
                if tier.is_none() {
                    warn!(tier = %rule.tier, "unknown severity tier, its hits carry no weight");
                }
                let patterns = rule
                    .patterns
                    .iter()
                    .filter_map(|source| {
                        match RegexBuilder::new(source).case_insensitive(true).build() {
                            Ok(regex) => Some(CompiledPattern {
                                source: source.clone(),
                                regex,
                            }),
                            Err(e) => {
                                warn!(pattern = %source, error = %e, "skipping invalid severity pattern");
                                None
                            }
                        }
                    })
                    .collect();
                CompiledTier {
                    tier,
                    keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                    patterns,
                }
            })
            .collect();

        Self {
            tiers,
            uppercase_exclusions: rules.uppercase_exclusions.iter().cloned().collect(),
        }
    }

    /// Classify a message. Empty input is mild; never fails.
    pub fn analyze(&self, message: &str) -> SeverityTier {
        if message.is_empty() {
            return SeverityTier::Mild;
        }

        let (pattern_score, top_pattern) = self.score_patterns(message);

        // Strong unambiguous pattern signals win outright.
        match top_pattern {
            Some(SeverityTier::Severe) if pattern_score >= 5 => return SeverityTier::Severe,
            Some(SeverityTier::Mild) if pattern_score <= 2 => return SeverityTier::Mild,
            _ => {}
        }

        let total = pattern_score as f64
            + self.score_keywords(&message.to_lowercase()) as f64
            + score_exclamations(message) as f64
            + self.score_uppercase(message);

        score_to_severity(total)
    }

    /// Detailed breakdown; `severity` always equals `analyze(message)`.
    pub fn severity_details(&self, message: &str) -> SeverityDetails {
        let severity = self.analyze(message);
        let lower = message.to_lowercase();

        let matched_keywords = self
            .tiers
            .iter()
            .flat_map(|t| t.keywords.iter())
            .filter(|kw| lower.contains(kw.as_str()))
            .cloned()
            .collect();

        let matched_patterns = self
            .tiers
            .iter()
            .flat_map(|t| t.patterns.iter())
            .filter(|p| p.regex.is_match(message))
            .map(|p| p.source.clone())
            .collect();

        let message_length = message.chars().count();
        let uppercase = message.chars().filter(|c| c.is_uppercase()).count();

        SeverityDetails {
            severity,
            matched_keywords,
            matched_patterns,
            exclamation_count: message.matches('!').count(),
            uppercase_ratio: uppercase as f64 / message_length.max(1) as f64,
            message_length,
        }
    }

    /// Sum of pattern weights and the highest tier that matched.
    fn score_patterns(&self, message: &str) -> (u32, Option<SeverityTier>) {
        let mut score = 0;
        let mut hits = Vec::new();
        for tier in &self.tiers {
            for pattern in &tier.patterns {
                if pattern.regex.is_match(message) {
                    score += tier.tier.map_or(0, SeverityTier::pattern_weight);
                    hits.extend(tier.tier);
                }
            }
        }
        (score, SeverityTier::highest(hits))
    }

    fn score_keywords(&self, lower: &str) -> u32 {
        self.tiers
            .iter()
            .map(|tier| {
                let weight = tier.tier.map_or(0, SeverityTier::keyword_weight);
                tier.keywords
                    .iter()
                    .filter(|kw| lower.contains(kw.as_str()))
                    .count() as u32
                    * weight
            })
            .sum()
    }

    fn score_uppercase(&self, message: &str) -> f64 {
        let shouted = message
            .split_whitespace()
            .filter(|w| {
                is_shouted(w) && w.chars().count() > 2 && !self.uppercase_exclusions.contains(*w)
            })
            .count();
        shouted as f64 * SHOUT_WEIGHT
    }
}

/// A word is shouted when it has cased letters and none are lowercase.
fn is_shouted(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

fn score_exclamations(message: &str) -> u32 {
    match message.matches('!').count() {
        0 => 0,
        1 => 1,
        2 => 2,
        _ => 3,
    }
}

fn score_to_severity(score: f64) -> SeverityTier {
    if score >= SEVERE_THRESHOLD {
        SeverityTier::Severe
    } else if score >= MEDIUM_THRESHOLD {
        SeverityTier::Medium
    } else {
        SeverityTier::Mild
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_messages_are_mild() {
        let analyzer = SeverityAnalyzer::default();
        assert_eq!(analyzer.analyze(""), SeverityTier::Mild);
        assert_eq!(analyzer.analyze("   \t\n"), SeverityTier::Mild);
    }

    #[test]
    fn severe_pattern_short_circuits() {
        let analyzer = SeverityAnalyzer::default();
        assert_eq!(analyzer.analyze("fatal"), SeverityTier::Severe);
        assert_eq!(analyzer.analyze("segmentation fault"), SeverityTier::Severe);
    }

    #[test]
    fn mild_pattern_short_circuits_before_keywords() {
        let analyzer = SeverityAnalyzer::default();
        // "deprecated" and "warning" would add keyword weight, but the two
        // mild pattern hits (score 2) end the analysis first.
        assert_eq!(
            analyzer.analyze("Warning: deprecated function"),
            SeverityTier::Mild
        );
    }

    #[test]
    fn keywords_and_heuristics_accumulate() {
        let analyzer = SeverityAnalyzer::default();
        // \bERROR\b pattern (3) + "error" keyword (2) = 5 → medium.
        assert_eq!(analyzer.analyze("error here"), SeverityTier::Medium);
    }

    #[test]
    fn exclamation_scoring_caps_at_three() {
        assert_eq!(score_exclamations("calm"), 0);
        assert_eq!(score_exclamations("a!"), 1);
        assert_eq!(score_exclamations("a!!"), 2);
        assert_eq!(score_exclamations("a!!!!!!"), 3);
    }

    #[test]
    fn shouting_skips_acronyms_and_short_words() {
        let analyzer = SeverityAnalyzer::default();
        assert_eq!(analyzer.score_uppercase("CPU RAM API URL ID OK"), 0.0);
        assert_eq!(analyzer.score_uppercase("WHY IS THIS HAPPENING"), 1.5);
        assert_eq!(analyzer.score_uppercase("DISK: on fire"), 0.5);
    }

    #[test]
    fn unknown_tier_contributes_nothing() {
        let rules = ScoringRules {
            tiers: vec![TierRule {
                tier: "cosmic".to_string(),
                keywords: vec!["boom".to_string()],
                patterns: vec!["BOOM".to_string()],
            }],
            uppercase_exclusions: Vec::new(),
        };
        let analyzer = SeverityAnalyzer::new(&rules);
        assert_eq!(analyzer.score_patterns("boom"), (0, None));
        assert_eq!(analyzer.score_keywords("boom"), 0);
        assert_eq!(analyzer.analyze("boom"), SeverityTier::Mild);
    }

    #[test]
    fn invalid_pattern_is_skipped() {
        let rules = ScoringRules {
            tiers: vec![TierRule {
                tier: "severe".to_string(),
                keywords: Vec::new(),
                patterns: vec!["(unclosed".to_string(), "BOOM".to_string()],
            }],
            uppercase_exclusions: Vec::new(),
        };
        let analyzer = SeverityAnalyzer::new(&rules);
        assert_eq!(analyzer.analyze("boom"), SeverityTier::Severe);
    }

    #[test]
    fn details_agree_with_analyze() {
        let analyzer = SeverityAnalyzer::default();
        let message = "FATAL ERROR: System crash!!!";
        let details = analyzer.severity_details(message);
        assert_eq!(details.severity, analyzer.analyze(message));
        assert_eq!(details.severity, SeverityTier::Severe);
        assert_eq!(details.exclamation_count, 3);
        assert_eq!(details.message_length, message.chars().count());
        assert!(details.matched_keywords.contains(&"fatal".to_string()));
        assert!(details.matched_keywords.contains(&"crash".to_string()));
        assert!(details.matched_patterns.contains(&"FATAL".to_string()));
        assert!(details.matched_patterns.contains(&"!!!+".to_string()));
    }

    #[test]
    fn details_on_empty_message() {
        let details = SeverityAnalyzer::default().severity_details("");
        assert_eq!(details.severity, SeverityTier::Mild);
        assert_eq!(details.uppercase_ratio, 0.0);
        assert_eq!(details.message_length, 0);
    }

    #[test]
    fn rules_ron_round_trip() {
        let rules = ScoringRules::default();
        let serialized = ron::to_string(&rules).unwrap();
        let parsed = ScoringRules::parse_ron(&serialized).unwrap();
        assert_eq!(parsed.tiers.len(), 3);
        assert_eq!(parsed.uppercase_exclusions.len(), 5);
    }
}
