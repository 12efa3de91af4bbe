use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::SeverityTier;

/// Supporting details recorded alongside a generated excuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcuseMetadata {
    /// Category the second clause was drawn from.
    pub secondary_category: String,
    /// Raw Markov fragment injected into the third sentence.
    pub markov_component: String,
    /// Free-form context supplied by the caller.
    #[serde(default)]
    pub context: Option<String>,
    /// The error message the excuse was generated for.
    pub error_message: String,
}

/// A single generated excuse. Created once per generation call and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excuse {
    pub text: String,
    pub recommendation: String,
    pub severity: SeverityTier,
    /// Primary category the main clause was drawn from.
    pub category: String,
    /// Arbitrary quality heuristic in `1..=100`.
    pub quality_score: u32,
    /// Cosmetic uniform draw in `[0, 1)`.
    pub quantum_probability: f64,
    pub language: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: ExcuseMetadata,
}
