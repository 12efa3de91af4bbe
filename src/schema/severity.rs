use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity classification of an error message.
///
/// Ordered `Mild < Medium < Severe`; the derived `Ord` follows declaration
/// order and agrees with [`SeverityTier::ordinal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Mild,
    Medium,
    Severe,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 3] = [Self::Mild, Self::Medium, Self::Severe];

    /// Position in the mild < medium < severe ordering.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Mild => 0,
            Self::Medium => 1,
            Self::Severe => 2,
        }
    }

    /// Score contributed by each regex pattern hit in this tier.
    pub fn pattern_weight(self) -> u32 {
        match self {
            Self::Mild => 1,
            Self::Medium => 3,
            Self::Severe => 5,
        }
    }

    /// Score contributed by each keyword hit in this tier.
    pub fn keyword_weight(self) -> u32 {
        match self {
            Self::Mild => 1,
            Self::Medium => 2,
            Self::Severe => 3,
        }
    }

    /// Returns the lowercase name used in data files and exports.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Medium => "medium",
            Self::Severe => "severe",
        }
    }

    /// Lenient lookup by tier name. Unknown names yield `None`, which
    /// callers treat as a zero-weight tier.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mild" => Some(Self::Mild),
            "medium" => Some(Self::Medium),
            "severe" => Some(Self::Severe),
            _ => None,
        }
    }

    /// Pick the highest tier from a sequence of hits.
    pub fn highest<I>(tiers: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        tiers.into_iter().max_by_key(|t| t.ordinal())
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
