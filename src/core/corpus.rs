/// Phrase corpus: category-keyed excuse fragments and their fallbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::severity::SeverityTier;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("language '{0}' is not supported")]
    LanguageNotSupported(String),
    #[error("failed to load corpus from {}: {reason}", .path.display())]
    DataLoad { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Languages with phrase data compiled into the crate.
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "bn"];

/// Categories that hold auxiliary phrases and never serve as an excuse source.
pub const RESERVED_CATEGORIES: [&str; 3] = ["recommendations", "connectors", "intensifiers"];

/// Categories a complete corpus is expected to carry.
pub const EXPECTED_CATEGORIES: [&str; 8] = [
    "quantum",
    "cosmic",
    "ai",
    "technical",
    "blame",
    "recommendations",
    "connectors",
    "intensifiers",
];

/// File name of a language's corpus inside its data directory.
pub const CORPUS_FILE: &str = "corpus.ron";

pub const DEFAULT_CONNECTOR: &str = "which caused";
pub const DEFAULT_RECOMMENDATION: &str = "Try turning it off and on again";

mod data {
    pub const EN: &str = include_str!("../../corpus_data/en/corpus.ron");
    pub const BN: &str = include_str!("../../corpus_data/bn/corpus.ron");
}

/// Whether `name` is one of [`RESERVED_CATEGORIES`].
pub fn is_reserved(name: &str) -> bool {
    RESERVED_CATEGORIES.contains(&name)
}

/// Severity-keyed intensifier words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Intensifiers {
    #[serde(default)]
    pub mild: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub severe: Vec<String>,
}

impl Intensifiers {
    pub fn get(&self, tier: SeverityTier) -> &[String] {
        match tier {
            SeverityTier::Mild => &self.mild,
            SeverityTier::Medium => &self.medium,
            SeverityTier::Severe => &self.severe,
        }
    }

    fn get_mut(&mut self, tier: SeverityTier) -> &mut Vec<String> {
        match tier {
            SeverityTier::Mild => &mut self.mild,
            SeverityTier::Medium => &mut self.medium,
            SeverityTier::Severe => &mut self.severe,
        }
    }

    /// Single-word default for a tier.
    pub fn default_word(tier: SeverityTier) -> &'static str {
        match tier {
            SeverityTier::Mild => "slightly",
            SeverityTier::Medium => "definitely",
            SeverityTier::Severe => "catastrophically",
        }
    }
}

// On-disk shape of a corpus file.
#[derive(Debug, Deserialize)]
#[serde(rename = "Corpus")]
struct RonCorpus {
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    intensifiers: Intensifiers,
}

fn default_language() -> String {
    "en".to_string()
}

/// Read-only phrase data for one language.
///
/// Construction always runs the fallback pass, so `connectors`,
/// `recommendations` and every intensifier tier are non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    language: String,
    categories: BTreeMap<String, Vec<String>>,
    intensifiers: Intensifiers,
    warnings: Vec<String>,
}

impl Corpus {
    pub fn new(
        language: &str,
        categories: BTreeMap<String, Vec<String>>,
        intensifiers: Intensifiers,
    ) -> Self {
        let mut corpus = Self {
            language: language.to_string(),
            categories,
            intensifiers,
            warnings: Vec::new(),
        };
        corpus.ensure_fallbacks();
        corpus
    }

    /// Load the phrase data compiled into the crate.
    pub fn builtin(language: &str) -> Result<Corpus, CorpusError> {
        let source = match language {
            "en" => data::EN,
            "bn" => data::BN,
            other => return Err(CorpusError::LanguageNotSupported(other.to_string())),
        };
        match Self::parse_ron(source) {
            Ok(mut corpus) => {
                corpus.language = language.to_string();
                Ok(corpus)
            }
            Err(e) => {
                warn!(language, error = %e, "built-in corpus unreadable, using fallback data");
                let mut corpus = Self::fallback(language);
                corpus.warnings.push(e.to_string());
                Ok(corpus)
            }
        }
    }

    /// Load a language either from `data_dir/<language>/corpus.ron` or, with
    /// no directory, from the built-in data.
    ///
    /// A missing language directory is a hard error. A missing or
    /// unparsable corpus file is recorded as a warning and replaced with
    /// fallback data.
    pub fn load(language: &str, data_dir: Option<&Path>) -> Result<Corpus, CorpusError> {
        let Some(dir) = data_dir else {
            return Self::builtin(language);
        };

        let lang_dir = dir.join(language);
        if !lang_dir.is_dir() {
            return Err(CorpusError::LanguageNotSupported(language.to_string()));
        }

        let path = lang_dir.join(CORPUS_FILE);
        match Self::load_file(&path) {
            Ok(mut corpus) => {
                corpus.language = language.to_string();
                info!(
                    language,
                    categories = corpus.categories.len(),
                    "loaded corpus from {}",
                    path.display()
                );
                Ok(corpus)
            }
            Err(e) => {
                warn!(language, error = %e, "using fallback corpus");
                let mut corpus = Self::fallback(language);
                corpus.warnings.push(e.to_string());
                Ok(corpus)
            }
        }
    }

    /// Strictly load a single corpus file.
    pub fn load_file(path: &Path) -> Result<Corpus, CorpusError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CorpusError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse_ron(&contents).map_err(|e| CorpusError::DataLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Parse a corpus from a RON string, then apply fallbacks.
    pub fn parse_ron(input: &str) -> Result<Corpus, CorpusError> {
        let raw: RonCorpus = ron::from_str(input)?;
        let mut corpus = Self {
            language: raw.language,
            categories: raw.categories,
            intensifiers: raw.intensifiers,
            warnings: Vec::new(),
        };
        corpus.ensure_fallbacks();
        Ok(corpus)
    }

    /// A minimal corpus with one phrase per expected category.
    pub fn fallback(language: &str) -> Corpus {
        let categories = [
            ("quantum", "quantum interference"),
            ("cosmic", "cosmic ray interference"),
            ("ai", "AI malfunction"),
            ("technical", "technical difficulties"),
            ("blame", "unexpected behavior"),
            ("recommendations", DEFAULT_RECOMMENDATION),
            ("connectors", DEFAULT_CONNECTOR),
        ]
        .into_iter()
        .map(|(name, phrase)| (name.to_string(), vec![phrase.to_string()]))
        .collect();
        let intensifiers = Intensifiers {
            mild: vec![Intensifiers::default_word(SeverityTier::Mild).to_string()],
            medium: vec![Intensifiers::default_word(SeverityTier::Medium).to_string()],
            severe: vec![Intensifiers::default_word(SeverityTier::Severe).to_string()],
        };
        Self::new(language, categories, intensifiers)
    }

    /// Substitute single-item defaults for missing auxiliary data.
    fn ensure_fallbacks(&mut self) {
        for (name, default) in [
            ("connectors", DEFAULT_CONNECTOR),
            ("recommendations", DEFAULT_RECOMMENDATION),
        ] {
            let list = self.categories.entry(name.to_string()).or_default();
            if list.is_empty() {
                warn!(category = name, "missing auxiliary phrases, using default");
                self.warnings.push(format!("category '{name}' missing, using default"));
                list.push(default.to_string());
            }
        }

        // Intensifiers live in their own field; a stray flat list under that
        // name carries no tier information.
        if self.categories.remove("intensifiers").is_some() {
            warn!("flat 'intensifiers' list ignored");
            self.warnings
                .push("category 'intensifiers' is not tier-keyed, ignored".to_string());
        }

        for tier in SeverityTier::ALL {
            let list = self.intensifiers.get_mut(tier);
            if list.is_empty() {
                warn!(%tier, "missing intensifiers, using default");
                self.warnings
                    .push(format!("intensifiers for '{tier}' missing, using default"));
                list.push(Intensifiers::default_word(tier).to_string());
            }
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// All category names, reserved ones included, in sorted order.
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn phrases(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn connectors(&self) -> &[String] {
        self.phrases("connectors").unwrap_or_default()
    }

    pub fn recommendations(&self) -> &[String] {
        self.phrases("recommendations").unwrap_or_default()
    }

    pub fn intensifiers(&self, tier: SeverityTier) -> &[String] {
        self.intensifiers.get(tier)
    }

    /// Whether `category` can serve as an excuse source.
    pub fn is_usable(&self, category: &str) -> bool {
        !is_reserved(category) && self.phrases(category).is_some_and(|p| !p.is_empty())
    }

    /// Non-reserved, non-empty categories other than `exclude`, sorted.
    pub fn usable_categories(&self, exclude: Option<&str>) -> Vec<&str> {
        self.category_names()
            .filter(|name| Some(*name) != exclude && self.is_usable(name))
            .collect()
    }

    /// Non-fatal problems recorded while loading.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Per-category health: `true` when the category is present and
    /// non-empty in the file at `data_dir/<language>/corpus.ron`.
    pub fn validate(data_dir: &Path, language: &str) -> BTreeMap<String, bool> {
        let path = data_dir.join(language).join(CORPUS_FILE);
        let raw = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| ron::from_str::<RonCorpus>(&contents).ok());

        EXPECTED_CATEGORIES
            .iter()
            .map(|name| {
                let ok = match (&raw, *name) {
                    (None, _) => false,
                    (Some(raw), "intensifiers") => SeverityTier::ALL
                        .iter()
                        .all(|t| !raw.intensifiers.get(*t).is_empty()),
                    (Some(raw), name) => raw.categories.get(name).is_some_and(|p| !p.is_empty()),
                };
                (name.to_string(), ok)
            })
            .collect()
    }

    /// Language directories present under `data_dir`, sorted. Directories
    /// starting with `_` are skipped.
    pub fn available_languages(data_dir: &Path) -> Result<Vec<String>, CorpusError> {
        let mut languages = Vec::new();
        for entry in std::fs::read_dir(data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('_') {
                languages.push(name);
            }
        }
        languages.sort();
        Ok(languages)
    }
}
