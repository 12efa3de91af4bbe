/// The excuse pipeline: error message → severity → phrases → excuse.
///
/// Wires together the severity analyzer, corpus selection, Markov fill,
/// template assembly and quality scoring.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::analyzer::{AnalyzerError, ScoringRules, SeverityAnalyzer};
use crate::core::corpus::{
    Corpus, CorpusError, Intensifiers, DEFAULT_CONNECTOR, DEFAULT_RECOMMENDATION,
};
use crate::core::formatter::{ExcuseFormatter, ExcuseParts, FormatError, HaikuFormatter};
use crate::core::markov::MarkovChain;
use crate::schema::excuse::{Excuse, ExcuseMetadata};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("scoring rules error: {0}")]
    ScoringRules(#[from] AnalyzerError),
    #[error("corpus has {found} usable excuse categories, at least 2 are required")]
    InsufficientCategories { found: usize },
}

/// Words that earn a +5 quality bonus, matched case-insensitively.
pub const BONUS_KEYWORDS: [&str; 5] = ["quantum", "cosmic", "AI", "blockchain", "neural"];

/// Categories whose phrases train the generator's Markov chain.
pub const MARKOV_SOURCE_CATEGORIES: [&str; 3] = ["quantum", "technical", "ai"];

/// Token count of the Markov fragment in each excuse.
pub const MARKOV_PHRASE_LENGTH: usize = 5;

pub const DEFAULT_MIN_SCORE_ATTEMPTS: usize = 50;

/// Canned inputs for batch generation.
pub const SAMPLE_ERRORS: [&str; 8] = [
    "FATAL ERROR: Everything is broken!",
    "SegmentationFault: Core dumped",
    "NullPointerException at line infinity",
    "KeyError: 'success'",
    "RuntimeError: Unknown error occurred",
    "ValueError: Invalid value",
    "TypeError: Type mismatch",
    "MemoryError: Out of memory",
];

const HAIKU_SOURCES: [(&str, &str); 3] = [
    ("quantum", "Quantum states collapse"),
    ("cosmic", "The cosmos interferes today"),
    ("ai", "AI has gone rogue"),
];

static CALL_COUNTER: AtomicU64 = AtomicU64::new(0);
static PROCESS_START: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Derive a call-unique 64-bit value for quality scoring.
///
/// Hashes the message together with wall-clock and monotonic time, process
/// and thread identity, and a global call counter. The result never seeds an
/// RNG.
pub fn quantum_seed(message: &str) -> u64 {
    let wall_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mono_ns = PROCESS_START.elapsed().as_nanos();
    let counter = CALL_COUNTER.fetch_add(1, Ordering::Relaxed);
    let material = format!(
        "{message}|{wall_ns}|{mono_ns}|{}|{:?}|{counter}",
        std::process::id(),
        std::thread::current().id()
    );

    let hash = blake3::hash(material.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_be_bytes(bytes)
}

/// `clamp((chars(text) * seed) mod 100, 1, 100)` plus 5 per bonus keyword,
/// capped at 100.
pub fn quality_score(text: &str, seed: u64) -> u32 {
    let base = (text.chars().count() as u128 * seed as u128) % 100;
    let mut score = (base as u32).clamp(1, 100);

    let lower = text.to_lowercase();
    for keyword in BONUS_KEYWORDS {
        if lower.contains(&keyword.to_lowercase()) {
            score = (score + 5).min(100);
        }
    }
    score
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &'a [String], default: &'a str) -> &'a str {
    items.choose(rng).map(String::as_str).unwrap_or(default)
}

/// The top-level excuse generator. Built via `ExcuseGenerator::builder()`.
///
/// Immutable after construction; `generate` takes `&self` and draws from a
/// per-call RNG, so one generator can be shared across threads.
#[derive(Debug, Clone)]
pub struct ExcuseGenerator {
    language: String,
    corpus: Corpus,
    analyzer: SeverityAnalyzer,
    markov: MarkovChain,
    formatter: ExcuseFormatter,
    haiku: HaikuFormatter,
}

/// Builder for constructing an `ExcuseGenerator`.
pub struct ExcuseGeneratorBuilder {
    language: String,
    corpus_dir: Option<PathBuf>,
    scoring_rules_path: Option<PathBuf>,
    markov_order: usize,
    max_excuse_length: Option<usize>,
    /// Directly provided corpus (for testing without files).
    corpus: Option<Corpus>,
    /// Directly provided scoring rules.
    scoring_rules: Option<ScoringRules>,
}

impl ExcuseGenerator {
    pub fn builder() -> ExcuseGeneratorBuilder {
        ExcuseGeneratorBuilder {
            language: "en".to_string(),
            corpus_dir: None,
            scoring_rules_path: None,
            markov_order: 1,
            max_excuse_length: None,
            corpus: None,
            scoring_rules: None,
        }
    }

    /// Generator over the built-in corpus for `language`.
    pub fn new(language: &str) -> Result<ExcuseGenerator, PipelineError> {
        Self::builder().language(language).build()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn analyzer(&self) -> &SeverityAnalyzer {
        &self.analyzer
    }

    pub fn markov(&self) -> &MarkovChain {
        &self.markov
    }

    /// Generate one excuse for `error_message`.
    ///
    /// `category` is a hint: a usable category name is honoured, anything
    /// else falls back to a random draw.
    pub fn generate(
        &self,
        error_message: &str,
        context: Option<&str>,
        category: Option<&str>,
    ) -> Result<Excuse, PipelineError> {
        self.generate_with_rng(&mut rand::thread_rng(), error_message, context, category)
    }

    /// [`generate`](Self::generate) with caller-supplied randomness for
    /// selections. The quality seed is still derived per call.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        error_message: &str,
        context: Option<&str>,
        category: Option<&str>,
    ) -> Result<Excuse, PipelineError> {
        let severity = self.analyzer.analyze(error_message);
        let seed = quantum_seed(error_message);

        let primary_category = self.select_primary(rng, category)?;
        let primary_excuse = pick(
            rng,
            self.corpus.phrases(primary_category).unwrap_or_default(),
            "",
        );

        let secondary_pool = self.corpus.usable_categories(Some(primary_category));
        let Some(secondary_category) = secondary_pool.choose(rng).copied() else {
            return Err(PipelineError::InsufficientCategories {
                found: self.corpus.usable_categories(None).len(),
            });
        };
        let secondary_excuse = pick(
            rng,
            self.corpus.phrases(secondary_category).unwrap_or_default(),
            "",
        );

        let intensifier = pick(
            rng,
            self.corpus.intensifiers(severity),
            Intensifiers::default_word(severity),
        );
        let connector = pick(rng, self.corpus.connectors(), DEFAULT_CONNECTOR);
        let markov_phrase = self.markov.generate(rng, MARKOV_PHRASE_LENGTH, None);

        let text = self.formatter.format_excuse(&ExcuseParts {
            primary_excuse,
            secondary_excuse,
            intensifier,
            connector,
            markov_phrase: &markov_phrase,
        });
        let recommendation = pick(rng, self.corpus.recommendations(), DEFAULT_RECOMMENDATION);
        let quality_score = quality_score(&text, seed);

        debug!(
            %severity,
            category = primary_category,
            secondary = secondary_category,
            quality_score,
            "generated excuse"
        );

        Ok(Excuse {
            text,
            recommendation: recommendation.to_string(),
            severity,
            category: primary_category.to_string(),
            quality_score,
            quantum_probability: rng.gen::<f64>(),
            language: self.language.clone(),
            timestamp: chrono::Utc::now(),
            metadata: ExcuseMetadata {
                secondary_category: secondary_category.to_string(),
                markov_component: markov_phrase,
                context: context.map(str::to_string),
                error_message: error_message.to_string(),
            },
        })
    }

    fn select_primary<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        hint: Option<&str>,
    ) -> Result<&str, PipelineError> {
        if let Some(hint) = hint {
            if self.corpus.is_usable(hint) {
                return Ok(self
                    .corpus
                    .category_names()
                    .find(|name| *name == hint)
                    .unwrap_or_default());
            }
            debug!(hint, "category hint not usable, drawing at random");
        }

        let pool = self.corpus.usable_categories(None);
        pool.choose(rng)
            .copied()
            .ok_or(PipelineError::InsufficientCategories { found: 0 })
    }

    /// Generate `count` excuses from the canned sample errors, preferring
    /// distinct texts.
    ///
    /// After `10 * count` attempts without enough distinct texts, duplicates
    /// are accepted so the result always holds exactly `count` excuses.
    pub fn generate_batch(&self, count: usize) -> Result<Vec<Excuse>, PipelineError> {
        self.generate_batch_with_rng(&mut rand::thread_rng(), count)
    }

    pub fn generate_batch_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<Excuse>, PipelineError> {
        let mut excuses = Vec::with_capacity(count);
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let budget = count.saturating_mul(10);

        let mut attempts = 0;
        while excuses.len() < count && attempts < budget {
            attempts += 1;
            let error = SAMPLE_ERRORS.choose(rng).copied().unwrap_or_default();
            let excuse = self.generate_with_rng(rng, error, None, None)?;
            if seen.insert(excuse.text.clone()) {
                excuses.push(excuse);
            }
        }

        if excuses.len() < count {
            warn!(
                distinct = excuses.len(),
                requested = count,
                "attempt budget exhausted, accepting duplicate excuses"
            );
        }
        while excuses.len() < count {
            let error = SAMPLE_ERRORS.choose(rng).copied().unwrap_or_default();
            excuses.push(self.generate_with_rng(rng, error, None, None)?);
        }

        Ok(excuses)
    }

    /// Render one quantum, cosmic and AI phrase as a three-line haiku.
    pub fn generate_haiku(&self, error_message: &str) -> String {
        self.generate_haiku_with_rng(&mut rand::thread_rng(), error_message)
    }

    pub fn generate_haiku_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        error_message: &str,
    ) -> String {
        debug!(error_message, "generating haiku");
        let [first, second, third] = HAIKU_SOURCES.map(|(category, default)| {
            self.corpus
                .phrases(category)
                .and_then(|phrases| phrases.choose(rng))
                .map(String::as_str)
                .unwrap_or(default)
        });
        self.haiku.format_haiku([first, second, third])
    }

    /// Regenerate until the quality score reaches `min_score`, for at most
    /// `max_attempts` tries. The last attempt is returned if none qualifies.
    pub fn generate_with_min_score(
        &self,
        error_message: &str,
        category: Option<&str>,
        min_score: u32,
        max_attempts: usize,
    ) -> Result<Excuse, PipelineError> {
        let mut excuse = self.generate(error_message, None, category)?;
        for _ in 1..max_attempts.max(1) {
            if excuse.quality_score >= min_score {
                break;
            }
            excuse = self.generate(error_message, None, category)?;
        }
        if excuse.quality_score < min_score {
            debug!(
                min_score,
                got = excuse.quality_score,
                "minimum score not reached, keeping last attempt"
            );
        }
        Ok(excuse)
    }
}

impl ExcuseGeneratorBuilder {
    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    /// Load `<dir>/<language>/corpus.ron` instead of the built-in data.
    pub fn corpus_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.corpus_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load scoring rules from a RON file.
    pub fn scoring_rules_file(mut self, path: impl AsRef<Path>) -> Self {
        self.scoring_rules_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Markov chain order; values below 1 are raised to 1.
    pub fn markov_order(mut self, order: usize) -> Self {
        self.markov_order = order;
        self
    }

    /// Truncate assembled excuse text to this many characters.
    pub fn max_excuse_length(mut self, max: usize) -> Self {
        self.max_excuse_length = Some(max);
        self
    }

    /// Provide a corpus directly (for testing without files).
    pub fn with_corpus(mut self, corpus: Corpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Provide scoring rules directly.
    pub fn with_scoring_rules(mut self, rules: ScoringRules) -> Self {
        self.scoring_rules = Some(rules);
        self
    }

    pub fn build(self) -> Result<ExcuseGenerator, PipelineError> {
        let corpus = match self.corpus {
            Some(corpus) => corpus,
            None => Corpus::load(&self.language, self.corpus_dir.as_deref())?,
        };

        let usable = corpus.usable_categories(None).len();
        if usable < 2 {
            return Err(PipelineError::InsufficientCategories { found: usable });
        }

        let rules = match (self.scoring_rules, self.scoring_rules_path) {
            (Some(rules), _) => rules,
            (None, Some(path)) => ScoringRules::load_from_ron(&path)?,
            (None, None) => ScoringRules::default(),
        };

        let mut markov = MarkovChain::new(self.markov_order);
        markov.reset();
        let words: Vec<&str> = MARKOV_SOURCE_CATEGORIES
            .iter()
            .filter_map(|category| corpus.phrases(category))
            .flatten()
            .flat_map(|phrase| phrase.split_whitespace())
            .collect();
        markov.train(&words);

        info!(
            language = corpus.language(),
            categories = usable,
            markov_keys = markov.len(),
            "excuse generator ready"
        );

        Ok(ExcuseGenerator {
            language: corpus.language().to_string(),
            analyzer: SeverityAnalyzer::new(&rules),
            corpus,
            markov,
            formatter: ExcuseFormatter::new(self.max_excuse_length),
            haiku: HaikuFormatter,
        })
    }
}
