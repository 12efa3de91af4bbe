/// Excuse text assembly and output renderers.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::schema::excuse::Excuse;
use crate::schema::severity::SeverityTier;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unsupported format: {0}")]
    InvalidFormat(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Truncate to at most `max_chars` characters, ending in `suffix` when cut.
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let suffix_len = suffix.chars().count();
    if max_chars <= suffix_len {
        return suffix.chars().take(max_chars).collect();
    }
    let mut out: String = text.chars().take(max_chars - suffix_len).collect();
    out.push_str(suffix);
    out
}

/// Strip control characters, collapse whitespace and cap the length.
pub fn sanitize_input(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_text(&collapsed, max_chars, "").trim().to_string()
}

/// The pieces one excuse sentence is assembled from.
#[derive(Debug, Clone, Copy)]
pub struct ExcuseParts<'a> {
    pub primary_excuse: &'a str,
    pub secondary_excuse: &'a str,
    pub intensifier: &'a str,
    pub connector: &'a str,
    pub markov_phrase: &'a str,
}

/// Renders excuse parts into the fixed three-sentence template.
#[derive(Debug, Clone, Default)]
pub struct ExcuseFormatter {
    pub max_length: Option<usize>,
}

impl ExcuseFormatter {
    pub fn new(max_length: Option<usize>) -> Self {
        Self { max_length }
    }

    /// `The error was {intensifier} caused by {primary}. {connector}
    /// {secondary}. Additionally, analysis shows {markov} instability.`
    ///
    /// The third sentence is omitted when the Markov phrase is empty.
    pub fn format_excuse(&self, parts: &ExcuseParts<'_>) -> String {
        let mut sentences = vec![
            format!(
                "The error was {} caused by {}",
                parts.intensifier, parts.primary_excuse
            ),
            format!("{} {}", parts.connector, parts.secondary_excuse),
        ];
        if !parts.markov_phrase.is_empty() {
            sentences.push(format!(
                "Additionally, analysis shows {} instability",
                parts.markov_phrase
            ));
        }

        let excuse = sentences.join(". ") + ".";
        match self.max_length {
            Some(max) => truncate_text(&excuse, max, "..."),
            None => excuse,
        }
    }

    /// Stack-trace flavoured variant showing up to three details.
    pub fn format_technical(&self, primary_excuse: &str, details: &[String]) -> String {
        let trace = details
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" → ");
        format!("Technical Analysis: {primary_excuse} | Stack trace: {trace}")
    }

    /// Status-page flavoured variant.
    pub fn format_corporate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        primary_excuse: &str,
        recommendation: &str,
    ) -> String {
        const TEMPLATES: [&str; 4] = [
            "We are currently experiencing {issue}. Our team is actively working on a resolution. {action}",
            "Due to {issue}, some users may experience degraded performance. {action}",
            "An unexpected {issue} has been identified. {action}",
            "We've detected {issue} affecting system stability. {action}",
        ];
        let template = TEMPLATES.choose(rng).copied().unwrap_or(TEMPLATES[0]);
        template
            .replace("{issue}", primary_excuse)
            .replace("{action}", recommendation)
    }
}

const FIVE_SYLLABLE_LINES: [&str; 8] = [
    "Bits flip in the void",
    "Quantum states collapse",
    "The cache has failed us",
    "Cosmic rays strike hard",
    "AI has gone rogue",
    "Errors cascade down",
    "System cries for help",
    "Memory leaks out",
];

const SEVEN_SYLLABLE_LINES: [&str; 7] = [
    "Digital tears fall like rain",
    "The servers are weeping now",
    "Kubernetes rebelling",
    "Distributed chaos reigns here",
    "The blockchain awakens now",
    "Neural networks dream of bugs",
    "Microservices conspire",
];

/// Approximate syllables per word when trimming haiku lines.
const SYLLABLES_PER_WORD: f64 = 1.3;

/// Three-line haiku rendering with word-count truncation.
#[derive(Debug, Clone, Default)]
pub struct HaikuFormatter;

impl HaikuFormatter {
    /// Trim each line to roughly 5, 7 and 5 syllables.
    pub fn format_haiku(&self, lines: [&str; 3]) -> String {
        let [first, second, third] = lines;
        format!(
            "{}\n{}\n{}",
            truncate_to_syllables(first, 5),
            truncate_to_syllables(second, 7),
            truncate_to_syllables(third, 5)
        )
    }

    /// A haiku from the stock lines, never repeating the first line last.
    pub fn random_haiku<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let first = FIVE_SYLLABLE_LINES.choose(rng).copied().unwrap_or_default();
        let second = SEVEN_SYLLABLE_LINES.choose(rng).copied().unwrap_or_default();
        let remaining: Vec<&str> = FIVE_SYLLABLE_LINES
            .iter()
            .copied()
            .filter(|line| *line != first)
            .collect();
        let third = remaining.choose(rng).copied().unwrap_or_default();
        format!("{first}\n{second}\n{third}")
    }
}

fn truncate_to_syllables(text: &str, syllables: usize) -> String {
    let target_words = ((syllables as f64 / SYLLABLES_PER_WORD) as usize).max(1);
    text.split_whitespace()
        .take(target_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rendering targets for a single excuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
    Plain,
    Twitter,
}

impl FromStr for OutputFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            "plain" => Ok(Self::Plain),
            "twitter" | "tweet" => Ok(Self::Twitter),
            _ => Err(FormatError::InvalidFormat(s.to_string())),
        }
    }
}

/// Render an excuse with default settings for the chosen format.
pub fn render(excuse: &Excuse, format: OutputFormat) -> Result<String, FormatError> {
    Ok(match format {
        OutputFormat::Text => render_text(excuse),
        OutputFormat::Json => render_json(excuse)?,
        OutputFormat::Markdown => render_markdown(excuse),
        OutputFormat::Plain => render_plain(excuse, DEFAULT_PLAIN_WIDTH),
        OutputFormat::Twitter => render_twitter(excuse, DEFAULT_TWEET_CHARS),
    })
}

/// Free text: the excuse followed by its recommendation.
pub fn render_text(excuse: &Excuse) -> String {
    format!("{}\nRecommendation: {}", excuse.text, excuse.recommendation)
}

/// JSON projection of an excuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExcuse {
    pub excuse: String,
    pub recommendation: String,
    pub severity: SeverityTier,
    pub category: String,
    pub quality_score: u32,
    pub quantum_probability: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub language: String,
    pub technical_details: String,
    pub error_message: String,
}

impl From<&Excuse> for JsonExcuse {
    fn from(excuse: &Excuse) -> Self {
        Self {
            excuse: excuse.text.clone(),
            recommendation: excuse.recommendation.clone(),
            severity: excuse.severity,
            category: excuse.category.clone(),
            quality_score: excuse.quality_score,
            quantum_probability: excuse.quantum_probability,
            timestamp: excuse.timestamp,
            language: excuse.language.clone(),
            technical_details: excuse.metadata.markov_component.clone(),
            error_message: excuse.metadata.error_message.clone(),
        }
    }
}

pub fn render_json(excuse: &Excuse) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonExcuse::from(excuse))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_markdown(excuse: &Excuse) -> String {
    let badge = match excuse.severity {
        SeverityTier::Mild => "🟢",
        SeverityTier::Medium => "🟡",
        SeverityTier::Severe => "🔴",
    };
    let mut out = vec![
        "## 🚨 System Excuse Report\n".to_string(),
        format!("**Primary Analysis:** {}\n", excuse.text),
        "### 📊 Metadata\n".to_string(),
        format!(
            "- **Severity:** {} {}",
            badge,
            capitalize(excuse.severity.name())
        ),
        format!("- **Category:** {}", capitalize(&excuse.category)),
        format!("- **Quality Score:** {}/100", excuse.quality_score),
        format!("- **Quantum Probability:** {:.4}", excuse.quantum_probability),
        "\n### 💡 Recommended Action\n".to_string(),
        format!("> {}", excuse.recommendation),
    ];
    if !excuse.metadata.markov_component.is_empty() {
        out.push("\n### 🔬 Technical Analysis\n".to_string());
        out.push(format!("```\n{}\n```", excuse.metadata.markov_component));
    }
    out.join("\n")
}

pub const DEFAULT_PLAIN_WIDTH: usize = 80;

/// Greedy word wrap; continuation lines get `indent` prepended.
fn wrap(text: &str, width: usize, indent: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let prefix_len = if lines.is_empty() { 0 } else { indent.chars().count() };
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if !current.is_empty() && prefix_len + needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| if i == 0 { line.clone() } else { format!("{indent}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fixed-width report framed by `=` rules.
pub fn render_plain(excuse: &Excuse, width: usize) -> String {
    let rule = "=".repeat(width);
    let title = "SYSTEM EXCUSE REPORT";
    let pad = width.saturating_sub(title.len()) / 2;
    [
        rule.clone(),
        format!("{}{}", " ".repeat(pad), title),
        rule.clone(),
        String::new(),
        wrap(&format!("EXCUSE: {}", excuse.text), width, "  "),
        String::new(),
        wrap(
            &format!("RECOMMENDATION: {}", excuse.recommendation),
            width,
            "  ",
        ),
        String::new(),
        format!("SEVERITY: {}", excuse.severity.name().to_uppercase()),
        format!("CATEGORY: {}", excuse.category.to_uppercase()),
        format!("QUALITY: {}/100", excuse.quality_score),
        String::new(),
        rule,
    ]
    .join("\n")
}

pub const DEFAULT_TWEET_CHARS: usize = 280;
pub const TWEET_HASHTAGS: &str = " #debugging #programming #excuses #quantum";

/// Character-capped post with a hashtag suffix; space for an ellipsis is
/// always reserved. A cap too small for the suffix drops the hashtags and
/// truncates the bare text.
pub fn render_twitter(excuse: &Excuse, max_chars: usize) -> String {
    if max_chars < TWEET_HASHTAGS.chars().count() + 3 {
        return truncate_text(&excuse.text, max_chars, "...");
    }
    let available = max_chars
        .saturating_sub(TWEET_HASHTAGS.chars().count())
        .saturating_sub(3);
    if excuse.text.chars().count() <= available {
        format!("{}{}", excuse.text, TWEET_HASHTAGS)
    } else {
        let cut: String = excuse.text.chars().take(available).collect();
        format!("{cut}...{TWEET_HASHTAGS}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::excuse::ExcuseMetadata;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_excuse(text: &str) -> Excuse {
        Excuse {
            text: text.to_string(),
            recommendation: "Reboot the universe".to_string(),
            severity: SeverityTier::Severe,
            category: "quantum".to_string(),
            quality_score: 42,
            quantum_probability: 0.25,
            language: "en".to_string(),
            timestamp: chrono::Utc::now(),
            metadata: ExcuseMetadata {
                secondary_category: "cosmic".to_string(),
                markov_component: "kernel panic".to_string(),
                context: None,
                error_message: "FATAL".to_string(),
            },
        }
    }

    fn parts<'a>(markov: &'a str) -> ExcuseParts<'a> {
        ExcuseParts {
            primary_excuse: "cosmic rays",
            secondary_excuse: "a stray neutrino",
            intensifier: "definitely",
            connector: "which caused",
            markov_phrase: markov,
        }
    }

    #[test]
    fn template_with_markov_phrase() {
        let text = ExcuseFormatter::default().format_excuse(&parts("heap corruption"));
        assert_eq!(
            text,
            "The error was definitely caused by cosmic rays. which caused a stray neutrino. \
             Additionally, analysis shows heap corruption instability."
        );
    }

    #[test]
    fn template_omits_empty_markov_sentence() {
        let text = ExcuseFormatter::default().format_excuse(&parts(""));
        assert_eq!(
            text,
            "The error was definitely caused by cosmic rays. which caused a stray neutrino."
        );
    }

    #[test]
    fn template_respects_max_length() {
        let text = ExcuseFormatter::new(Some(30)).format_excuse(&parts("x"));
        assert_eq!(text.chars().count(), 30);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn technical_format_limits_details() {
        let details: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let out = ExcuseFormatter::default().format_technical("oops", &details);
        assert_eq!(out, "Technical Analysis: oops | Stack trace: a → b → c");
    }

    #[test]
    fn corporate_format_fills_template() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = ExcuseFormatter::default().format_corporate(&mut rng, "gremlins", "Stand by.");
        assert!(out.contains("gremlins"));
        assert!(out.ends_with("Stand by."));
        assert!(!out.contains('{'));
    }

    #[test]
    fn haiku_lines_are_truncated_by_word_count() {
        let haiku = HaikuFormatter.format_haiku([
            "one two three four five six",
            "one two three four five six seven eight",
            "alpha",
        ]);
        let lines: Vec<&str> = haiku.lines().collect();
        assert_eq!(lines, vec!["one two three", "one two three four five", "alpha"]);
    }

    #[test]
    fn random_haiku_has_three_distinct_outer_lines() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let haiku = HaikuFormatter.random_haiku(&mut rng);
            let lines: Vec<&str> = haiku.lines().collect();
            assert_eq!(lines.len(), 3);
            assert_ne!(lines[0], lines[2]);
        }
    }

    #[test]
    fn output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(FormatError::InvalidFormat(f)) if f == "yaml"
        ));
    }

    #[test]
    fn json_render_has_expected_fields() {
        let excuse = sample_excuse("It was the cosmos.");
        let json = render(&excuse, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for field in [
            "excuse",
            "recommendation",
            "severity",
            "category",
            "quality_score",
            "quantum_probability",
            "timestamp",
            "language",
            "technical_details",
            "error_message",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(value["severity"], "severe");
        assert_eq!(value["technical_details"], "kernel panic");
    }

    #[test]
    fn markdown_render_interpolates_values() {
        let md = render_markdown(&sample_excuse("It was the cosmos."));
        assert!(md.contains("**Primary Analysis:** It was the cosmos."));
        assert!(md.contains("🔴 Severe"));
        assert!(md.contains("- **Category:** Quantum"));
        assert!(md.contains("> Reboot the universe"));
        assert!(md.contains("```\nkernel panic\n```"));
    }

    #[test]
    fn plain_render_wraps_to_width() {
        let excuse = sample_excuse(&"word ".repeat(60));
        let out = render_plain(&excuse, 40);
        assert!(out.lines().all(|l| l.chars().count() <= 40), "{}", out);
        assert!(out.contains("SEVERITY: SEVERE"));
        assert!(out.contains("QUALITY: 42/100"));
    }

    #[test]
    fn twitter_short_text_keeps_all() {
        let out = render_twitter(&sample_excuse("Short."), DEFAULT_TWEET_CHARS);
        assert_eq!(out, format!("Short.{}", TWEET_HASHTAGS));
    }

    #[test]
    fn twitter_long_text_is_capped() {
        let excuse = sample_excuse(&"x".repeat(500));
        let out = render_twitter(&excuse, DEFAULT_TWEET_CHARS);
        assert_eq!(out.chars().count(), DEFAULT_TWEET_CHARS);
        assert!(out.ends_with(TWEET_HASHTAGS));
        assert!(out.contains("..."));
    }

    #[test]
    fn twitter_tiny_cap_is_respected() {
        let excuse = sample_excuse("Solar flare in the datacenter.");
        for cap in [0, 3, 10, TWEET_HASHTAGS.chars().count() + 2] {
            let out = render_twitter(&excuse, cap);
            assert!(out.chars().count() <= cap, "cap {}: {:?}", cap, out);
        }
        assert_eq!(render_twitter(&excuse, 10), "Solar f...");
    }

    #[test]
    fn truncate_and_sanitize() {
        assert_eq!(truncate_text("hello world", 8, "..."), "hello...");
        assert_eq!(truncate_text("hi", 8, "..."), "hi");
        assert_eq!(truncate_text("hello", 2, "..."), "..");
        assert_eq!(sanitize_input("  a\u{0007}b \n\t c  ", 100), "ab c");
        assert_eq!(sanitize_input("abcdef", 3), "abc");
    }
}
