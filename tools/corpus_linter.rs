/// Corpus Linter: validates phrase corpora category by category.
///
/// Usage: corpus_linter <data_dir> [--language <lang>]

use cosmic_excuse::core::corpus::{is_reserved, Corpus, CORPUS_FILE};
use std::path::Path;
use std::process;

/// Categories with fewer phrases than this get a variety warning.
const MIN_PHRASES: usize = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: corpus_linter <data_dir> [--language <lang>]");
        process::exit(0);
    }

    let data_dir = Path::new(&args[1]);
    let mut language = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--language" && i + 1 < args.len() {
            i += 1;
            language = Some(args[i].clone());
        }
        i += 1;
    }

    if !data_dir.is_dir() {
        eprintln!("ERROR: Path '{}' is not a directory", data_dir.display());
        process::exit(1);
    }

    let languages = match language {
        Some(lang) => vec![lang],
        None => match Corpus::available_languages(data_dir) {
            Ok(langs) => langs,
            Err(e) => {
                eprintln!("ERROR: Failed to list languages: {}", e);
                process::exit(1);
            }
        },
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for lang in &languages {
        println!("\n=== Corpus Lint Report: {} ===\n", lang);
        let (lang_errors, lang_warnings) = lint_language(data_dir, lang);
        errors.extend(lang_errors);
        warnings.extend(lang_warnings);
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} languages, {} errors, {} warnings",
        languages.len(),
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_language(data_dir: &Path, language: &str) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let report = Corpus::validate(data_dir, language);
    for (category, ok) in &report {
        println!("  {} {}", if *ok { "✓" } else { "✗" }, category);
        if !ok {
            errors.push(format!(
                "[{}] category '{}' missing or empty in {}",
                language, category, CORPUS_FILE
            ));
        }
    }

    let corpus = match Corpus::load(language, Some(data_dir)) {
        Ok(corpus) => corpus,
        Err(e) => {
            errors.push(format!("[{}] {}", language, e));
            return (errors, warnings);
        }
    };

    for warning in corpus.warnings() {
        warnings.push(format!("[{}] {}", language, warning));
    }

    for name in corpus.category_names().filter(|name| !is_reserved(name)) {
        let count = corpus.phrases(name).map_or(0, <[String]>::len);
        if count > 0 && count < MIN_PHRASES {
            warnings.push(format!(
                "[{}] category '{}' has only {} phrases (minimum {} recommended)",
                language, name, count, MIN_PHRASES
            ));
        }
    }

    let usable = corpus.usable_categories(None).len();
    if usable < 2 {
        errors.push(format!(
            "[{}] only {} usable excuse categories, at least 2 are required",
            language, usable
        ));
    }

    (errors, warnings)
}
