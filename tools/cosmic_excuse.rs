/// Cosmic Excuse: command-line excuse generator.
///
/// Usage: cosmic_excuse [-e <error>] [-l en|bn] [-c <n>] [--category <name>]
///                      [--haiku] [--json] [--format <fmt>] [--show-score]
///                      [--min-score <n>] [--data-dir <dir>] [--no-banner]

use clap::Parser;
use cosmic_excuse::core::formatter::{render, sanitize_input, OutputFormat};
use cosmic_excuse::core::pipeline::{ExcuseGenerator, DEFAULT_MIN_SCORE_ATTEMPTS};
use cosmic_excuse::schema::excuse::Excuse;
use std::path::PathBuf;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const MAX_ERROR_CHARS: usize = 500;

const BANNER: &str = "
    ╔═══════════════════════════════════════╗
    ║      🚀 COSMIC EXCUSE GENERATOR 🚀    ║
    ║    When code fails, excuses prevail!  ║
    ╚═══════════════════════════════════════╝
";

/// Generate quantum-grade excuses for your code failures.
#[derive(Parser, Debug)]
#[command(name = "cosmic_excuse", version = VERSION, about = "Generate quantum-grade excuses for your code failures")]
struct Cli {
    /// Error message to generate an excuse for.
    #[arg(short, long, default_value = "")]
    error: String,

    /// Language for excuses (en=English, bn=Bengali).
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Number of excuses to generate.
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Preferred excuse category (quantum, cosmic, ai, technical, blame).
    #[arg(long)]
    category: Option<String>,

    /// Generate the excuse as a haiku.
    #[arg(long)]
    haiku: bool,

    /// Output as JSON.
    #[arg(long)]
    json: bool,

    /// Render each excuse as text, markdown, plain or twitter.
    #[arg(long, default_value = "text")]
    format: String,

    /// Skip the banner.
    #[arg(long)]
    no_banner: bool,

    /// Show quality score, severity and category.
    #[arg(long)]
    show_score: bool,

    /// Minimum quality score; regenerates up to 50 times per excuse.
    #[arg(long, default_value_t = 0)]
    min_score: u32,

    /// Corpus directory containing <lang>/corpus.ron, instead of built-in data.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if !cli.no_banner && !cli.json {
        println!("{}", BANNER);
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = ExcuseGenerator::builder().language(&cli.language);
    if let Some(ref dir) = cli.data_dir {
        builder = builder.corpus_dir(dir);
    }
    let generator = builder.build()?;
    let error = sanitize_input(&cli.error, MAX_ERROR_CHARS);

    if cli.haiku {
        let haiku = generator.generate_haiku(&error);
        if cli.json {
            let value = serde_json::json!({ "haiku": haiku, "language": generator.language() });
            println!("{}", value);
        } else {
            println!("\n🎋 Haiku Excuse:\n");
            println!("{}\n", haiku);
        }
        return Ok(());
    }

    let format: OutputFormat = cli.format.parse()?;

    let mut excuses = Vec::with_capacity(cli.count);
    for _ in 0..cli.count {
        excuses.push(generator.generate_with_min_score(
            &error,
            cli.category.as_deref(),
            cli.min_score,
            DEFAULT_MIN_SCORE_ATTEMPTS,
        )?);
    }

    if cli.json {
        print_json(&excuses)?;
    } else if format == OutputFormat::Text {
        print_text(&excuses, cli.show_score);
    } else {
        for excuse in &excuses {
            println!("{}\n", render(excuse, format)?);
        }
    }
    Ok(())
}

fn print_json(excuses: &[Excuse]) -> Result<(), serde_json::Error> {
    let output: Vec<serde_json::Value> = excuses
        .iter()
        .map(|e| {
            serde_json::json!({
                "text": e.text,
                "recommendation": e.recommendation,
                "severity": e.severity,
                "category": e.category,
                "quality_score": e.quality_score,
                "language": e.language,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text(excuses: &[Excuse], show_score: bool) {
    let rule = "=".repeat(50);
    for (i, excuse) in excuses.iter().enumerate() {
        if excuses.len() > 1 {
            println!("\n{}\nExcuse #{}\n{}", rule, i + 1, rule);
        }

        println!("\n💫 Excuse: {}", excuse.text);
        println!("\n💡 Recommendation: {}", excuse.recommendation);

        if show_score {
            println!("\n📊 Quality Score: {}/100", excuse.quality_score);
            println!("⚠️  Severity: {}", excuse.severity);
            println!("📁 Category: {}", excuse.category);
        }

        if i + 1 < excuses.len() {
            println!();
        }
    }
}
