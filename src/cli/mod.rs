//! # Command line
//!
//! `endpoint-replay run corpus.json --config replay.toml` replays a corpus
//! for CI; the exit code is non-zero when any endpoint fails.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::storage::RunRecord;
use crate::testing::{CaseStatus, RunReport};

#[derive(Debug, Parser)]
#[command(
    name = "endpoint-replay",
    version,
    about = "Replay a recorded endpoint corpus against a live API and validate the responses",
    long_about = None
)]
pub struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a corpus and validate every response.
    Run(RunArgs),
    /// Show endpoint counts per category.
    Summary {
        /// Corpus file.
        corpus: PathBuf,
    },
    /// Convert a Postman v2.1 collection into a corpus file.
    Import {
        /// Postman collection export.
        #[arg(long)]
        postman: PathBuf,
        /// Corpus file to write.
        #[arg(long)]
        out: PathBuf,
    },
    /// List past runs from a history database.
    History {
        #[arg(long)]
        db: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Corpus file.
    pub corpus: PathBuf,
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Overrides the configured base URL.
    #[arg(long)]
    pub base_url: Option<String>,
    /// Replay only these categories (repeatable).
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Write the full JSON report here.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Append a summary row to this SQLite history database.
    #[arg(long)]
    pub history_db: Option<PathBuf>,
    /// Keep created resources instead of deleting them afterwards.
    #[arg(long)]
    pub no_cleanup: bool,
    /// Fixture RNG seed, for reproducible request bodies.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Per-request timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

impl RunArgs {
    /// File config, then `REPLAY_*` environment, then flags.
    pub fn resolve_config(&self) -> Result<RunnerConfig> {
        let mut config = match &self.config {
            Some(path) => RunnerConfig::load(path)?,
            None => RunnerConfig::default(),
        };
        config.apply_process_env()?;
        self.apply_flags(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_flags(&self, config: &mut RunnerConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if self.no_cleanup {
            config.cleanup = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
    }
}

/// Output format for CLI reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Installs the global subscriber. `RUST_LOG` wins over the default `info`.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    for result in &report.results {
        let marker = match result.status {
            CaseStatus::Passed => "PASS",
            CaseStatus::Failed => "FAIL",
            CaseStatus::Skipped => "SKIP",
        };
        let _ = writeln!(
            out,
            "{marker} {:<7} {} [{}] {}",
            result.method.to_string(),
            result.url,
            result.category,
            result.message
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Categories:");
    for (category, (passed, failed, skipped)) in report.by_category() {
        let _ = writeln!(out, "  {category:<16} passed {passed:>4}  failed {failed:>4}  skipped {skipped:>4}");
    }
    if !report.failed_roles.is_empty() {
        let _ = writeln!(out, "Roles without token: {}", report.failed_roles.join(", "));
    }
    let _ = writeln!(
        out,
        "Cleanup: {} attempted, {} deleted, {} failed",
        report.cleanup.attempted, report.cleanup.deleted, report.cleanup.failed
    );
    let _ = writeln!(
        out,
        "Total {} | passed {} | failed {} | skipped {} | {} ms",
        report.total, report.passed, report.failed, report.skipped, report.duration_ms
    );
    out
}

pub fn render_history(records: &[RunRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "#{:<5} {} {} {} total {} passed {} failed {} skipped {} ({} ms)",
            record.id,
            record.started_at,
            record.corpus,
            record.base_url,
            record.total,
            record.passed,
            record.failed,
            record.skipped,
            record.duration_ms
        );
    }
    out
}
