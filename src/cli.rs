//! Command-line interface argument parsing.
//!
//! Flags left unset fall back to `.marketlens.toml`, then to built-in defaults.

use crate::models::{ModuleCategory, Priority};
use crate::orchestrator::Scope;
use clap::Parser;
use std::path::PathBuf;

/// MarketLens - LLM-powered marketing intelligence
///
/// Runs a set of marketing analysis modules against a business profile in
/// dependency order and merges their findings into one strategy report.
///
/// Examples:
///   marketlens --profile bakery.toml
///   marketlens --profile bakery.toml --category competitive
///   marketlens --profile bakery.toml --modules market_overview,growth_strategy
///   marketlens --profile bakery.toml --dry-run
///   marketlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Business profile to analyze (TOML or JSON)
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub profile: Option<PathBuf>,

    /// Ollama model to use for analysis
    #[arg(short, long, env = "MARKETLENS_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .marketlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run only these modules (comma-separated)
    ///
    /// Dependencies are not pulled in automatically; a module whose
    /// dependency is not listed is skipped.
    #[arg(long, value_name = "NAMES", value_delimiter = ',', conflicts_with = "category")]
    pub modules: Option<Vec<String>>,

    /// Run only the modules of one category
    ///
    /// Values: market, competitive, customer, financial, marketing, strategy
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<ModuleCategory>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Per-module timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Warn about module outputs below this confidence (0.0 - 1.0)
    #[arg(long, value_name = "SCORE")]
    pub min_confidence: Option<f64>,

    /// Run the modules of a stage one after another
    #[arg(long)]
    pub sequential: bool,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Fail if a threat at or above this priority is reported
    ///
    /// Useful for scheduled jobs. Exit code 2 when the threshold is met.
    /// Values: critical, high, medium, low
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Dry run: print the staged execution plan without calling the model
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .marketlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl FailOnLevel {
    pub fn as_priority(self) -> Priority {
        match self {
            FailOnLevel::Low => Priority::Low,
            FailOnLevel::Medium => Priority::Medium,
            FailOnLevel::High => Priority::High,
            FailOnLevel::Critical => Priority::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !self.dry_run && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(min) = self.min_confidence {
            if !(0.0..=1.0).contains(&min) {
                return Err("Minimum confidence must be between 0.0 and 1.0".to_string());
            }
        }

        if self.timeout_ms == Some(0) {
            return Err("Module timeout must be at least 1ms".to_string());
        }

        if let Some(ref names) = self.modules {
            if names.iter().all(|n| n.trim().is_empty()) {
                return Err("--modules needs at least one module name".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref profile) = self.profile {
            if !profile.is_file() {
                return Err(format!("Profile file does not exist: {}", profile.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The module selection requested on the command line.
    pub fn scope(&self) -> Scope {
        if let Some(ref names) = self.modules {
            let names = names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(String::from)
                .collect();
            Scope::Named(names)
        } else if let Some(category) = self.category {
            Scope::Category(category)
        } else {
            Scope::All
        }
    }
}
