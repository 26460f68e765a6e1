//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.marketlens.toml` files.

use crate::llm::ClientConfig;
use crate::models::{ModuleCategory, Priority};
use crate::modules::ModuleDefinition;
use crate::orchestrator::{RunConfig, DEFAULT_TIMEOUT_MS};
use crate::synthesis::{default_themes, ThemeDefinition};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".marketlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    /// Analysis modules to register, in registration order.
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleDefinition>,

    /// Keyword table for cross-module theme detection.
    #[serde(default = "default_themes")]
    pub themes: Vec<ThemeDefinition>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            model: ModelConfig::default(),
            engine: EngineConfig::default(),
            modules: default_modules(),
            themes: default_themes(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "marketlens_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_http_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_http_timeout() -> u64 {
    120
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-module deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Outputs below this confidence are flagged in the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,

    #[serde(default = "default_true")]
    pub parallel_within_stage: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            min_confidence: None,
            parallel_within_stage: true,
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

fn module(
    name: &str,
    category: ModuleCategory,
    dependencies: &[&str],
    priority: Priority,
    prompt: &str,
) -> ModuleDefinition {
    ModuleDefinition {
        name: name.to_string(),
        category,
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        priority,
        requires_competitor_data: false,
        requires_financial_data: false,
        prompt: prompt.to_string(),
    }
}

/// The built-in marketing analysis modules.
pub fn default_modules() -> Vec<ModuleDefinition> {
    vec![
        module(
            "market_overview",
            ModuleCategory::Market,
            &[],
            Priority::High,
            "Assess the local market: size, demand trends, seasonality and the customer \
             segments the business can realistically serve.",
        ),
        ModuleDefinition {
            requires_competitor_data: true,
            ..module(
                "competitor_landscape",
                ModuleCategory::Competitive,
                &["market_overview"],
                Priority::High,
                "Compare the business with the competitors in the competitor data. Identify \
                 where they are stronger, where they are weaker, and open positioning gaps.",
            )
        },
        module(
            "customer_segments",
            ModuleCategory::Customer,
            &["market_overview"],
            Priority::Medium,
            "Describe the most valuable customer segments, what each one needs, and how \
             loyal or price sensitive they are likely to be.",
        ),
        ModuleDefinition {
            requires_financial_data: true,
            ..module(
                "financial_health",
                ModuleCategory::Financial,
                &[],
                Priority::Medium,
                "Review the financial data for margin, cost structure and revenue risks, and \
                 estimate how much the business can invest in marketing.",
            )
        },
        module(
            "marketing_channels",
            ModuleCategory::Marketing,
            &["customer_segments"],
            Priority::Medium,
            "Recommend the marketing channels and messages that reach the identified \
             customer segments most cost-effectively.",
        ),
        module(
            "growth_strategy",
            ModuleCategory::Strategy,
            &["market_overview", "customer_segments", "marketing_channels"],
            Priority::High,
            "Combine the earlier analyses into a growth strategy with concrete, time-phased \
             actions and measurable success metrics.",
        ),
    ]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only flags the user actually set override file values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }

        if let Some(timeout_ms) = args.timeout_ms {
            self.engine.timeout_ms = timeout_ms;
        }
        if args.min_confidence.is_some() {
            self.engine.min_confidence = args.min_confidence;
        }
        if args.sequential {
            self.engine.parallel_within_stage = false;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            parallel_within_stage: self.engine.parallel_within_stage,
            timeout_ms: self.engine.timeout_ms,
            min_confidence: self.engine.min_confidence,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            ollama_url: self.model.ollama_url.clone(),
            model_name: self.model.name.clone(),
            temperature: self.model.temperature,
            timeout_seconds: self.model.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}
