//! MarketLens - LLM-powered marketing intelligence
//!
//! Runs marketing analysis modules against a business profile using a local
//! Ollama model and writes a strategy report.
//!
//! Exit codes:
//!   0 - Success (no threats at or above the --fail-on level, or no --fail-on set)
//!   1 - Runtime error (config, profile, unknown module, etc.)
//!   2 - Threats found at or above the --fail-on level

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use marketlens::cli::{Args, OutputFormat};
use marketlens::config::{Config, DEFAULT_CONFIG_FILE};
use marketlens::llm::{LanguageModel, OllamaClient};
use marketlens::models::{BusinessContext, StrategicSynthesis};
use marketlens::modules::{ModuleRegistry, PromptModule};
use marketlens::orchestrator::{ExecutionPlan, Orchestrator, Scope};
use marketlens::profile::load_profile;
use marketlens::report;
use marketlens::synthesis::Synthesizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging needed for --init-config
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("MarketLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .marketlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the model, modules, and themes.");
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the analysis workflow. Returns the process exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let profile_path = args
        .profile
        .as_deref()
        .context("--profile is required")?;
    let context = load_profile(profile_path)?;
    info!(
        "Loaded profile for {} ({})",
        context.name, context.business_id
    );

    let client = OllamaClient::new(config.client_config())?;
    let model: Arc<dyn LanguageModel> = Arc::new(client);

    let mut registry = ModuleRegistry::new();
    for definition in &config.modules {
        registry.register(Arc::new(PromptModule::new(definition, model.clone())));
    }
    info!("Registered {} analysis modules", registry.len());

    let orchestrator =
        Orchestrator::new(registry).with_synthesizer(Synthesizer::new(config.themes.clone()));
    let scope = args.scope();

    if args.dry_run {
        let plan = orchestrator.plan_scope(&scope)?;
        print_plan(&scope, &plan, &context);
        return Ok(0);
    }

    let run_config = config.run_config();
    println!("🔬 Analyzing {} ({})", context.name, scope);
    println!("   Model: {}", model.model_name());
    println!("   Ollama: {}", config.model.ollama_url);
    println!(
        "   Module timeout: {}ms{}",
        run_config.timeout_ms,
        if run_config.parallel_within_stage {
            ""
        } else {
            " (sequential)"
        }
    );

    let spinner = if args.quiet { None } else { Some(start_spinner()) };

    let result = orchestrator.run_scope(&scope, &context, &run_config).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let synthesis = result?;

    let output_path = PathBuf::from(&config.general.output);
    let content = match args.format {
        OutputFormat::Json => report::generate_json_report(&synthesis)?,
        OutputFormat::Markdown => report::generate_markdown_report(&synthesis, &config.model.name),
    };
    report::save_report(&content, &output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    print_summary(&synthesis);
    println!(
        "\n✅ Analysis complete! Report saved to: {}",
        output_path.display()
    );

    if let Some(level) = args.fail_on {
        let threshold = level.as_priority();
        if synthesis
            .insights
            .threats
            .iter()
            .any(|t| t.priority >= threshold)
        {
            eprintln!(
                "\n⛔ Threats found at or above {} priority. Failing (exit code 2).",
                threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

fn start_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Running analysis modules...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_plan(scope: &Scope, plan: &ExecutionPlan, context: &BusinessContext) {
    println!("\n🔍 Dry run: execution plan for {} (no model calls)\n", scope);

    if plan.stages.is_empty() {
        println!("   No modules to run.");
    }
    for (i, stage) in plan.stages.iter().enumerate() {
        println!("   Stage {}:", i + 1);
        for module in &stage.modules {
            let metadata = module.metadata();
            let deps = &metadata.dependencies;
            let missing_data = (metadata.requires_competitor_data
                && context.competitor_data.is_none())
                || (metadata.requires_financial_data && context.financial_data.is_none());
            let note = if missing_data {
                "  ⚠️ required profile data missing"
            } else {
                ""
            };
            if deps.is_empty() {
                println!("     📦 {}{}", module.name(), note);
            } else {
                println!("     📦 {} (after {}){}", module.name(), deps.join(", "), note);
            }
        }
    }

    for unscheduled in &plan.unscheduled {
        println!(
            "   ⏭️  {} will be skipped: unmet dependencies {}",
            unscheduled.name,
            unscheduled.missing.join(", ")
        );
    }

    println!("\n✅ Dry run complete. No model calls were made.");
}

fn print_summary(synthesis: &StrategicSynthesis) {
    let insights = &synthesis.insights;
    let metadata = &synthesis.metadata;

    println!("\n📊 Analysis Summary:");
    println!(
        "   Modules: {} executed, {} skipped",
        metadata.agents_executed.len(),
        metadata.skipped.len()
    );
    println!(
        "   Insights: {} opportunities | {} threats | {} strengths | {} weaknesses",
        insights.opportunities.len(),
        insights.threats.len(),
        insights.strengths.len(),
        insights.weaknesses.len()
    );
    println!("   Actions: {}", synthesis.action_plan.total());
    println!("   Confidence: {:.0}%", synthesis.confidence_score * 100.0);
    println!(
        "   Duration: {:.1}s",
        metadata.total_execution_time_ms as f64 / 1000.0
    );

    for skipped in &metadata.skipped {
        println!("   ⏭️  {}: {}", skipped.module, skipped.reason);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
