//! MarketLens - marketing intelligence engine.
//!
//! Independent analysis modules are scheduled in dependency order, run
//! concurrently within each stage under per-module timeouts, and their
//! outputs are merged into a single [`models::StrategicSynthesis`].
//!
//! ```no_run
//! use marketlens::models::BusinessContext;
//! use marketlens::modules::ModuleRegistry;
//! use marketlens::orchestrator::{Orchestrator, RunConfig};
//!
//! # async fn run(registry: ModuleRegistry, context: BusinessContext) -> anyhow::Result<()> {
//! let orchestrator = Orchestrator::new(registry);
//! let synthesis = orchestrator.run_all(&context, &RunConfig::default()).await?;
//! println!("{}", synthesis.executive_summary);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod modules;
pub mod orchestrator;
pub mod profile;
pub mod report;
pub mod synthesis;

#[cfg(test)]
mod test_support;
