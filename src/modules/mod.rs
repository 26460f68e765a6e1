//! Analysis module contract.
//!
//! Every analysis module implements [`AnalysisModule`]: static metadata, a
//! pre-check against the business context, the asynchronous analysis call,
//! and a structural self-check on its own output.

pub mod prompt;
pub mod registry;

pub use prompt::{ModuleDefinition, PromptModule};
pub use registry::ModuleRegistry;

use crate::models::{BusinessContext, ModuleMetadata, ModuleOutput};
use crate::orchestrator::validator;
use anyhow::Result;
use async_trait::async_trait;

/// An independent analysis unit scheduled by the orchestrator.
#[async_trait]
pub trait AnalysisModule: Send + Sync {
    fn metadata(&self) -> &ModuleMetadata;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Returns false when required context data or dependency output is missing.
    fn can_run(&self, context: &BusinessContext) -> bool {
        default_can_run(self.metadata(), context)
    }

    /// Runs the analysis. May fail or be cancelled by the caller's timeout.
    ///
    /// Modules of a stage are polled together on the caller's task, so the
    /// future must not block the thread. Blocking work belongs in
    /// `tokio::task::spawn_blocking`; a blocking call stalls every module of
    /// the stage and keeps the timeout from firing until it returns.
    async fn analyze(&self, context: &BusinessContext) -> Result<ModuleOutput>;

    fn validate(&self, output: &ModuleOutput) -> bool {
        validator::validate_output(output)
    }
}

/// The pre-check shared by all modules unless overridden.
pub fn default_can_run(metadata: &ModuleMetadata, context: &BusinessContext) -> bool {
    if metadata.requires_competitor_data && context.competitor_data.is_none() {
        return false;
    }
    if metadata.requires_financial_data && context.financial_data.is_none() {
        return false;
    }
    metadata
        .dependencies
        .iter()
        .all(|dep| context.previous_analyses.contains_key(dep))
}
