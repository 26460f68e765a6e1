//! Error types for the orchestration engine.
//!
//! `ModuleFailure` describes why a single module produced no accepted output;
//! it is recorded and logged but never aborts a run. `OrchestrationError` is
//! the only failure a caller of the engine can observe.

use thiserror::Error;

/// Reason a module was dropped from a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleFailure {
    /// A declared dependency was not requested, is cyclic, or produced no output.
    #[error("unmet dependencies: {}", .missing.join(", "))]
    UnmetDependency { missing: Vec<String> },

    /// The module's own `can_run` pre-check rejected the context.
    #[error("pre-check failed: required context is unavailable")]
    CanRunFailed,

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// `analyze` returned an error or panicked.
    #[error("execution failed: {0}")]
    ExecutionFailure(String),

    #[error("output failed structural validation")]
    ValidationFailure,
}

/// Hard errors reported to the caller before any module runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestrationError {
    #[error("unknown analysis module '{0}'")]
    UnknownModule(String),
}
