//! Staged orchestration of analysis modules.

pub mod engine;
pub mod planner;
pub mod validator;

pub use engine::{Orchestrator, RunConfig, Scope, DEFAULT_TIMEOUT_MS};
pub use planner::{build_plan, ExecutionPlan, Stage, UnscheduledModule};
pub use validator::validate_output;
