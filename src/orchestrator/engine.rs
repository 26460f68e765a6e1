//! Execution engine.
//!
//! Runs an [`ExecutionPlan`] stage by stage. Modules inside a stage run
//! concurrently against the same read-only context; each one is guarded by
//! its own timeout and panic boundary, and every outcome is collected before
//! the next stage starts. Later stages see the accepted outputs of earlier
//! stages through `BusinessContext::previous_analyses`.

use super::planner::{build_plan, ExecutionPlan, Stage};
use crate::error::{ModuleFailure, OrchestrationError};
use crate::models::{
    BusinessContext, ModuleCategory, ModuleOutput, SkippedModule, StrategicSynthesis,
};
use crate::modules::{AnalysisModule, ModuleRegistry};
use crate::synthesis::{RunSummary, Synthesizer};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-module timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Options for one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Run modules of a stage concurrently (true) or one after another.
    pub parallel_within_stage: bool,
    /// Per-module deadline in milliseconds.
    pub timeout_ms: u64,
    /// Outputs below this confidence are logged but still accepted.
    pub min_confidence: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel_within_stage: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            min_confidence: None,
        }
    }
}

/// Which registered modules a run covers.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    All,
    Category(ModuleCategory),
    Named(Vec<String>),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "all modules"),
            Scope::Category(category) => write!(f, "category '{}'", category),
            Scope::Named(names) => write!(f, "modules [{}]", names.join(", ")),
        }
    }
}

/// Runs analysis modules and synthesizes their outputs.
pub struct Orchestrator {
    registry: ModuleRegistry,
    synthesizer: Synthesizer,
}

impl Orchestrator {
    pub fn new(registry: ModuleRegistry) -> Self {
        Self {
            registry,
            synthesizer: Synthesizer::default(),
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn register_module(&mut self, module: Arc<dyn AnalysisModule>) {
        self.registry.register(module);
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub async fn run_all(
        &self,
        context: &BusinessContext,
        config: &RunConfig,
    ) -> Result<StrategicSynthesis, OrchestrationError> {
        self.run_scope(&Scope::All, context, config).await
    }

    pub async fn run_by_category(
        &self,
        category: ModuleCategory,
        context: &BusinessContext,
        config: &RunConfig,
    ) -> Result<StrategicSynthesis, OrchestrationError> {
        self.run_scope(&Scope::Category(category), context, config)
            .await
    }

    /// Run the named modules. Every name must be registered. Modules run in
    /// registration order whatever order the names are given in, and
    /// dependencies are not pulled in implicitly.
    pub async fn run_named<S: AsRef<str>>(
        &self,
        names: &[S],
        context: &BusinessContext,
        config: &RunConfig,
    ) -> Result<StrategicSynthesis, OrchestrationError> {
        let scope = Scope::Named(names.iter().map(|n| n.as_ref().to_string()).collect());
        self.run_scope(&scope, context, config).await
    }

    /// Resolve a scope to registered modules, in registration order.
    pub fn resolve_scope(
        &self,
        scope: &Scope,
    ) -> Result<Vec<Arc<dyn AnalysisModule>>, OrchestrationError> {
        match scope {
            Scope::All => Ok(self.registry.all()),
            Scope::Category(category) => Ok(self.registry.by_category(*category)),
            Scope::Named(names) => {
                if let Some(unknown) = names.iter().find(|n| self.registry.get(n).is_none()) {
                    return Err(OrchestrationError::UnknownModule(unknown.clone()));
                }
                let requested: HashSet<&str> = names.iter().map(String::as_str).collect();
                Ok(self
                    .registry
                    .all()
                    .into_iter()
                    .filter(|m| requested.contains(m.name()))
                    .collect())
            }
        }
    }

    /// Build the execution plan for a scope without running anything.
    pub fn plan_scope(&self, scope: &Scope) -> Result<ExecutionPlan, OrchestrationError> {
        Ok(build_plan(&self.resolve_scope(scope)?))
    }

    /// Plan, execute and synthesize the modules selected by `scope`.
    ///
    /// Individual module failures never fail the run; only an unknown module
    /// name in the scope does, before anything executes.
    pub async fn run_scope(
        &self,
        scope: &Scope,
        context: &BusinessContext,
        config: &RunConfig,
    ) -> Result<StrategicSynthesis, OrchestrationError> {
        let start = Instant::now();
        let plan = self.plan_scope(scope)?;

        info!(
            "Running {}: {} modules in {} stages ({} unscheduled)",
            scope,
            plan.scheduled_count(),
            plan.stages.len(),
            plan.unscheduled.len()
        );

        let mut skipped: Vec<SkippedModule> = plan
            .unscheduled
            .iter()
            .map(|u| SkippedModule {
                module: u.name.clone(),
                reason: ModuleFailure::UnmetDependency {
                    missing: u.missing.clone(),
                }
                .to_string(),
            })
            .collect();

        let mut accepted: Vec<ModuleOutput> = Vec::new();

        for (index, stage) in plan.stages.iter().enumerate() {
            // Only outputs of completed stages; stage-mates never see each other.
            let enriched = context.enriched_with(accepted.iter());
            let accepted_names: HashSet<String> =
                accepted.iter().map(|o| o.module_name.clone()).collect();

            info!(
                "Stage {}/{}: {:?}",
                index + 1,
                plan.stages.len(),
                stage.module_names()
            );

            let outcomes = self
                .run_stage(stage, &enriched, &accepted_names, config)
                .await;

            for (name, outcome) in outcomes {
                match outcome {
                    Ok(output) => {
                        if let Some(min) = config.min_confidence {
                            if output.confidence < min {
                                warn!(
                                    module = %name,
                                    confidence = output.confidence,
                                    min_confidence = min,
                                    "Module output below confidence threshold"
                                );
                            }
                        }
                        accepted.push(output);
                    }
                    Err(failure) => {
                        warn!(module = %name, reason = %failure, "Module dropped from run");
                        skipped.push(SkippedModule {
                            module: name,
                            reason: failure.to_string(),
                        });
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        info!(
            "Run finished in {:.1}s: {} accepted, {} skipped",
            elapsed.as_secs_f64(),
            accepted.len(),
            skipped.len()
        );

        Ok(self.synthesizer.synthesize(
            context,
            accepted,
            RunSummary {
                skipped,
                stages: plan.stage_names(),
                elapsed,
            },
        ))
    }

    /// Run every module of a stage and collect all outcomes in plan order.
    async fn run_stage(
        &self,
        stage: &Stage,
        context: &BusinessContext,
        accepted_names: &HashSet<String>,
        config: &RunConfig,
    ) -> Vec<(String, Result<ModuleOutput, ModuleFailure>)> {
        let tasks = stage.modules.iter().map(|module| async move {
            let name = module.name().to_string();
            let outcome = execute_module(module.as_ref(), context, accepted_names, config).await;
            (name, outcome)
        });

        if config.parallel_within_stage {
            join_all(tasks).await
        } else {
            let mut outcomes = Vec::with_capacity(stage.modules.len());
            for task in tasks {
                outcomes.push(task.await);
            }
            outcomes
        }
    }
}

/// Pre-check, run under a deadline, and validate a single module.
///
/// On timeout the module's future is dropped, which cancels its in-flight
/// work at the next await point.
async fn execute_module(
    module: &dyn AnalysisModule,
    context: &BusinessContext,
    accepted_names: &HashSet<String>,
    config: &RunConfig,
) -> Result<ModuleOutput, ModuleFailure> {
    let missing: Vec<String> = module
        .metadata()
        .dependencies
        .iter()
        .filter(|dep| !accepted_names.contains(*dep))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ModuleFailure::UnmetDependency { missing });
    }

    if !module.can_run(context) {
        return Err(ModuleFailure::CanRunFailed);
    }

    let started = Instant::now();
    let call = AssertUnwindSafe(module.analyze(context)).catch_unwind();

    let output = match tokio::time::timeout(Duration::from_millis(config.timeout_ms), call).await {
        Err(_) => {
            return Err(ModuleFailure::Timeout {
                timeout_ms: config.timeout_ms,
            })
        }
        Ok(Err(payload)) => return Err(ModuleFailure::ExecutionFailure(panic_message(&*payload))),
        Ok(Ok(Err(e))) => return Err(ModuleFailure::ExecutionFailure(format!("{:#}", e))),
        Ok(Ok(Ok(output))) => output,
    };

    debug!(
        module = %module.name(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Module finished"
    );

    if output.module_name != module.name() {
        warn!(
            module = %module.name(),
            reported = %output.module_name,
            "Module reported output under a different name"
        );
        return Err(ModuleFailure::ValidationFailure);
    }

    if !module.validate(&output) {
        return Err(ModuleFailure::ValidationFailure);
    }

    Ok(output)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InsightType, Priority, Timeframe};
    use crate::test_support::{insight, recommendation, Behavior, StubModule};
    use serde_json::Value;

    fn context() -> BusinessContext {
        BusinessContext {
            business_id: "biz-42".to_string(),
            name: "Corner Bakery".to_string(),
            industry: "Food & Beverage".to_string(),
            description: "Neighbourhood bakery with a small cafe".to_string(),
            ..Default::default()
        }
    }

    fn orchestrator(modules: Vec<StubModule>) -> Orchestrator {
        let mut registry = ModuleRegistry::new();
        for module in modules {
            registry.register(Arc::new(module));
        }
        Orchestrator::new(registry)
    }

    fn skip_reason<'a>(synthesis: &'a StrategicSynthesis, module: &str) -> Option<&'a str> {
        synthesis
            .metadata
            .skipped
            .iter()
            .find(|s| s.module == module)
            .map(|s| s.reason.as_str())
    }

    #[tokio::test]
    async fn test_end_to_end_two_stage_run() {
        let a = StubModule::new("A").with_confidence(0.9).with_insights(vec![insight(
            InsightType::Opportunity,
            Priority::High,
            "Expand Online Ordering",
        )]);
        let b = StubModule::new("B")
            .with_dependencies(&["A"])
            .with_recommendations(vec![recommendation(
                "Expand online ordering channel",
                Timeframe::Days0To30,
                Priority::Medium,
            )]);
        let orch = orchestrator(vec![a, b]);

        let plan = orch.plan_scope(&Scope::All).unwrap();
        assert_eq!(plan.stage_names(), vec![vec!["A"], vec!["B"]]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert_eq!(synthesis.module_outputs.len(), 2);
        assert_eq!(synthesis.metadata.agents_executed, vec!["A", "B"]);
        assert_eq!(synthesis.metadata.stages, vec![vec!["A"], vec!["B"]]);
        assert_eq!(synthesis.insights.opportunities.len(), 1);
        assert_eq!(synthesis.action_plan.immediate.len(), 1);
        assert_eq!(synthesis.action_plan.immediate[0].priority, Priority::Medium);
        assert_eq!(
            synthesis.action_plan.immediate[0].rationale,
            "Supported by the analysis"
        );
    }

    #[tokio::test]
    async fn test_later_stage_sees_only_earlier_outputs() {
        let a = StubModule::new("a");
        let b = StubModule::new("b");
        let c = StubModule::new("c").with_dependencies(&["a"]);
        let (seen_a, seen_b, seen_c) = (a.seen_handle(), b.seen_handle(), c.seen_handle());

        let orch = orchestrator(vec![a, b, c]);
        orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        let empty: Vec<String> = vec![];
        assert_eq!(seen_a.lock().unwrap()[0], empty);
        assert_eq!(seen_b.lock().unwrap()[0], empty);
        assert_eq!(seen_c.lock().unwrap()[0], vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_caller_context_is_not_mutated() {
        let orch = orchestrator(vec![
            StubModule::new("a"),
            StubModule::new("b").with_dependencies(&["a"]),
        ]);
        let ctx = context();

        orch.run_all(&ctx, &RunConfig::default()).await.unwrap();

        assert!(ctx.previous_analyses.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_drops_module_but_run_completes() {
        let orch = orchestrator(vec![
            StubModule::new("slow").with_delay(Duration::from_millis(500)),
            StubModule::new("fast"),
        ]);
        let config = RunConfig {
            timeout_ms: 1,
            ..Default::default()
        };

        let synthesis = orch.run_all(&context(), &config).await.unwrap();

        assert!(synthesis.output("slow").is_none());
        assert!(synthesis.output("fast").is_some());
        assert_eq!(skip_reason(&synthesis, "slow"), Some("timed out after 1ms"));
    }

    #[tokio::test]
    async fn test_failures_are_isolated_within_stage() {
        let orch = orchestrator(vec![
            StubModule::new("broken").with_behavior(Behavior::Fail("model offline".to_string())),
            StubModule::new("panicky").with_behavior(Behavior::Panic),
            StubModule::new("malformed").with_analysis(Value::Null),
            StubModule::new("overconfident").with_confidence(1.5),
            StubModule::new("healthy"),
        ]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert_eq!(synthesis.metadata.agents_executed, vec!["healthy"]);
        assert_eq!(
            skip_reason(&synthesis, "broken"),
            Some("execution failed: model offline")
        );
        assert!(skip_reason(&synthesis, "panicky")
            .unwrap()
            .contains("panicked"));
        assert_eq!(
            skip_reason(&synthesis, "malformed"),
            Some("output failed structural validation")
        );
        assert!(skip_reason(&synthesis, "overconfident").is_some());
    }

    #[tokio::test]
    async fn test_failed_module_does_not_unblock_dependents() {
        let orch = orchestrator(vec![
            StubModule::new("market").with_behavior(Behavior::Fail("boom".to_string())),
            StubModule::new("strategy").with_dependencies(&["market"]),
        ]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert!(synthesis.module_outputs.is_empty());
        assert_eq!(
            skip_reason(&synthesis, "strategy"),
            Some("unmet dependencies: market")
        );
    }

    #[tokio::test]
    async fn test_can_run_failure_skips_module() {
        let orch = orchestrator(vec![
            StubModule::new("rivals").requiring_competitor_data(),
            StubModule::new("market"),
        ]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();
        assert_eq!(synthesis.metadata.agents_executed, vec!["market"]);
        assert_eq!(
            skip_reason(&synthesis, "rivals"),
            Some("pre-check failed: required context is unavailable")
        );

        let mut ctx = context();
        ctx.competitor_data = Some(serde_json::json!({"rivals": ["Blue Cup"]}));
        let synthesis = orch.run_all(&ctx, &RunConfig::default()).await.unwrap();
        assert_eq!(synthesis.metadata.agents_executed, vec!["rivals", "market"]);
    }

    #[tokio::test]
    async fn test_cyclic_modules_are_skipped() {
        let orch = orchestrator(vec![
            StubModule::new("a").with_dependencies(&["b"]),
            StubModule::new("b").with_dependencies(&["a"]),
            StubModule::new("c"),
        ]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert_eq!(synthesis.metadata.agents_executed, vec!["c"]);
        assert_eq!(synthesis.metadata.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_stage_modules_run_concurrently() {
        let orch = orchestrator(vec![
            StubModule::new("a").with_delay(Duration::from_millis(200)),
            StubModule::new("b").with_delay(Duration::from_millis(200)),
            StubModule::new("c").with_delay(Duration::from_millis(200)),
        ]);

        let start = Instant::now();
        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert_eq!(synthesis.module_outputs.len(), 3);
        assert!(start.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_sequential_mode_runs_one_module_at_a_time() {
        let orch = orchestrator(vec![
            StubModule::new("first").with_delay(Duration::from_millis(100)),
            StubModule::new("second").with_delay(Duration::from_millis(100)),
            StubModule::new("third").with_delay(Duration::from_millis(100)),
        ]);
        let config = RunConfig {
            parallel_within_stage: false,
            ..Default::default()
        };

        let start = Instant::now();
        let synthesis = orch.run_all(&context(), &config).await.unwrap();

        // Concurrent execution of the stage would finish in about 100ms.
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(
            synthesis.metadata.agents_executed,
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn test_low_confidence_output_is_still_accepted() {
        let orch = orchestrator(vec![StubModule::new("shaky").with_confidence(0.1)]);
        let config = RunConfig {
            min_confidence: Some(0.5),
            ..Default::default()
        };

        let synthesis = orch.run_all(&context(), &config).await.unwrap();
        assert_eq!(synthesis.metadata.agents_executed, vec!["shaky"]);
    }

    #[tokio::test]
    async fn test_zero_accepted_modules_still_synthesizes() {
        let orch = orchestrator(vec![]);

        let synthesis = orch.run_all(&context(), &RunConfig::default()).await.unwrap();

        assert_eq!(synthesis.confidence_score, 0.0);
        assert_eq!(synthesis.insights.total(), 0);
        assert!(synthesis.action_plan.is_empty());
        assert!(synthesis.themes.is_empty());
        assert!(!synthesis.executive_summary.is_empty());
    }

    #[tokio::test]
    async fn test_run_by_category() {
        let orch = orchestrator(vec![
            StubModule::new("rivals").with_category(ModuleCategory::Competitive),
            StubModule::new("market"),
        ]);

        let synthesis = orch
            .run_by_category(ModuleCategory::Competitive, &context(), &RunConfig::default())
            .await
            .unwrap();
        assert_eq!(synthesis.metadata.agents_executed, vec!["rivals"]);
    }

    #[tokio::test]
    async fn test_run_named_subset_and_unknown_name() {
        let orch = orchestrator(vec![
            StubModule::new("a"),
            StubModule::new("b").with_dependencies(&["a"]),
            StubModule::new("c"),
        ]);

        let synthesis = orch
            .run_named(&["c", "b"], &context(), &RunConfig::default())
            .await
            .unwrap();
        // b's dependency was not requested
        assert_eq!(synthesis.metadata.agents_executed, vec!["c"]);
        assert_eq!(skip_reason(&synthesis, "b"), Some("unmet dependencies: a"));

        let err = orch
            .run_named(&["nope"], &context(), &RunConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, OrchestrationError::UnknownModule("nope".to_string()));

        let err = orch
            .run_named(&["a", "nope"], &context(), &RunConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, OrchestrationError::UnknownModule("nope".to_string()));
    }

    #[tokio::test]
    async fn test_run_named_follows_registration_order() {
        let orch = orchestrator(vec![
            StubModule::new("a"),
            StubModule::new("b"),
            StubModule::new("c"),
        ]);

        let synthesis = orch
            .run_named(&["c", "a"], &context(), &RunConfig::default())
            .await
            .unwrap();
        assert_eq!(synthesis.metadata.agents_executed, vec!["a", "c"]);

        let names: Vec<String> = orch
            .plan_scope(&Scope::Named(vec!["c".to_string(), "a".to_string()]))
            .unwrap()
            .stages
            .iter()
            .flat_map(|stage| stage.modules.iter().map(|m| m.name().to_string()))
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::All.to_string(), "all modules");
        assert_eq!(
            Scope::Category(ModuleCategory::Customer).to_string(),
            "category 'customer'"
        );
        assert_eq!(
            Scope::Named(vec!["a".to_string(), "b".to_string()]).to_string(),
            "modules [a, b]"
        );
    }
}
