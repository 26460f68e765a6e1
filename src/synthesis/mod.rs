//! Strategic synthesis of module outputs.

pub mod aggregator;
pub mod themes;

pub use themes::{default_themes, ThemeDefinition};

use crate::models::{
    BusinessContext, ModuleOutput, SkippedModule, StrategicSynthesis, SynthesisMetadata,
};
use aggregator::{
    build_action_plan, cross_reference_recommendations, detect_themes, executive_summary,
    extract_metrics, merge_insights, overall_confidence,
};
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

/// Run bookkeeping the synthesizer copies into the report metadata.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub skipped: Vec<SkippedModule>,
    pub stages: Vec<Vec<String>>,
    pub elapsed: Duration,
}

/// Merges accepted module outputs into one [`StrategicSynthesis`].
#[derive(Debug, Clone)]
pub struct Synthesizer {
    themes: Vec<ThemeDefinition>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(default_themes())
    }
}

impl Synthesizer {
    pub fn new(themes: Vec<ThemeDefinition>) -> Self {
        Self { themes }
    }

    pub fn themes(&self) -> &[ThemeDefinition] {
        &self.themes
    }

    /// Build the synthesis. Never fails; zero outputs produce an empty report.
    pub fn synthesize(
        &self,
        context: &BusinessContext,
        outputs: Vec<ModuleOutput>,
        run: RunSummary,
    ) -> StrategicSynthesis {
        let insights = merge_insights(&outputs);
        let recommendations = cross_reference_recommendations(&outputs);
        let action_plan = build_action_plan(recommendations);
        let themes = detect_themes(&outputs, &self.themes);
        let success_metrics = extract_metrics(&outputs);
        let confidence_score = overall_confidence(&outputs);
        let summary = executive_summary(
            &context.name,
            outputs.len(),
            &insights,
            &themes,
            confidence_score,
        );

        debug!(
            "Synthesized {} outputs: {} insights, {} actions, {} themes",
            outputs.len(),
            insights.total(),
            action_plan.total(),
            themes.len()
        );

        StrategicSynthesis {
            executive_summary: summary,
            confidence_score,
            insights,
            action_plan,
            themes,
            success_metrics,
            metadata: SynthesisMetadata {
                business_id: context.business_id.clone(),
                business_name: context.name.clone(),
                agents_executed: outputs.iter().map(|o| o.module_name.clone()).collect(),
                skipped: run.skipped,
                stages: run.stages,
                total_execution_time_ms: run.elapsed.as_millis() as u64,
                generated_at: Utc::now(),
            },
            module_outputs: outputs,
        }
    }
}
