//! Prompt-driven analysis modules.
//!
//! A [`PromptModule`] is configured by a [`ModuleDefinition`] (usually from
//! `.marketlens.toml`). It renders the business context and the outputs of its
//! dependencies into a prompt, asks the language model for a JSON reply, and
//! turns that reply into a [`ModuleOutput`].

use super::AnalysisModule;
use crate::llm::{parse_reply, LanguageModel};
use crate::models::{BusinessContext, ModuleCategory, ModuleMetadata, ModuleOutput, Priority};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Maximum number of insight titles quoted from each dependency.
const MAX_QUOTED_INSIGHTS: usize = 5;

/// Declarative description of a prompt-driven module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub name: String,
    pub category: ModuleCategory,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub requires_competitor_data: bool,
    #[serde(default)]
    pub requires_financial_data: bool,
    /// Task-specific instructions for the model.
    pub prompt: String,
}

impl ModuleDefinition {
    pub fn metadata(&self) -> ModuleMetadata {
        ModuleMetadata {
            name: self.name.clone(),
            category: self.category,
            dependencies: self.dependencies.clone(),
            priority: self.priority,
            requires_competitor_data: self.requires_competitor_data,
            requires_financial_data: self.requires_financial_data,
        }
    }
}

pub struct PromptModule {
    metadata: ModuleMetadata,
    instructions: String,
    model: Arc<dyn LanguageModel>,
}

impl PromptModule {
    pub fn new(definition: &ModuleDefinition, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            metadata: definition.metadata(),
            instructions: definition.prompt.clone(),
            model,
        }
    }

    /// Render the user prompt for this module.
    pub fn build_prompt(&self, context: &BusinessContext) -> String {
        let mut prompt = String::new();

        let _ = writeln!(prompt, "## Business\n");
        let _ = writeln!(prompt, "- Name: {}", context.name);
        let _ = writeln!(prompt, "- Industry: {}", context.industry);
        if !context.description.is_empty() {
            let _ = writeln!(prompt, "- Summary: {}", context.description);
        }
        if let Some(ref competitors) = context.competitor_data {
            let _ = writeln!(prompt, "- Competitor data: {}", competitors);
        }
        if let Some(ref financials) = context.financial_data {
            let _ = writeln!(prompt, "- Financial data: {}", financials);
        }

        let upstream: Vec<_> = self
            .metadata
            .dependencies
            .iter()
            .filter_map(|dep| context.previous_analyses.get(dep))
            .collect();

        if !upstream.is_empty() {
            let _ = writeln!(prompt, "\n## Results from earlier analyses\n");
            for output in upstream {
                let _ = writeln!(
                    prompt,
                    "### {} (confidence {:.0}%)",
                    output.module_name,
                    output.confidence * 100.0
                );
                let _ = writeln!(prompt, "{}", output.analysis);
                for insight in output.insights.iter().take(MAX_QUOTED_INSIGHTS) {
                    let _ = writeln!(prompt, "- {}: {}", insight.title, insight.description);
                }
            }
        }

        let _ = writeln!(prompt, "\n## Task\n\n{}\n", self.instructions.trim());
        prompt.push_str(RESPONSE_FORMAT);

        prompt
    }
}

#[async_trait]
impl AnalysisModule for PromptModule {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    async fn analyze(&self, context: &BusinessContext) -> Result<ModuleOutput> {
        let start = Instant::now();
        let prompt = self.build_prompt(context);
        debug!("Module {} prompt is {} bytes", self.metadata.name, prompt.len());

        let reply = self
            .model
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .with_context(|| format!("Model call for module {} failed", self.metadata.name))?;

        let parsed = parse_reply(&reply)
            .with_context(|| format!("Module {} returned an unusable reply", self.metadata.name))?;

        let elapsed = start.elapsed().as_millis() as u64;
        info!(
            "Module {} produced {} insights and {} recommendations in {}ms",
            self.metadata.name,
            parsed.insights.len(),
            parsed.recommendations.len(),
            elapsed
        );

        Ok(ModuleOutput {
            module_name: self.metadata.name.clone(),
            category: self.metadata.category,
            execution_time_ms: elapsed,
            confidence: parsed.confidence,
            analysis: parsed.analysis,
            insights: parsed.insights,
            recommendations: parsed.recommendations,
            timestamp: Utc::now(),
        })
    }
}

const SYSTEM_PROMPT: &str = r#"You are a senior marketing strategist.
Analyze the business described by the user and answer with ONE JSON object only.
Do not add explanations or markdown outside the JSON."#;

const RESPONSE_FORMAT: &str = r#"## Response format

{
  "confidence": 0.0-1.0,
  "analysis": { ...module specific findings... },
  "insights": [
    {"type": "opportunity|threat|observation|warning|recommendation",
     "priority": "critical|high|medium|low",
     "title": "Short title", "description": "One or two sentences"}
  ],
  "recommendations": [
    {"action": "What to do", "rationale": "Why",
     "priority": "critical|high|medium|low",
     "timeframe": "0-30 days|30-90 days|90-180 days|6-12 months|1+ years",
     "expected_impact": "low|medium|high", "effort": "low|medium|high",
     "metrics": ["Measurable success metric"]}
  ]
}
"#;
