//! Test helpers: a scriptable analysis module and record builders.

use crate::models::{
    BusinessContext, Insight, InsightType, Level, ModuleCategory, ModuleMetadata, ModuleOutput,
    Priority, Recommendation, Timeframe,
};
use crate::modules::AnalysisModule;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Succeed,
    Fail(String),
    Panic,
}

/// An analysis module whose output and timing are fixed by the test.
pub(crate) struct StubModule {
    metadata: ModuleMetadata,
    confidence: f64,
    delay: Option<Duration>,
    behavior: Behavior,
    analysis: Value,
    insights: Vec<Insight>,
    recommendations: Vec<Recommendation>,
    /// Keys of `previous_analyses` seen by each `analyze` call.
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl StubModule {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            metadata: ModuleMetadata::new(name, ModuleCategory::Market),
            confidence: 0.8,
            delay: None,
            behavior: Behavior::Succeed,
            analysis: json!({ "summary": format!("{} analysis", name) }),
            insights: Vec::new(),
            recommendations: Vec::new(),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn with_category(mut self, category: ModuleCategory) -> Self {
        self.metadata.category = category;
        self
    }

    pub(crate) fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.metadata.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub(crate) fn requiring_competitor_data(mut self) -> Self {
        self.metadata.requires_competitor_data = true;
        self
    }

    pub(crate) fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub(crate) fn with_analysis(mut self, analysis: Value) -> Self {
        self.analysis = analysis;
        self
    }

    pub(crate) fn with_insights(mut self, insights: Vec<Insight>) -> Self {
        self.insights = insights;
        self
    }

    pub(crate) fn with_recommendations(mut self, recommendations: Vec<Recommendation>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub(crate) fn seen_handle(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl AnalysisModule for StubModule {
    fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    async fn analyze(&self, context: &BusinessContext) -> Result<ModuleOutput> {
        let mut keys: Vec<String> = context.previous_analyses.keys().cloned().collect();
        keys.sort();
        self.seen.lock().unwrap().push(keys);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Succeed => {}
            Behavior::Fail(message) => anyhow::bail!("{}", message),
            Behavior::Panic => panic!("stub module {} panicked", self.metadata.name),
        }

        Ok(ModuleOutput {
            module_name: self.metadata.name.clone(),
            category: self.metadata.category,
            execution_time_ms: self.delay.map(|d| d.as_millis() as u64).unwrap_or(0),
            confidence: self.confidence,
            analysis: self.analysis.clone(),
            insights: self.insights.clone(),
            recommendations: self.recommendations.clone(),
            timestamp: Utc::now(),
        })
    }
}

pub(crate) fn output_for(name: &str, confidence: f64) -> ModuleOutput {
    ModuleOutput {
        module_name: name.to_string(),
        category: ModuleCategory::Market,
        execution_time_ms: 10,
        confidence,
        analysis: json!({}),
        insights: Vec::new(),
        recommendations: Vec::new(),
        timestamp: Utc::now(),
    }
}

pub(crate) fn insight(insight_type: InsightType, priority: Priority, title: &str) -> Insight {
    Insight {
        insight_type,
        priority,
        title: title.to_string(),
        description: format!("{} details", title),
        confidence: None,
    }
}

pub(crate) fn recommendation(
    action: &str,
    timeframe: Timeframe,
    priority: Priority,
) -> Recommendation {
    Recommendation {
        action: action.to_string(),
        rationale: "Supported by the analysis".to_string(),
        priority,
        timeframe,
        expected_impact: Level::Medium,
        effort: Level::Medium,
        metrics: Vec::new(),
    }
}
