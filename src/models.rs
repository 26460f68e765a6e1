//! Data models for the marketing intelligence engine.
//!
//! This module contains the core data structures shared by the analysis
//! modules, the orchestrator and the synthesizer: the business context,
//! module outputs with their insights and recommendations, and the final
//! strategic synthesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Priority level of a module, insight or recommendation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to have
    Low,
    /// Worth scheduling
    #[default]
    Medium,
    /// Should be acted on soon
    High,
    /// Demands immediate attention
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

impl Priority {
    /// Returns an emoji representation of the priority.
    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🟠",
            Priority::Critical => "🔴",
        }
    }

    /// Lenient parse used for model output. Unknown labels map to medium.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" | "urgent" => Priority::Critical,
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

/// Capability category of an analysis module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    Market,
    Competitive,
    Customer,
    Financial,
    Marketing,
    Strategy,
}

impl ModuleCategory {
    pub const ALL: [ModuleCategory; 6] = [
        ModuleCategory::Market,
        ModuleCategory::Competitive,
        ModuleCategory::Customer,
        ModuleCategory::Financial,
        ModuleCategory::Marketing,
        ModuleCategory::Strategy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleCategory::Market => "market",
            ModuleCategory::Competitive => "competitive",
            ModuleCategory::Customer => "customer",
            ModuleCategory::Financial => "financial",
            ModuleCategory::Marketing => "marketing",
            ModuleCategory::Strategy => "strategy",
        }
    }
}

impl fmt::Display for ModuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CATEGORY_NAMES: &str = "market, competitive, customer, financial, marketing, strategy";

/// Error returned when a category name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown module category '{0}' (expected one of: {names})", names = CATEGORY_NAMES)]
pub struct CategoryParseError(pub String);

impl FromStr for ModuleCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        ModuleCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}

/// Static description of an analysis module, fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Unique module name (registry key).
    pub name: String,
    /// Capability category used for scoped runs.
    pub category: ModuleCategory,
    /// Names of modules whose output must be available before this one runs.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Relative importance of the module.
    #[serde(default)]
    pub priority: Priority,
    /// The module needs `BusinessContext::competitor_data`.
    #[serde(default)]
    pub requires_competitor_data: bool,
    /// The module needs `BusinessContext::financial_data`.
    #[serde(default)]
    pub requires_financial_data: bool,
}

impl ModuleMetadata {
    pub fn new(name: impl Into<String>, category: ModuleCategory) -> Self {
        Self {
            name: name.into(),
            category,
            dependencies: Vec::new(),
            priority: Priority::Medium,
            requires_competitor_data: false,
            requires_financial_data: false,
        }
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// The subject of an analysis run.
///
/// Owned by the caller. The orchestrator never mutates it; between stages it
/// works on a clone whose `previous_analyses` has been extended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessContext {
    pub business_id: String,
    pub name: String,
    pub industry: String,
    /// Free-text summary of the business.
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_data: Option<serde_json::Value>,
    /// Prior module outputs keyed by module name.
    #[serde(default)]
    pub previous_analyses: HashMap<String, ModuleOutput>,
}

impl BusinessContext {
    /// Returns a copy of this context whose `previous_analyses` also holds `outputs`.
    pub fn enriched_with<'a, I>(&self, outputs: I) -> Self
    where
        I: IntoIterator<Item = &'a ModuleOutput>,
    {
        let mut enriched = self.clone();
        for output in outputs {
            enriched
                .previous_analyses
                .insert(output.module_name.clone(), output.clone());
        }
        enriched
    }
}

/// Classification of an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Opportunity,
    Threat,
    Recommendation,
    Observation,
    Warning,
}

impl InsightType {
    /// Lenient parse used for model output. Unknown labels are observations.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "opportunity" => InsightType::Opportunity,
            "threat" | "risk" => InsightType::Threat,
            "recommendation" => InsightType::Recommendation,
            "warning" => InsightType::Warning,
            _ => InsightType::Observation,
        }
    }
}

/// A single finding reported by a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub priority: Priority,
    /// Short title; de-duplication key (case-insensitive).
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Discrete time horizon of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "0-30 days")]
    Days0To30,
    #[serde(rename = "30-90 days")]
    Days30To90,
    #[serde(rename = "90-180 days")]
    Days90To180,
    #[serde(rename = "6-12 months")]
    Months6To12,
    #[serde(rename = "1+ years")]
    OverOneYear,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Days0To30 => "0-30 days",
            Timeframe::Days30To90 => "30-90 days",
            Timeframe::Days90To180 => "90-180 days",
            Timeframe::Months6To12 => "6-12 months",
            Timeframe::OverOneYear => "1+ years",
        }
    }

    /// Parses one of the five fixed bucket labels.
    pub fn from_label(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "0-30days" => Some(Timeframe::Days0To30),
            "30-90days" => Some(Timeframe::Days30To90),
            "90-180days" => Some(Timeframe::Days90To180),
            "6-12months" => Some(Timeframe::Months6To12),
            "1+years" | "1+year" => Some(Timeframe::OverOneYear),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Low/medium/high scale for expected impact and effort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
}

impl Level {
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Level::Low,
            "high" => Level::High,
            _ => Level::Medium,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "Low"),
            Level::Medium => write!(f, "Medium"),
            Level::High => write!(f, "High"),
        }
    }
}

/// A recommended action reported by a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub rationale: String,
    pub priority: Priority,
    pub timeframe: Timeframe,
    pub expected_impact: Level,
    pub effort: Level,
    /// Measurable success metrics.
    #[serde(default)]
    pub metrics: Vec<String>,
}

impl Recommendation {
    /// Key used to detect the same action proposed by several modules.
    pub fn cross_reference_key(&self) -> String {
        self.action.to_lowercase().chars().take(50).collect()
    }
}

/// Result of one successful module execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutput {
    pub module_name: String,
    pub category: ModuleCategory,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Module-specific structured payload.
    pub analysis: serde_json::Value,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    pub timestamp: DateTime<Utc>,
}

/// Insights grouped into the four synthesis categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightBuckets {
    pub opportunities: Vec<Insight>,
    pub threats: Vec<Insight>,
    pub strengths: Vec<Insight>,
    pub weaknesses: Vec<Insight>,
}

impl InsightBuckets {
    pub fn total(&self) -> usize {
        self.opportunities.len() + self.threats.len() + self.strengths.len() + self.weaknesses.len()
    }
}

/// Recommendations grouped by time horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub immediate: Vec<Recommendation>,
    pub short_term: Vec<Recommendation>,
    pub medium_term: Vec<Recommendation>,
    pub long_term: Vec<Recommendation>,
}

impl ActionPlan {
    pub fn total(&self) -> usize {
        self.immediate.len() + self.short_term.len() + self.medium_term.len() + self.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A topic raised independently by several modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub priority: Priority,
    /// Modules whose insights mention the theme, in acceptance order.
    pub supporting_modules: Vec<String>,
}

/// Category of a success metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Financial,
    Customer,
    Market,
    Operational,
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricCategory::Financial => write!(f, "Financial"),
            MetricCategory::Customer => write!(f, "Customer"),
            MetricCategory::Market => write!(f, "Market"),
            MetricCategory::Operational => write!(f, "Operational"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetric {
    pub metric: String,
    pub category: MetricCategory,
}

/// A module that was requested but produced no accepted output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedModule {
    pub module: String,
    pub reason: String,
}

/// Metadata about an orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisMetadata {
    pub business_id: String,
    pub business_name: String,
    /// Names of modules whose output was accepted, in acceptance order.
    pub agents_executed: Vec<String>,
    pub skipped: Vec<SkippedModule>,
    /// Module names per executed stage.
    pub stages: Vec<Vec<String>>,
    pub total_execution_time_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// The aggregated report of one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategicSynthesis {
    pub executive_summary: String,
    /// Mean confidence of the accepted modules (0 when none).
    pub confidence_score: f64,
    pub insights: InsightBuckets,
    pub action_plan: ActionPlan,
    pub themes: Vec<Theme>,
    pub success_metrics: Vec<SuccessMetric>,
    pub module_outputs: Vec<ModuleOutput>,
    pub metadata: SynthesisMetadata,
}

impl StrategicSynthesis {
    /// Looks up an accepted module output by name.
    pub fn output(&self, module_name: &str) -> Option<&ModuleOutput> {
        self.module_outputs
            .iter()
            .find(|o| o.module_name == module_name)
    }
}
