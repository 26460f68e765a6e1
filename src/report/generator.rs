//! Markdown and JSON report generation.
//!
//! Renders a [`StrategicSynthesis`] as a readable strategy brief.

use crate::models::{
    ActionPlan, Insight, InsightBuckets, MetricCategory, Recommendation, StrategicSynthesis,
    SuccessMetric, SynthesisMetadata, Theme,
};
use anyhow::Result;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(synthesis: &StrategicSynthesis, model_used: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "# Strategy Report: {}\n\n",
        synthesis.metadata.business_name
    ));

    output.push_str(&generate_metadata_section(
        &synthesis.metadata,
        synthesis.confidence_score,
        model_used,
    ));

    output.push_str("## Executive Summary\n\n");
    output.push_str(&synthesis.executive_summary);
    output.push_str("\n\n");

    output.push_str(&generate_insights_section(&synthesis.insights));
    output.push_str(&generate_themes_section(&synthesis.themes));
    output.push_str(&generate_action_plan_section(&synthesis.action_plan));
    output.push_str(&generate_metrics_section(&synthesis.success_metrics));
    output.push_str(&generate_execution_section(synthesis));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(
    metadata: &SynthesisMetadata,
    confidence: f64,
    model_used: &str,
) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Business ID:** {}\n", metadata.business_id));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", model_used));
    section.push_str(&format!(
        "- **Modules Executed:** {}\n",
        metadata.agents_executed.len()
    ));
    if !metadata.skipped.is_empty() {
        section.push_str(&format!("- **Modules Skipped:** {}\n", metadata.skipped.len()));
    }
    section.push_str(&format!("- **Confidence:** {:.0}%\n", confidence * 100.0));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        metadata.total_execution_time_ms as f64 / 1000.0
    ));

    section
}

fn generate_insights_section(insights: &InsightBuckets) -> String {
    let mut section = String::new();

    section.push_str("## Strategic Insights\n\n");

    if insights.total() == 0 {
        section.push_str("No insights were produced in this run.\n\n");
        return section;
    }

    section.push_str("| Opportunities | Threats | Strengths | Weaknesses |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        insights.opportunities.len(),
        insights.threats.len(),
        insights.strengths.len(),
        insights.weaknesses.len()
    ));

    for (heading, bucket) in [
        ("Opportunities", &insights.opportunities),
        ("Threats", &insights.threats),
        ("Strengths", &insights.strengths),
        ("Weaknesses", &insights.weaknesses),
    ] {
        if bucket.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", heading));
        for insight in bucket {
            section.push_str(&generate_insight_line(insight));
        }
        section.push('\n');
    }

    section
}

fn generate_insight_line(insight: &Insight) -> String {
    let mut line = format!(
        "- {} **{}** ({})",
        insight.priority.emoji(),
        insight.title,
        insight.priority
    );
    if !insight.description.is_empty() {
        line.push_str(&format!(": {}", insight.description));
    }
    line.push('\n');
    line
}

fn generate_themes_section(themes: &[Theme]) -> String {
    if themes.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Cross-Cutting Themes\n\n");
    section.push_str("| Theme | Priority | Raised By |\n");
    section.push_str("|:---|:---:|:---|\n");
    for theme in themes {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            theme.name,
            theme.priority,
            theme.supporting_modules.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_action_plan_section(plan: &ActionPlan) -> String {
    let mut section = String::new();

    section.push_str("## Action Plan\n\n");

    if plan.is_empty() {
        section.push_str("No recommendations were produced in this run.\n\n");
        return section;
    }

    for (heading, bucket) in [
        ("Immediate (0-30 days)", &plan.immediate),
        ("Short Term (30-90 days)", &plan.short_term),
        ("Medium Term (90-180 days)", &plan.medium_term),
        ("Long Term (6+ months)", &plan.long_term),
    ] {
        if bucket.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", heading));
        for (i, rec) in bucket.iter().enumerate() {
            section.push_str(&generate_recommendation_block(i + 1, rec));
        }
    }

    section
}

fn generate_recommendation_block(index: usize, rec: &Recommendation) -> String {
    let mut block = format!(
        "{}. {} **{}**\n",
        index,
        rec.priority.emoji(),
        rec.action
    );
    if !rec.rationale.is_empty() {
        block.push_str(&format!("   - *Why:* {}\n", rec.rationale));
    }
    block.push_str(&format!(
        "   - *Impact:* {} | *Effort:* {} | *Timeframe:* {}\n",
        rec.expected_impact, rec.effort, rec.timeframe
    ));
    if !rec.metrics.is_empty() {
        block.push_str(&format!("   - *Track:* {}\n", rec.metrics.join("; ")));
    }
    block.push('\n');
    block
}

fn generate_metrics_section(metrics: &[SuccessMetric]) -> String {
    if metrics.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Success Metrics\n\n");

    for category in [
        MetricCategory::Financial,
        MetricCategory::Customer,
        MetricCategory::Market,
        MetricCategory::Operational,
    ] {
        let names: Vec<&str> = metrics
            .iter()
            .filter(|m| m.category == category)
            .map(|m| m.metric.as_str())
            .collect();
        if names.is_empty() {
            continue;
        }
        section.push_str(&format!("- **{}:** {}\n", category, names.join(", ")));
    }
    section.push('\n');

    section
}

fn generate_execution_section(synthesis: &StrategicSynthesis) -> String {
    let mut section = String::new();

    section.push_str("## Module Execution\n\n");

    if !synthesis.module_outputs.is_empty() {
        section.push_str("| Module | Category | Confidence | Time |\n");
        section.push_str("|:---|:---|:---:|---:|\n");
        for output in &synthesis.module_outputs {
            section.push_str(&format!(
                "| {} | {} | {:.0}% | {}ms |\n",
                output.module_name,
                output.category,
                output.confidence * 100.0,
                output.execution_time_ms
            ));
        }
        section.push('\n');
    }

    let stages = &synthesis.metadata.stages;
    if !stages.is_empty() {
        section.push_str("**Stages:** ");
        let rendered: Vec<String> = stages
            .iter()
            .enumerate()
            .map(|(i, names)| format!("{}: {}", i + 1, names.join(", ")))
            .collect();
        section.push_str(&rendered.join(" → "));
        section.push_str("\n\n");
    }

    if !synthesis.metadata.skipped.is_empty() {
        section.push_str("### Skipped Modules\n\n");
        for skipped in &synthesis.metadata.skipped {
            section.push_str(&format!("- `{}`: {}\n", skipped.module, skipped.reason));
        }
        section.push('\n');
    }

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by marketlens*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(synthesis: &StrategicSynthesis) -> Result<String> {
    serde_json::to_string_pretty(synthesis).map_err(Into::into)
}

/// Write report content, creating parent directories as needed.
pub fn save_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}
