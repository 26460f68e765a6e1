//! Parsing of model replies into structured module results.
//!
//! Models are asked for a single JSON object but frequently wrap it in code
//! fences or prose. Field values are read leniently: unknown labels fall back
//! to defaults instead of failing the whole reply.

use crate::models::{Insight, InsightType, Level, Priority, Recommendation, Timeframe};
use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// The structured part of a module reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub confidence: f64,
    pub analysis: Value,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

/// Parse a model reply into insights, recommendations and the analysis payload.
pub fn parse_reply(response: &str) -> Result<ParsedReply> {
    let json = extract_json_object(response)
        .ok_or_else(|| anyhow::anyhow!("Model reply did not contain a JSON object"))?;

    let insights: Vec<Insight> = json["insights"]
        .as_array()
        .map(|items| items.iter().filter_map(json_to_insight).collect())
        .unwrap_or_default();

    let recommendations: Vec<Recommendation> = json["recommendations"]
        .as_array()
        .map(|items| items.iter().filter_map(json_to_recommendation).collect())
        .unwrap_or_default();

    let analysis = match &json["analysis"] {
        v @ (Value::Object(_) | Value::Array(_)) => v.clone(),
        Value::String(s) => json!({ "summary": s }),
        _ => json!({}),
    };

    debug!(
        "Parsed reply: {} insights, {} recommendations",
        insights.len(),
        recommendations.len()
    );

    Ok(ParsedReply {
        confidence: json["confidence"]
            .as_f64()
            .map(normalize_confidence)
            .unwrap_or(DEFAULT_CONFIDENCE),
        analysis,
        insights,
        recommendations,
    })
}

/// Find the first JSON object in free-form text.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Accepts 0..1 scores and 0..100 percentages.
fn normalize_confidence(raw: f64) -> f64 {
    let score = if raw > 1.0 && raw <= 100.0 {
        raw / 100.0
    } else {
        raw
    };
    score.clamp(0.0, 1.0)
}

fn json_to_insight(json: &Value) -> Option<Insight> {
    Some(Insight {
        insight_type: InsightType::from_label(json["type"].as_str().unwrap_or("observation")),
        priority: Priority::from_label(json["priority"].as_str().unwrap_or("medium")),
        title: json["title"].as_str()?.trim().to_string(),
        description: json["description"].as_str().unwrap_or("").to_string(),
        confidence: json["confidence"].as_f64().map(normalize_confidence),
    })
}

fn json_to_recommendation(json: &Value) -> Option<Recommendation> {
    let timeframe = json["timeframe"]
        .as_str()
        .and_then(Timeframe::from_label)
        .unwrap_or(Timeframe::Days30To90);

    Some(Recommendation {
        action: json["action"].as_str()?.trim().to_string(),
        rationale: json["rationale"].as_str().unwrap_or("").to_string(),
        priority: Priority::from_label(json["priority"].as_str().unwrap_or("medium")),
        timeframe,
        expected_impact: Level::from_label(json["expected_impact"].as_str().unwrap_or("medium")),
        effort: Level::from_label(json["effort"].as_str().unwrap_or("medium")),
        metrics: json["metrics"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m.as_str())
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
    })
}
