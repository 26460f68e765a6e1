//! Aggregation steps of the strategic synthesis.
//!
//! Each function covers one step and can be tested on its own. All of them
//! walk module outputs in acceptance order, so the first module to report an
//! insight or recommendation supplies the canonical copy.

use super::themes::ThemeDefinition;
use crate::models::{
    ActionPlan, Insight, InsightBuckets, InsightType, MetricCategory, ModuleOutput, Priority,
    Recommendation, SuccessMetric, Theme, Timeframe,
};
use std::collections::{HashMap, HashSet};

/// Modules that must mention a theme before it is reported.
const THEME_MIN_MODULES: usize = 2;
/// Modules needed for a theme to be rated high priority.
const THEME_HIGH_PRIORITY_MODULES: usize = 3;

const FINANCIAL_KEYWORDS: &[&str] = &[
    "revenue", "profit", "margin", "cost", "roi", "sales", "price", "spend", "order value",
];
const CUSTOMER_KEYWORDS: &[&str] = &[
    "customer", "retention", "satisfaction", "nps", "churn", "loyalty", "review", "rating",
    "repeat",
];
const MARKET_KEYWORDS: &[&str] = &[
    "market", "share", "competitor", "brand", "awareness", "reach", "traffic", "visibility",
];

/// De-duplicate insights by case-insensitive title and sort them into buckets.
///
/// Observations become strengths at high priority or above and weaknesses at
/// medium priority; low-priority observations and recommendation-type
/// insights are not bucketed.
pub fn merge_insights(outputs: &[ModuleOutput]) -> InsightBuckets {
    let mut seen: HashSet<String> = HashSet::new();
    let mut buckets = InsightBuckets::default();

    for insight in outputs.iter().flat_map(|o| &o.insights) {
        if !seen.insert(insight.title.to_lowercase()) {
            continue;
        }

        match insight.insight_type {
            InsightType::Opportunity => buckets.opportunities.push(insight.clone()),
            InsightType::Threat | InsightType::Warning => buckets.threats.push(insight.clone()),
            InsightType::Observation if insight.priority >= Priority::High => {
                buckets.strengths.push(insight.clone())
            }
            InsightType::Observation if insight.priority == Priority::Medium => {
                buckets.weaknesses.push(insight.clone())
            }
            _ => {}
        }
    }

    buckets
}

/// Collapse recommendations that several modules propose.
///
/// Recommendations sharing a cross-reference key keep the first copy, which
/// is raised to high priority (unless already critical) and annotated with
/// the number of confirming analyses.
pub fn cross_reference_recommendations(outputs: &[ModuleOutput]) -> Vec<Recommendation> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Recommendation>> = HashMap::new();

    for rec in outputs.iter().flat_map(|o| &o.recommendations) {
        let key = rec.cross_reference_key();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(rec);
    }

    order
        .iter()
        .filter_map(|key| groups.get(key))
        .map(|group| {
            let mut canonical = group[0].clone();
            if group.len() > 1 {
                if canonical.priority < Priority::Critical {
                    canonical.priority = Priority::High;
                }
                canonical.rationale = format!(
                    "{} (confirmed by {} analyses)",
                    canonical.rationale,
                    group.len()
                );
            }
            canonical
        })
        .collect()
}

/// Partition recommendations into time-phased buckets.
pub fn build_action_plan(recommendations: Vec<Recommendation>) -> ActionPlan {
    let mut plan = ActionPlan::default();

    for rec in recommendations {
        match rec.timeframe {
            Timeframe::Days0To30 => plan.immediate.push(rec),
            Timeframe::Days30To90 => plan.short_term.push(rec),
            Timeframe::Days90To180 => plan.medium_term.push(rec),
            Timeframe::Months6To12 | Timeframe::OverOneYear => plan.long_term.push(rec),
        }
    }

    plan
}

/// Find themes that several modules raise independently.
pub fn detect_themes(outputs: &[ModuleOutput], definitions: &[ThemeDefinition]) -> Vec<Theme> {
    let module_texts: Vec<(&str, String)> = outputs
        .iter()
        .map(|o| (o.module_name.as_str(), insight_text(&o.insights)))
        .collect();

    definitions
        .iter()
        .filter_map(|definition| {
            let keywords: Vec<String> = definition
                .keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();

            let supporting: Vec<String> = module_texts
                .iter()
                .filter(|(_, text)| keywords.iter().any(|k| text.contains(k.as_str())))
                .map(|(name, _)| name.to_string())
                .collect();

            if supporting.len() < THEME_MIN_MODULES {
                return None;
            }

            Some(Theme {
                name: definition.name.clone(),
                priority: if supporting.len() >= THEME_HIGH_PRIORITY_MODULES {
                    Priority::High
                } else {
                    Priority::Medium
                },
                supporting_modules: supporting,
            })
        })
        .collect()
}

fn insight_text(insights: &[Insight]) -> String {
    insights
        .iter()
        .map(|i| format!("{} {}", i.title, i.description))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Collect the distinct success metrics of all recommendations.
pub fn extract_metrics(outputs: &[ModuleOutput]) -> Vec<SuccessMetric> {
    let mut seen: HashSet<String> = HashSet::new();

    outputs
        .iter()
        .flat_map(|o| &o.recommendations)
        .flat_map(|r| &r.metrics)
        .filter(|m| seen.insert(m.to_string()))
        .map(|m| SuccessMetric {
            metric: m.clone(),
            category: classify_metric(m),
        })
        .collect()
}

/// Keyword classification; checked financial, customer, market, then operational.
pub fn classify_metric(metric: &str) -> MetricCategory {
    let lower = metric.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if matches(FINANCIAL_KEYWORDS) {
        MetricCategory::Financial
    } else if matches(CUSTOMER_KEYWORDS) {
        MetricCategory::Customer
    } else if matches(MARKET_KEYWORDS) {
        MetricCategory::Market
    } else {
        MetricCategory::Operational
    }
}

/// Mean confidence of all outputs, or 0 when there are none.
pub fn overall_confidence(outputs: &[ModuleOutput]) -> f64 {
    if outputs.is_empty() {
        return 0.0;
    }
    outputs.iter().map(|o| o.confidence).sum::<f64>() / outputs.len() as f64
}

/// Generate the executive summary paragraph.
pub fn executive_summary(
    business_name: &str,
    module_count: usize,
    insights: &InsightBuckets,
    themes: &[Theme],
    confidence: f64,
) -> String {
    if module_count == 0 {
        return format!(
            "No analysis modules produced usable results for {}. \
             0 opportunities and 0 threats were identified; \
             no strategic data is available for this run.",
            business_name
        );
    }

    let theme_text = if themes.is_empty() {
        "no cross-cutting themes emerged".to_string()
    } else {
        let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
        format!("key themes: {}", names.join(", "))
    };

    format!(
        "Strategic analysis of {} across {} modules identified \
         {} opportunities and {} threats; {}. Overall confidence: {:.0}%.",
        business_name,
        module_count,
        insights.opportunities.len(),
        insights.threats.len(),
        theme_text,
        confidence * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insight, output_for, recommendation};

    fn with_insights(name: &str, insights: Vec<Insight>) -> ModuleOutput {
        let mut output = output_for(name, 0.8);
        output.insights = insights;
        output
    }

    fn with_recommendations(name: &str, recs: Vec<Recommendation>) -> ModuleOutput {
        let mut output = output_for(name, 0.8);
        output.recommendations = recs;
        output
    }

    #[test]
    fn test_merge_insights_dedups_case_insensitively() {
        let outputs = vec![
            with_insights(
                "a",
                vec![insight(InsightType::Opportunity, Priority::High, "Expand Online Ordering")],
            ),
            with_insights(
                "b",
                vec![insight(InsightType::Opportunity, Priority::Low, "expand online ORDERING")],
            ),
        ];

        let buckets = merge_insights(&outputs);

        assert_eq!(buckets.opportunities.len(), 1);
        assert_eq!(buckets.opportunities[0].priority, Priority::High);
    }

    #[test]
    fn test_merge_insights_buckets() {
        let outputs = vec![with_insights(
            "a",
            vec![
                insight(InsightType::Opportunity, Priority::Medium, "o"),
                insight(InsightType::Threat, Priority::High, "t"),
                insight(InsightType::Warning, Priority::Low, "w"),
                insight(InsightType::Observation, Priority::Critical, "s1"),
                insight(InsightType::Observation, Priority::High, "s2"),
                insight(InsightType::Observation, Priority::Medium, "weak"),
                insight(InsightType::Observation, Priority::Low, "ignored"),
                insight(InsightType::Recommendation, Priority::High, "also ignored"),
            ],
        )];

        let buckets = merge_insights(&outputs);

        assert_eq!(buckets.opportunities.len(), 1);
        assert_eq!(buckets.threats.len(), 2);
        assert_eq!(buckets.strengths.len(), 2);
        assert_eq!(buckets.weaknesses.len(), 1);
        assert_eq!(buckets.total(), 6);
    }

    #[test]
    fn test_first_title_wins_across_types() {
        let outputs = vec![
            with_insights("a", vec![insight(InsightType::Threat, Priority::High, "Rent")]),
            with_insights("b", vec![insight(InsightType::Opportunity, Priority::High, "RENT")]),
        ];

        let buckets = merge_insights(&outputs);
        assert_eq!(buckets.threats.len(), 1);
        assert!(buckets.opportunities.is_empty());
    }

    #[test]
    fn test_cross_reference_boosts_confirmed_recommendations() {
        let prefix = "Launch a loyalty program for repeat weekday breakfast customers";
        let outputs = vec![
            with_recommendations(
                "a",
                vec![recommendation(
                    &format!("{} now", prefix),
                    Timeframe::Days0To30,
                    Priority::Medium,
                )],
            ),
            with_recommendations(
                "b",
                vec![recommendation(
                    &format!("{} with app", prefix.to_uppercase()),
                    Timeframe::Days30To90,
                    Priority::Medium,
                )],
            ),
            with_recommendations(
                "c",
                vec![recommendation(prefix, Timeframe::Days0To30, Priority::Medium)],
            ),
        ];

        let recs = cross_reference_recommendations(&outputs);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::High);
        assert!(recs[0].rationale.contains("confirmed by 3 analyses"));
        assert_eq!(recs[0].timeframe, Timeframe::Days0To30);
    }

    #[test]
    fn test_cross_reference_keeps_critical_and_singletons() {
        let outputs = vec![
            with_recommendations(
                "a",
                vec![
                    recommendation(
                        "Fix health inspection issues",
                        Timeframe::Days0To30,
                        Priority::Critical,
                    ),
                    recommendation("Refresh menu boards", Timeframe::Days90To180, Priority::Low),
                ],
            ),
            with_recommendations(
                "b",
                vec![recommendation(
                    "fix health inspection issues",
                    Timeframe::Days0To30,
                    Priority::Low,
                )],
            ),
        ];

        let recs = cross_reference_recommendations(&outputs);

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].priority, Priority::Critical);
        assert!(recs[0].rationale.ends_with("(confirmed by 2 analyses)"));
        assert_eq!(recs[1].priority, Priority::Low);
        assert_eq!(recs[1].rationale, "Supported by the analysis");
    }

    #[test]
    fn test_build_action_plan() {
        let plan = build_action_plan(vec![
            recommendation("a", Timeframe::Days0To30, Priority::High),
            recommendation("b", Timeframe::Days30To90, Priority::High),
            recommendation("c", Timeframe::Days90To180, Priority::High),
            recommendation("d", Timeframe::Months6To12, Priority::High),
            recommendation("e", Timeframe::OverOneYear, Priority::High),
        ]);

        assert_eq!(plan.immediate.len(), 1);
        assert_eq!(plan.short_term.len(), 1);
        assert_eq!(plan.medium_term.len(), 1);
        assert_eq!(plan.long_term.len(), 2);
    }

    #[test]
    fn test_detect_themes() {
        let definitions = vec![
            ThemeDefinition::new("Digital Presence", &["online", "social media"]),
            ThemeDefinition::new("Pricing", &["price"]),
            ThemeDefinition::new("Loyalty", &["loyalty"]),
        ];
        let outputs = vec![
            with_insights(
                "a",
                vec![insight(InsightType::Opportunity, Priority::High, "Online ordering")],
            ),
            with_insights(
                "b",
                vec![insight(InsightType::Threat, Priority::High, "Weak SOCIAL MEDIA")],
            ),
            with_insights(
                "c",
                vec![insight(
                    InsightType::Observation,
                    Priority::High,
                    "Online reviews; price hikes",
                )],
            ),
            with_insights(
                "d",
                vec![insight(InsightType::Observation, Priority::High, "Loyalty card")],
            ),
        ];

        let themes = detect_themes(&outputs, &definitions);

        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].name, "Digital Presence");
        assert_eq!(themes[0].priority, Priority::High);
        assert_eq!(themes[0].supporting_modules, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_theme_with_two_modules_is_medium() {
        let definitions = vec![ThemeDefinition::new("Pricing", &["price"])];
        let outputs = vec![
            with_insights(
                "a",
                vec![insight(InsightType::Threat, Priority::High, "Price war")],
            ),
            with_insights(
                "b",
                vec![insight(InsightType::Threat, Priority::High, "Price pressure")],
            ),
            with_insights(
                "c",
                vec![insight(InsightType::Threat, Priority::High, "Rent increase")],
            ),
        ];

        let themes = detect_themes(&outputs, &definitions);

        assert_eq!(themes.len(), 1);
        assert_eq!(themes[0].priority, Priority::Medium);
        assert_eq!(themes[0].supporting_modules, vec!["a", "b"]);
    }

    #[test]
    fn test_extract_metrics_dedups_and_classifies() {
        let mut first = recommendation("a", Timeframe::Days0To30, Priority::High);
        first.metrics = vec!["Monthly revenue".to_string(), "Customer retention rate".to_string()];
        let mut second = recommendation("b", Timeframe::Days0To30, Priority::High);
        second.metrics = vec![
            "Monthly revenue".to_string(),
            "Local market share".to_string(),
            "Average prep time".to_string(),
        ];
        let outputs = vec![with_recommendations("x", vec![first, second])];

        let metrics = extract_metrics(&outputs);

        let categories: Vec<_> = metrics.iter().map(|m| m.category).collect();
        assert_eq!(
            categories,
            vec![
                MetricCategory::Financial,
                MetricCategory::Customer,
                MetricCategory::Market,
                MetricCategory::Operational,
            ]
        );
    }

    #[test]
    fn test_classify_metric_check_order() {
        // Financial keywords are checked before customer keywords
        assert_eq!(classify_metric("Customer acquisition cost"), MetricCategory::Financial);
        assert_eq!(classify_metric("NPS score"), MetricCategory::Customer);
    }

    #[test]
    fn test_overall_confidence() {
        assert_eq!(overall_confidence(&[]), 0.0);
        let outputs = vec![output_for("a", 0.9), output_for("b", 0.5)];
        assert!((overall_confidence(&outputs) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_executive_summary() {
        let buckets = InsightBuckets {
            opportunities: vec![insight(InsightType::Opportunity, Priority::High, "o")],
            ..Default::default()
        };
        let themes = vec![Theme {
            name: "Digital Presence".to_string(),
            priority: Priority::High,
            supporting_modules: vec![],
        }];

        let summary = executive_summary("Corner Bakery", 3, &buckets, &themes, 0.756);

        assert!(summary.contains("Corner Bakery"));
        assert!(summary.contains("3 modules"));
        assert!(summary.contains("1 opportunities and 0 threats"));
        assert!(summary.contains("Digital Presence"));
        assert!(summary.contains("76%"));
    }

    #[test]
    fn test_executive_summary_without_data() {
        let summary = executive_summary("Corner Bakery", 0, &InsightBuckets::default(), &[], 0.0);
        assert!(summary.contains("No analysis modules produced usable results"));
        assert!(summary.contains("0 opportunities"));
    }
}
