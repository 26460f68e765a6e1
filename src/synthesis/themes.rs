//! Keyword tables for cross-module theme detection.

use serde::{Deserialize, Serialize};

/// A named theme and the keywords that signal it in insight text.
///
/// Keywords are matched case-insensitively as substrings, so a stem such as
/// `"differentiat"` covers every inflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeDefinition {
    pub name: String,
    pub keywords: Vec<String>,
}

impl ThemeDefinition {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in theme table used when the configuration defines none.
pub fn default_themes() -> Vec<ThemeDefinition> {
    vec![
        ThemeDefinition::new(
            "Digital Presence",
            &["digital", "online", "website", "social media", "ecommerce", "e-commerce", "seo"],
        ),
        ThemeDefinition::new(
            "Customer Experience",
            &["customer experience", "satisfaction", "service quality", "loyalty", "retention"],
        ),
        ThemeDefinition::new(
            "Competitive Pressure",
            &["competitor", "competitive", "competition", "market share", "rival", "differentiat"],
        ),
        ThemeDefinition::new(
            "Growth & Expansion",
            &["growth", "expand", "expansion", "new market", "new location"],
        ),
        ThemeDefinition::new(
            "Pricing & Profitability",
            &["pricing", "price", "margin", "profit", "cost"],
        ),
        ThemeDefinition::new(
            "Brand & Awareness",
            &["brand", "awareness", "reputation", "positioning"],
        ),
    ]
}
