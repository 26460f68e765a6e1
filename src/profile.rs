//! Business profile loading.
//!
//! A profile is a small TOML or JSON document describing the business under
//! analysis. Competitor and financial sections are free-form and are handed to
//! the modules as JSON values.

use crate::models::BusinessContext;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct BusinessProfile {
    #[serde(default)]
    id: Option<String>,
    name: String,
    industry: String,
    #[serde(default)]
    description: String,
    #[serde(default, alias = "competitor_data")]
    competitors: Option<Value>,
    #[serde(default, alias = "financial_data")]
    financials: Option<Value>,
}

impl BusinessProfile {
    fn into_context(self) -> Result<BusinessContext> {
        if self.name.trim().is_empty() {
            bail!("Business profile has an empty name");
        }

        let business_id = match self.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => slugify(&self.name),
        };

        Ok(BusinessContext {
            business_id,
            name: self.name,
            industry: self.industry,
            description: self.description.trim().to_string(),
            competitor_data: self.competitors.filter(|v| !is_empty_value(v)),
            financial_data: self.financials.filter(|v| !is_empty_value(v)),
            previous_analyses: HashMap::new(),
        })
    }
}

/// Load a business profile. Files ending in `.json` are parsed as JSON,
/// everything else as TOML.
pub fn load_profile(path: &Path) -> Result<BusinessContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let context = if is_json {
        parse_json_profile(&content)
    } else {
        parse_toml_profile(&content)
    };

    context.with_context(|| format!("Invalid profile: {}", path.display()))
}

pub fn parse_toml_profile(content: &str) -> Result<BusinessContext> {
    let profile: BusinessProfile = toml::from_str(content).context("Failed to parse TOML profile")?;
    profile.into_context()
}

pub fn parse_json_profile(content: &str) -> Result<BusinessContext> {
    let profile: BusinessProfile =
        serde_json::from_str(content).context("Failed to parse JSON profile")?;
    profile.into_context()
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
