//! Structural validation of module outputs.

use crate::models::ModuleOutput;
use serde_json::Value;

/// Returns true when `output` is structurally sound enough to be synthesized.
///
/// Checks that the module name is non-empty, that `analysis` is a JSON
/// object or array, and that `confidence` is a finite value in `[0, 1]`.
/// Insights and recommendations are typed lists, so their shape is
/// guaranteed by construction.
pub fn validate_output(output: &ModuleOutput) -> bool {
    if output.module_name.trim().is_empty() {
        return false;
    }

    if !matches!(output.analysis, Value::Object(_) | Value::Array(_)) {
        return false;
    }

    output.confidence.is_finite() && (0.0..=1.0).contains(&output.confidence)
}
