//! Display formatting of executor payloads.

use serde_json::Value;

use crate::models::DraftKind;

/// Derives the display form of a raw executor payload.
pub struct ResultFormatter;

impl ResultFormatter {
    /// Formats `raw` for display.
    ///
    /// REST payloads that are, or parse as, JSON documents become a
    /// pretty-printed string. SQL payloads (row sets) pass through. Whenever
    /// formatting is not possible the raw payload is returned unchanged.
    pub fn format(raw: &Value, kind: DraftKind) -> Value {
        match kind {
            DraftKind::Rest => Self::format_rest(raw).unwrap_or_else(|| raw.clone()),
            DraftKind::Sql => raw.clone(),
        }
    }

    fn format_rest(raw: &Value) -> Option<Value> {
        match raw {
            Value::String(text) => {
                let parsed: Value = serde_json::from_str(text).ok()?;
                serde_json::to_string_pretty(&parsed).ok().map(Value::String)
            }
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string_pretty(raw).ok().map(Value::String)
            }
            _ => None,
        }
    }
}
