//! Validation findings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity of a validation finding. Only `Error` blocks execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One validation finding, optionally attributed to a content field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Warning {
    pub id: String,
    /// Owning draft; empty when the content was validated on its own.
    pub draft_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one validation pass, in check order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ValidationReport {
    pub warnings: Vec<Warning>,
}

impl ValidationReport {
    pub fn new(warnings: Vec<Warning>) -> Self {
        Self { warnings }
    }

    pub fn has_errors(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::Warning)
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.warnings.iter().filter(|w| w.severity == severity).count()
    }

    /// Attributes every finding to `draft_id`.
    pub fn attach_to(mut self, draft_id: &str) -> Self {
        for warning in &mut self.warnings {
            warning.draft_id = draft_id.to_string();
        }
        self
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Serializable summary including the derived predicates.
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            warnings: self.warnings.clone(),
            has_errors: self.has_errors(),
            has_warnings: self.has_warnings(),
            is_valid: self.is_valid(),
        }
    }
}

/// Validation report as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationSummary {
    pub warnings: Vec<Warning>,
    pub has_errors: bool,
    pub has_warnings: bool,
    pub is_valid: bool,
}
