//! Unique ID generator.

use uuid::Uuid;

/// Generates identifiers for workbench entities.
pub struct IdGenerator;

impl IdGenerator {
    /// Identifier for a new draft.
    pub fn draft_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Identifier for a validation finding.
    pub fn warning_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Identifier for an execution result.
    pub fn result_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Identifier for an incoming HTTP request.
    pub fn request_id() -> String {
        Uuid::new_v4().to_string()
    }
}
