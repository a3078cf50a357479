//! Data models shared by workbench services.

pub mod content;
pub mod draft;
pub mod execution;
pub mod table;
pub mod warning;

// Re-export commonly used types
pub use content::{DraftContent, HttpMethod, RestRequest, SqlQuery};
pub use draft::{CreateDraftRequest, Draft, DraftKind, EditContentRequest, UpdateDraftRequest};
pub use execution::{ExecutionError, ExecutionMetadata, ExecutionResult, ExecutionStatus};
pub use table::{
    CrudAction, CrudTemplates, RelationshipType, Table, TableColumn, TableRelationship,
    ValidationRule,
};
pub use warning::{Severity, ValidationReport, ValidationSummary, Warning};
