//! Request draft models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::content::{DraftContent, RestRequest, SqlQuery};
use super::warning::Warning;

/// Which payload of a draft is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DraftKind {
    Rest,
    Sql,
}

impl DraftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftKind::Rest => "rest",
            DraftKind::Sql => "sql",
        }
    }
}

impl std::fmt::Display for DraftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" => Ok(DraftKind::Rest),
            "sql" => Ok(DraftKind::Sql),
            other => Err(format!("unknown draft kind: {}", other)),
        }
    }
}

/// An editable REST request or SQL query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct Draft {
    pub id: String,
    pub connection_id: String,
    #[serde(rename = "type")]
    pub kind: DraftKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Encoded [`DraftContent`].
    pub content: String,
    /// Findings of the last validation pass over `content` for `kind`.
    #[serde(default)]
    pub warnings: Vec<Warning>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Draft {
    /// Decoded content; never fails.
    pub fn decoded_content(&self) -> DraftContent {
        DraftContent::decode(&self.content)
    }
}

/// Request body for creating a draft.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDraftRequest {
    /// Connection the draft runs against.
    #[serde(default)]
    pub connection_id: String,
    #[serde(rename = "type")]
    pub kind: DraftKind,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    /// Initial content; defaults to empty REST and SQL payloads.
    pub content: Option<DraftContent>,
}

/// Partial update of a draft. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDraftRequest {
    pub connection_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<DraftKind>,
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    /// Replacement content, applied immediately rather than debounced.
    pub content: Option<DraftContent>,
}

impl UpdateDraftRequest {
    pub fn kind(kind: DraftKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn content(content: DraftContent) -> Self {
        Self {
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

/// An edit of one or both payloads, committed through autosave.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EditContentRequest {
    pub rest: Option<RestRequest>,
    pub sql: Option<SqlQuery>,
}

impl From<EditContentRequest> for DraftContent {
    fn from(edit: EditContentRequest) -> Self {
        DraftContent {
            rest: edit.rest,
            sql: edit.sql,
        }
    }
}
