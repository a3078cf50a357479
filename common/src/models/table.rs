//! Table metadata as supplied by the schema service.
//!
//! The workbench only reads these; discovery and storage live elsewhere.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Column of a table, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Free-form constraints such as `"PRIMARY KEY"` or `"UNIQUE"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            constraints: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints
            .get_or_insert_with(Vec::new)
            .push(constraint.into());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .flatten()
            .any(|c| c.trim().eq_ignore_ascii_case("PRIMARY KEY"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Foreign-key style link to another table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct TableRelationship {
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ValidationRule {
    pub field: String,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<TableColumn>,
    #[serde(default)]
    pub relationships: Vec<TableRelationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<Vec<ValidationRule>>,
}

impl Table {
    pub fn new(id: impl Into<String>, name: impl Into<String>, columns: Vec<TableColumn>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            columns,
            relationships: Vec::new(),
            validation_rules: None,
        }
    }
}

/// CRUD operation a quick template is generated for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CrudAction {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudAction::Create => "create",
            CrudAction::Read => "read",
            CrudAction::Update => "update",
            CrudAction::Delete => "delete",
        }
    }
}

impl std::str::FromStr for CrudAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "create" => Ok(CrudAction::Create),
            "read" => Ok(CrudAction::Read),
            "update" => Ok(CrudAction::Update),
            "delete" => Ok(CrudAction::Delete),
            other => Err(format!("unknown CRUD action: {}", other)),
        }
    }
}

/// Parameterized SQL for the four CRUD operations of one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CrudTemplates {
    pub create: String,
    pub read: String,
    pub update: String,
    pub delete: String,
}

impl CrudTemplates {
    pub fn get(&self, action: CrudAction) -> &str {
        match action {
            CrudAction::Create => &self.create,
            CrudAction::Read => &self.read,
            CrudAction::Update => &self.update,
            CrudAction::Delete => &self.delete,
        }
    }
}
