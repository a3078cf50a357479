//! Quick CRUD template generator.
//!
//! Produces literal SQL with positional `?` placeholders from table metadata.
//! Identifiers are emitted as given; nothing is quoted, escaped or bound.

use crate::models::{CrudTemplates, Table, TableColumn};

/// Primary key assumed when no column is marked `PRIMARY KEY`.
const FALLBACK_PRIMARY_KEY: &str = "id";

/// Audit columns maintained by the database, never written by templates.
const MANAGED_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// Generates CRUD templates for a table.
pub struct CrudTemplateGenerator;

impl CrudTemplateGenerator {
    /// Generates the four templates. Identical input yields identical output.
    pub fn generate(table: &Table) -> CrudTemplates {
        let primary_key = Self::primary_key_column(table);
        let pk_name = primary_key.map_or(FALLBACK_PRIMARY_KEY, |c| c.name.as_str());
        let columns: Vec<&str> = Self::insertable_columns(table)
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();

        let placeholders = vec!["?"; columns.len()].join(", ");
        let assignments = columns
            .iter()
            .map(|name| format!("{} = ?", name))
            .collect::<Vec<_>>()
            .join(", ");

        CrudTemplates {
            create: format!(
                "INSERT INTO {} ({})\nVALUES ({});",
                table.name,
                columns.join(", "),
                placeholders
            ),
            read: format!("SELECT * FROM {} WHERE {} = ?;", table.name, pk_name),
            update: format!(
                "UPDATE {}\nSET {}\nWHERE {} = ?;",
                table.name, assignments, pk_name
            ),
            delete: format!("DELETE FROM {} WHERE {} = ?;", table.name, pk_name),
        }
    }

    /// First column constrained as `PRIMARY KEY`.
    pub fn primary_key_column(table: &Table) -> Option<&TableColumn> {
        table.columns.iter().find(|c| c.is_primary_key())
    }

    /// Columns a caller supplies values for, in declaration order. Every
    /// key column is left out, not only the one used in WHERE clauses.
    pub fn insertable_columns(table: &Table) -> Vec<&TableColumn> {
        table
            .columns
            .iter()
            .filter(|c| !c.is_primary_key())
            .filter(|c| !MANAGED_COLUMNS.contains(&c.name.as_str()))
            .collect()
    }
}
