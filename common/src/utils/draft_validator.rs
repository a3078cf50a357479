//! Draft content validator.
//!
//! Runs the fixed, ordered list of checks for a draft kind and reports every
//! finding as a [`Warning`]. Validation never fails and never blocks anything
//! by itself; callers refuse execution when the report has errors.

use chrono::{DateTime, Utc};

use crate::models::{
    DraftContent, DraftKind, RestRequest, Severity, SqlQuery, ValidationReport, Warning,
};
use crate::utils::IdGenerator;

/// Substrings that flag a destructive statement.
const DESTRUCTIVE_PATTERNS: [&str; 2] = ["drop table", "truncate"];

/// Substrings that flag a statement which should be narrowed by a WHERE clause.
const UNBOUNDED_PATTERNS: [&str; 2] = ["delete from", "update "];

const URL_SCHEMES: [&str; 2] = ["http://", "https://"];

/// Validates draft content.
pub struct DraftValidator;

impl DraftValidator {
    /// Validates the payload of `content` that is active for `kind`.
    pub fn validate(kind: DraftKind, content: &DraftContent) -> ValidationReport {
        match kind {
            DraftKind::Rest => Self::validate_rest(&content.rest_or_default()),
            DraftKind::Sql => Self::validate_sql(&content.sql_or_default()),
        }
    }

    /// Checks, in order: url presence, url scheme, JSON body, headers.
    pub fn validate_rest(request: &RestRequest) -> ValidationReport {
        let mut findings = Findings::new();

        if request.url.trim().is_empty() {
            findings.push(Severity::Error, "url", "URL is required");
        } else if !URL_SCHEMES.iter().any(|scheme| request.url.starts_with(scheme)) {
            findings.push(
                Severity::Warning,
                "url",
                "URL should start with http:// or https://",
            );
        }

        if request.method.carries_body() {
            if let Some(body) = request.body.as_deref().filter(|b| !b.is_empty()) {
                if serde_json::from_str::<serde_json::Value>(body).is_err() {
                    findings.push(Severity::Error, "body", "Invalid JSON in request body");
                }
            }
        }

        for (key, value) in &request.headers {
            if key.trim().is_empty() {
                findings.push(Severity::Error, "headers", "Header name cannot be empty");
            }
            if value.trim().is_empty() {
                findings.push(
                    Severity::Warning,
                    "headers",
                    format!("Header \"{}\" has empty value", key),
                );
            }
        }

        findings.into_report()
    }

    /// Checks, in order: query presence, destructive statements, unbounded
    /// DELETE/UPDATE.
    pub fn validate_sql(query: &SqlQuery) -> ValidationReport {
        let mut findings = Findings::new();

        let sql = query.query.trim().to_lowercase();
        if sql.is_empty() {
            findings.push(Severity::Error, "query", "SQL query is required");
            return findings.into_report();
        }

        if DESTRUCTIVE_PATTERNS.iter().any(|p| sql.contains(p)) {
            findings.push(
                Severity::Warning,
                "query",
                "Destructive operation detected - use with caution",
            );
        }

        if UNBOUNDED_PATTERNS.iter().any(|p| sql.contains(p)) && !sql.contains("where") {
            findings.push(
                Severity::Warning,
                "query",
                "DELETE/UPDATE without WHERE clause will affect all rows",
            );
        }

        findings.into_report()
    }
}

/// Collects findings of one pass with a shared timestamp.
struct Findings {
    now: DateTime<Utc>,
    warnings: Vec<Warning>,
}

impl Findings {
    fn new() -> Self {
        Self {
            now: Utc::now(),
            warnings: Vec::new(),
        }
    }

    fn push(&mut self, severity: Severity, field: &str, message: impl Into<String>) {
        self.warnings.push(Warning {
            id: IdGenerator::warning_id(),
            draft_id: String::new(),
            message: message.into(),
            field: Some(field.to_string()),
            severity,
            created_at: self.now,
            updated_at: self.now,
        });
    }

    fn into_report(self) -> ValidationReport {
        ValidationReport::new(self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpMethod;

    fn fields(report: &ValidationReport) -> Vec<(Severity, &str)> {
        report
            .warnings
            .iter()
            .map(|w| (w.severity, w.field.as_deref().unwrap_or("")))
            .collect()
    }

    #[test]
    fn test_empty_url_is_single_error_before_header_findings() {
        let request = RestRequest::new(HttpMethod::Get, "   ")
            .with_header("Accept", "")
            .with_header("", "x");
        let report = DraftValidator::validate_rest(&request);

        let url_errors: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.field.as_deref() == Some("url"))
            .collect();
        assert_eq!(url_errors.len(), 1);
        assert_eq!(url_errors[0].severity, Severity::Error);
        assert_eq!(
            fields(&report),
            vec![
                (Severity::Error, "url"),
                (Severity::Warning, "headers"),
                (Severity::Error, "headers"),
            ]
        );
        assert!(report.has_errors());
        assert!(!report.is_valid());
    }

    #[test]
    fn test_url_without_scheme_is_warning() {
        let report = DraftValidator::validate_rest(&RestRequest::new(HttpMethod::Get, "api.example.com"));
        assert_eq!(fields(&report), vec![(Severity::Warning, "url")]);
        assert!(report.is_valid());
        assert!(report.has_warnings());
    }

    #[test]
    fn test_invalid_json_body_only_for_body_methods() {
        let post = RestRequest::new(HttpMethod::Post, "https://x.io").with_body("{not json");
        assert_eq!(fields(&DraftValidator::validate_rest(&post)), vec![(Severity::Error, "body")]);

        let get = RestRequest::new(HttpMethod::Get, "https://x.io").with_body("{not json");
        assert!(DraftValidator::validate_rest(&get).warnings.is_empty());

        let empty = RestRequest::new(HttpMethod::Patch, "https://x.io").with_body("");
        assert!(DraftValidator::validate_rest(&empty).warnings.is_empty());

        let valid = RestRequest::new(HttpMethod::Put, "https://x.io").with_body(r#"{"a":1}"#);
        assert!(DraftValidator::validate_rest(&valid).warnings.is_empty());
    }

    #[test]
    fn test_header_findings_follow_insertion_order() {
        let request = RestRequest::new(HttpMethod::Get, "https://x.io")
            .with_header("X-Trace", " ")
            .with_header(" ", "value")
            .with_header("X-Other", "");
        let report = DraftValidator::validate_rest(&request);
        let messages: Vec<&str> = report.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Header \"X-Trace\" has empty value",
                "Header name cannot be empty",
                "Header \"X-Other\" has empty value",
            ]
        );
    }

    #[test]
    fn test_empty_query_short_circuits() {
        let report = DraftValidator::validate_sql(&SqlQuery::new("  \n "));
        assert_eq!(fields(&report), vec![(Severity::Error, "query")]);
    }

    #[test]
    fn test_delete_without_where_warns_in_any_case() {
        for sql in ["DELETE FROM users", "delete from users", "Delete From users;"] {
            let report = DraftValidator::validate_sql(&SqlQuery::new(sql));
            assert_eq!(fields(&report), vec![(Severity::Warning, "query")], "{}", sql);
        }
        let bounded = DraftValidator::validate_sql(&SqlQuery::new("DELETE FROM users WHERE id = 1"));
        assert!(bounded.warnings.is_empty());
    }

    #[test]
    fn test_destructive_and_unbounded_both_reported_in_order() {
        let report = DraftValidator::validate_sql(&SqlQuery::new("TRUNCATE logs; UPDATE users SET a = 1"));
        let messages: Vec<&str> = report.warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Destructive operation detected - use with caution",
                "DELETE/UPDATE without WHERE clause will affect all rows",
            ]
        );
        assert!(report.is_valid());
    }

    #[test]
    fn test_validate_uses_active_slot() {
        let content = DraftContent::with_sql("SELECT * FROM users");
        assert!(DraftValidator::validate(DraftKind::Sql, &content).warnings.is_empty());
        // The REST slot holds the default (empty url) request.
        assert!(DraftValidator::validate(DraftKind::Rest, &content).has_errors());
    }
}
