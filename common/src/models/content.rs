//! Draft content and its persisted encoding.
//!
//! A draft keeps a REST payload and a SQL payload side by side, so switching
//! the active kind never throws away the other tab's edits. The pair is
//! persisted as a JSON string in `Draft::content`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// HTTP method of a REST draft.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Methods whose body is expected to be JSON.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// REST payload of a draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RestRequest {
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub url: String,
    /// Headers in insertion order, persisted as a JSON object.
    #[serde(default, with = "header_map")]
    #[schema(value_type = Object)]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl RestRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// SQL payload of a draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SqlQuery {
    #[serde(default)]
    pub query: String,
}

impl SqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// Both payloads of a draft. Either slot may be absent in persisted content;
/// readers fall back to the slot's default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct DraftContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<SqlQuery>,
}

impl Default for DraftContent {
    fn default() -> Self {
        Self {
            rest: Some(RestRequest::default()),
            sql: Some(SqlQuery::default()),
        }
    }
}

impl DraftContent {
    /// Default content with the given SQL text.
    pub fn with_sql(query: impl Into<String>) -> Self {
        Self {
            sql: Some(SqlQuery::new(query)),
            ..Default::default()
        }
    }

    /// Default content with the given REST request.
    pub fn with_rest(request: RestRequest) -> Self {
        Self {
            rest: Some(request),
            ..Default::default()
        }
    }

    pub fn rest_or_default(&self) -> RestRequest {
        self.rest.clone().unwrap_or_default()
    }

    pub fn sql_or_default(&self) -> SqlQuery {
        self.sql.clone().unwrap_or_default()
    }

    /// Overlays the slots present in `edit`, keeping the others untouched.
    pub fn merge(&mut self, edit: DraftContent) {
        if let Some(rest) = edit.rest {
            self.rest = Some(rest);
        }
        if let Some(sql) = edit.sql {
            self.sql = Some(sql);
        }
    }

    /// Serializes the content to its persisted form.
    pub fn encode(&self) -> String {
        match serde_json::to_string(self) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode draft content");
                String::new()
            }
        }
    }

    /// Parses persisted content.
    ///
    /// Empty or malformed input yields [`DraftContent::default`]; the caller's
    /// stored string is left as is.
    pub fn decode(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        match serde_json::from_str(raw) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable draft content, using defaults");
                Self::default()
            }
        }
    }
}

/// (De)serializes an ordered header list as a JSON object.
mod header_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(headers: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (key, value) in headers {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct HeaderVisitor;

        impl<'de> Visitor<'de> for HeaderVisitor {
            type Value = Vec<(String, String)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of header names to values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut headers = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    headers.push((key, value));
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeaderVisitor)
    }
}
