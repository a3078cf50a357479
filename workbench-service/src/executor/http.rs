//! Live REST executor over `reqwest`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use common::models::{ExecutionError, RestRequest};

use super::{ExecutorError, RestExecutor, RestOutcome};

/// Sends draft requests to their target URL.
#[derive(Clone)]
pub struct HttpRestExecutor {
    http_client: reqwest::Client,
}

impl HttpRestExecutor {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl RestExecutor for HttpRestExecutor {
    async fn run(&self, request: &RestRequest) -> Result<RestOutcome, ExecutorError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| ExecutorError::InvalidRequest(e.to_string()))?;
        let url = reqwest::Url::parse(request.url.trim())
            .map_err(|e| ExecutorError::InvalidRequest(format!("{}: {}", request.url, e)))?;

        let mut builder = self.http_client.request(method, url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if request.method.carries_body() {
            if let Some(body) = request.body.as_deref().filter(|b| !b.is_empty()) {
                builder = builder.body(body.to_string());
            }
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_builder() {
                ExecutorError::InvalidRequest(e.to_string())
            } else {
                ExecutorError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| ExecutorError::Network(format!("Failed to read response body: {}", e)))?;

        let data = if text.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        };
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let error = (status.is_client_error() || status.is_server_error()).then(|| {
            ExecutionError::new(format!("{} {}", status.as_u16(), status_text)).with_code(status.as_u16())
        });

        tracing::debug!(url = %request.url, status = status.as_u16(), "REST request completed");
        Ok(RestOutcome {
            status: Some(status.as_u16()),
            status_text: Some(status_text),
            headers,
            data,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::HttpMethod;

    #[tokio::test]
    async fn test_unparseable_url_is_invalid_request() {
        let executor = HttpRestExecutor::new(reqwest::Client::new());
        let err = executor
            .run(&RestRequest::new(HttpMethod::Get, "not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let executor = HttpRestExecutor::new(reqwest::Client::new());
        let err = executor
            .run(&RestRequest::new(HttpMethod::Get, "http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Network(_)));
    }
}
