//! HTTP utilities for Datadog REST API calls

use crate::error::{BackupError, Result};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Static API credentials sent as headers on every request
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub api_key: String,
    pub app_key: String,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("api_key", &"<redacted>")
            .field("app_key", &"<redacted>")
            .finish()
    }
}

/// HTTP client wrapper for Datadog API calls
#[derive(Clone)]
pub struct DatadogHttpClient {
    client: Client,
    keys: ApiKeys,
}

impl DatadogHttpClient {
    /// Create a new HTTP client
    pub fn new(keys: ApiKeys) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("dd-backup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackupError::upstream(format!("building HTTP client: {e}"), None))?;

        Ok(Self { client, keys })
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.send(Method::PUT, url, Some(body)).await
    }

    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        self.send(Method::PATCH, url, Some(body)).await
    }

    /// Send a request and classify the response status
    pub async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("{} {}", method, url);
        let context = format!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, url)
            .header("DD-API-KEY", &self.keys.api_key)
            .header("DD-APPLICATION-KEY", &self.keys.app_key)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Request failed: {} - {}", context, e);
            BackupError::transport(context.clone(), e)
        })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {} - {}", context, e);
            BackupError::transport(context.clone(), e)
        })?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(classify_status(status, url, context));
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_body).map_err(|e| {
            tracing::error!("Failed to parse response JSON: {} - {}", context, e);
            BackupError::upstream(format!("{context} (invalid JSON: {e})"), Some(status.as_u16()))
        })
    }
}

/// Map a non-2xx status onto the error taxonomy
pub fn classify_status(status: StatusCode, url: &str, context: String) -> BackupError {
    match status {
        StatusCode::NOT_FOUND => BackupError::NotFound {
            url: url.to_string(),
        },
        StatusCode::BAD_REQUEST => BackupError::BadRequest {
            url: url.to_string(),
        },
        other => BackupError::upstream(context, Some(other.as_u16())),
    }
}
