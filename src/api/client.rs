//! Datadog Client
//!
//! Main client for interacting with the Datadog API, combining the site base
//! URL with the HTTP layer.

use super::http::{ApiKeys, DatadogHttpClient};
use crate::error::{BackupError, Result};
use serde_json::Value;
use url::Url;

/// Default site used when none is configured
pub const DEFAULT_SITE: &str = "https://api.datadoghq.com";

/// Main Datadog client
#[derive(Clone)]
pub struct ApiClient {
    pub http: DatadogHttpClient,
    base_url: String,
}

impl ApiClient {
    /// Create a new client for the given site base URL
    pub fn new(base_url: &str, keys: ApiKeys) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| BackupError::upstream(format!("invalid site URL '{base_url}': {e}"), None))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackupError::upstream(
                format!("site URL '{base_url}' must use http or https"),
                None,
            ));
        }

        Ok(Self {
            http: DatadogHttpClient::new(keys)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a versioned API URL, e.g. `<site>/api/v2/workflows`
    pub fn api_url(&self, version: &str, path: &str) -> String {
        format!(
            "{}/api/{}/{}",
            self.base_url,
            version,
            path.trim_start_matches('/')
        )
    }

    /// Build the URL of one resource, percent-encoding its id
    pub fn resource_url(&self, version: &str, path: &str, id: &str) -> String {
        format!("{}/{}", self.api_url(version, path), urlencoding::encode(id))
    }

    pub async fn get(&self, url: &str) -> Result<Value> {
        self.http.get(url).await
    }

    pub async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.post(url, body).await
    }

    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.put(url, body).await
    }

    pub async fn patch(&self, url: &str, body: &Value) -> Result<Value> {
        self.http.patch(url, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, ApiKeys::default()).unwrap()
    }

    #[test]
    fn test_api_url_joins_version_and_path() {
        let client = client("https://api.datadoghq.eu/");
        assert_eq!(
            client.api_url("v2", "workflows"),
            "https://api.datadoghq.eu/api/v2/workflows"
        );
        assert_eq!(
            client.api_url("v1", "/logs/config/pipelines"),
            "https://api.datadoghq.eu/api/v1/logs/config/pipelines"
        );
    }

    #[test]
    fn test_resource_url_encodes_id() {
        let client = client(DEFAULT_SITE);
        assert_eq!(
            client.resource_url("v1", "dashboard", "abc def/1"),
            "https://api.datadoghq.com/api/v1/dashboard/abc%20def%2F1"
        );
    }

    #[test]
    fn test_rejects_invalid_site() {
        assert!(ApiClient::new("not a url", ApiKeys::default()).is_err());
        assert!(ApiClient::new("ftp://example.com", ApiKeys::default()).is_err());
    }
}
