//! Resource Adapter
//!
//! The contract every resource kind exposes to the orchestrator, and the
//! data-driven REST implementation used for all registry kinds.

use super::registry::{ResourceKind, UpdateMethod};
use super::Resource;
use crate::api::ApiClient;
use crate::error::{BackupError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Kind-specific operations behind one uniform interface.
///
/// Payloads passed to [`create`](Self::create) and [`update`](Self::update)
/// must already be sanitized for write.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    fn kind(&self) -> &ResourceKind;

    /// All resources of this kind, envelope removed
    async fn list(&self) -> Result<Vec<Resource>>;

    /// One resource by id
    async fn get(&self, id: &str) -> Result<Resource>;

    async fn create(&self, payload: &Resource) -> Result<Resource>;

    async fn update(&self, id: &str, payload: &Resource) -> Result<Resource>;

    fn envelope_unwrap(&self, body: Value) -> Result<Resource> {
        self.kind().envelope().unwrap(body)
    }

    fn envelope_wrap(&self, resource: Resource) -> Value {
        self.kind().envelope().wrap(resource)
    }

    /// Hook applied to every fetched resource before it is sanitized
    fn post_fetch(&self, mut resource: Resource) -> Resource {
        if let Some(type_name) = &self.kind().json_api_type {
            resource.insert("type".to_string(), Value::String(type_name.clone()));
        }
        resource
    }

    /// The id of a resource, whether the API returns it as string or number
    fn id_of(&self, resource: &Resource) -> Option<String> {
        match resource.get(&self.kind().id_field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// REST adapter driven by a [`ResourceKind`] definition
#[derive(Clone)]
pub struct RestAdapter {
    client: ApiClient,
    kind: ResourceKind,
}

impl RestAdapter {
    pub fn new(client: ApiClient, kind: ResourceKind) -> Self {
        Self { client, kind }
    }

    fn collection_url(&self) -> String {
        self.client
            .api_url(&self.kind.api_version, &self.kind.api_resource_name)
    }

    fn item_url(&self, id: &str) -> String {
        self.client
            .resource_url(&self.kind.api_version, &self.kind.api_resource_name, id)
    }
}

#[async_trait]
impl ResourceAdapter for RestAdapter {
    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn list(&self) -> Result<Vec<Resource>> {
        let url = self.collection_url();
        let response = self.client.get(&url).await.map_err(|e| match e {
            // A missing collection is never a per-id skip
            BackupError::NotFound { .. } => BackupError::upstream(format!("GET {url}"), Some(404)),
            BackupError::BadRequest { .. } => BackupError::upstream(format!("GET {url}"), Some(400)),
            other => other,
        })?;

        let items = extract_items(response, &self.kind.list_response_path)?;
        tracing::debug!("Listed {} {}", items.len(), self.kind.name);
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Resource> {
        let body = self.client.get(&self.item_url(id)).await?;
        self.envelope_unwrap(body)
    }

    async fn create(&self, payload: &Resource) -> Result<Resource> {
        let body = self.envelope_wrap(payload.clone());
        let response = self.client.post(&self.collection_url(), &body).await?;
        self.envelope_unwrap(response)
    }

    async fn update(&self, id: &str, payload: &Resource) -> Result<Resource> {
        let url = self.item_url(id);
        let body = self.envelope_wrap(payload.clone());
        let response = match self.kind.update_method {
            UpdateMethod::Put => self.client.put(&url, &body).await?,
            UpdateMethod::Patch => self.client.patch(&url, &body).await?,
        };

        // Some endpoints answer 204 to an update; echo the payload back
        if response.is_null() {
            let mut echoed = payload.clone();
            echoed.insert(self.kind.id_field.clone(), Value::String(id.to_string()));
            return Ok(echoed);
        }
        self.envelope_unwrap(response)
    }
}

/// Extract list items from a response using a dot-notation path
pub fn extract_items(response: Value, path: &str) -> Result<Vec<Resource>> {
    let mut current = response;
    if !path.is_empty() {
        for part in path.split('.') {
            current = match current {
                Value::Object(mut map) => map.remove(part).ok_or_else(|| mismatch(path))?,
                _ => return Err(mismatch(path)),
            };
        }
    }

    let Value::Array(items) = current else {
        return Err(mismatch(path));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(mismatch(path)),
        })
        .collect()
}

fn mismatch(path: &str) -> BackupError {
    BackupError::EnvelopeMismatch {
        expected: if path.is_empty() {
            "array".to_string()
        } else {
            path.to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_items_follows_path() {
        let response = json!({"data": [{"id": "a"}, {"id": "b"}], "meta": {}});
        let items = extract_items(response, "data").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["id"], "b");
    }

    #[test]
    fn test_extract_items_bare_array() {
        let items = extract_items(json!([{"id": 1}]), "").unwrap();
        assert_eq!(items[0]["id"], 1);
    }

    #[test]
    fn test_extract_items_nested_path() {
        let response = json!({"result": {"tests": [{"public_id": "x"}]}});
        let items = extract_items(response, "result.tests").unwrap();
        assert_eq!(items[0]["public_id"], "x");
    }

    #[test]
    fn test_extract_items_missing_key_is_mismatch() {
        let err = extract_items(json!({"items": []}), "data").unwrap_err();
        assert!(matches!(err, BackupError::EnvelopeMismatch { .. }));
        assert!(extract_items(json!({"id": 1}), "").is_err());
        assert!(extract_items(json!({"data": [1, 2]}), "data").is_err());
    }
}
