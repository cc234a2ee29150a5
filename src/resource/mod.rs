//! Resource abstraction layer
//!
//! Resource kinds are data: each kind is an entry in an embedded JSON file,
//! so new kinds can be added without touching the engine.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches resource kind definitions from embedded JSON
//! - [`envelope`] - Symmetric wrap/unwrap of API response containers
//! - [`adapter`] - The [`ResourceAdapter`] contract and its REST implementation
//!
//! # Example
//!
//! ```ignore
//! use dd_backup::resource::{get_kind, RestAdapter, ResourceAdapter};
//!
//! async fn list_workflows(client: dd_backup::api::ApiClient) -> dd_backup::error::Result<usize> {
//!     let adapter = RestAdapter::new(client, get_kind("workflows").unwrap().clone());
//!     Ok(adapter.list().await?.len())
//! }
//! ```

pub mod adapter;
pub mod envelope;
pub mod registry;

pub use adapter::{extract_items, ResourceAdapter, RestAdapter};
pub use envelope::Envelope;
pub use registry::*;

/// One remote object: a schema-free string-keyed map
pub type Resource = serde_json::Map<String, serde_json::Value>;
