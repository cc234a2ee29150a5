//! Datadog API interaction module
//!
//! - [`client`] - Site-aware client that builds versioned API URLs
//! - [`http`] - HTTP layer: key headers, status classification, log hygiene
//!
//! # Example
//!
//! ```ignore
//! use dd_backup::api::{ApiClient, ApiKeys};
//!
//! async fn example() -> dd_backup::error::Result<()> {
//!     let client = ApiClient::new("https://api.datadoghq.com", ApiKeys::default())?;
//!     let workflows = client.get(&client.api_url("v2", "workflows")).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;

pub use client::{ApiClient, DEFAULT_SITE};
pub use http::{ApiKeys, DatadogHttpClient};
