//! Backup/restore engine
//!
//! Kind-agnostic orchestration over [`ResourceAdapter`](crate::resource::ResourceAdapter):
//!
//! - [`sanitize`] - strips volatile and structural fields
//! - [`normalize`] - canonical key and sequence order
//! - [`snapshot`] - one file per resource, JSON or YAML
//! - [`diff`] - line diff of normalized YAML renderings
//! - [`pool`] - bounded concurrent fetches
//! - [`cache`] - per-kind `list()` cache with explicit invalidation
//! - [`orchestrator`] - the backup, restore and diff pipelines
//! - [`report`] - per-id outcomes and per-kind summaries

pub mod cache;
pub mod diff;
pub mod normalize;
pub mod orchestrator;
pub mod pool;
pub mod report;
pub mod sanitize;
pub mod snapshot;

pub use cache::ResponseCache;
pub use diff::diff_values;
pub use normalize::{normalize, NormalizeOptions};
pub use orchestrator::{local_view, snapshot_view, Orchestrator};
pub use pool::WorkerPool;
pub use report::{Action, IdStatus, KindReport, Outcome, Summary};
pub use sanitize::{sanitize_for_compare, sanitize_for_write};
pub use snapshot::{SnapshotFormat, SnapshotStore};
