//! Back up, diff and restore Datadog configuration resources.
//!
//! Each resource is stored as one normalized file so that re-running a backup
//! against unchanged resources reproduces the same bytes, and a restore only
//! touches resources whose snapshot differs from the live state.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod resource;

/// Version injected at compile time via DD_BACKUP_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("DD_BACKUP_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
