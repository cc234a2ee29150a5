//! Resource Registry - Load resource kind definitions from JSON
//!
//! Every backed-up resource kind is described by an entry in an embedded JSON
//! file. The entry carries the kind-specific contract (API version, path, id
//! field, envelope, banlist, update semantics) so the engine never needs to
//! know about a concrete kind.

use super::envelope::Envelope;
use crate::engine::normalize::NormalizeOptions;
use crate::engine::snapshot::SnapshotFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Embedded resource JSON files (compiled into the binary)
const RESOURCE_FILES: &[&str] = &[include_str!("../resources/datadog.json")];

/// Fields that never belong in a write body, whatever the kind's banlist says
pub const STRUCTURAL_FIELDS: &[&str] = &["id", "type", "relationships"];

/// How `update` replaces a remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    /// Full-object replacement
    #[default]
    Put,
    /// Partial update
    Patch,
}

/// Resource kind definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceKind {
    /// Registry key, also the backup sub-directory name
    #[serde(skip)]
    pub name: String,
    pub display_name: String,
    pub api_version: String,
    pub api_resource_name: String,
    pub id_field: String,
    /// Dot path to the array inside a list response; empty means a bare array
    #[serde(default)]
    pub list_response_path: String,
    /// Wrapper key around single-resource payloads
    #[serde(default)]
    pub envelope: Option<String>,
    /// JSON:API `type` to stamp on fetched resources
    #[serde(default)]
    pub json_api_type: Option<String>,
    /// Volatile fields never compared nor replayed
    #[serde(default)]
    pub banlist: Vec<String>,
    #[serde(default)]
    pub update_method: UpdateMethod,
    /// Whether sequence order is insignificant for this kind
    #[serde(default = "default_true")]
    pub sort_arrays: bool,
    /// List entries are summaries; full bodies need a fetch by id
    #[serde(default)]
    pub list_is_summary: bool,
    /// Per-kind snapshot format override
    #[serde(default)]
    pub format: Option<SnapshotFormat>,
}

fn default_true() -> bool {
    true
}

impl ResourceKind {
    pub fn envelope(&self) -> Envelope {
        Envelope::from_key(self.envelope.as_deref())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            sort_arrays: self.sort_arrays,
        }
    }

    /// Banlist extended with the kind's id field, for write bodies
    pub fn write_banlist(&self) -> Vec<String> {
        let mut fields = self.banlist.clone();
        if !fields.contains(&self.id_field) {
            fields.push(self.id_field.clone());
        }
        fields
    }

    /// Snapshot format for this kind, falling back to the run default
    pub fn format_or(&self, default: SnapshotFormat) -> SnapshotFormat {
        self.format.unwrap_or(default)
    }
}

/// Root structure of resources/*.json
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceKind>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<ResourceConfig> = OnceLock::new();

/// Get the resource registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static ResourceConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = ResourceConfig {
            resources: BTreeMap::new(),
        };

        for content in RESOURCE_FILES {
            let partial: ResourceConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded resource JSON: {}", e));
            final_config.resources.extend(partial.resources);
        }

        for (name, kind) in final_config.resources.iter_mut() {
            kind.name = name.clone();
        }

        final_config
    })
}

/// Get a resource kind by name
pub fn get_kind(name: &str) -> Option<&'static ResourceKind> {
    get_registry().resources.get(name)
}

/// Get all resource kind names, sorted
pub fn get_all_kind_names() -> Vec<&'static str> {
    get_registry()
        .resources
        .keys()
        .map(|s| s.as_str())
        .collect()
}
