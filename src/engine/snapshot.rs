//! Snapshot files
//!
//! One file per resource at `<backup_dir>/<kind>/<id>.<ext>`. The file is the
//! only persisted state; there is no index.

use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Yaml,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Render an already-normalized value
    pub fn render(self, value: &Value) -> Result<String> {
        let rendered = match self {
            Self::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| BackupError::SnapshotParse {
            path: PathBuf::new(),
            reason,
        })
    }

    pub fn parse(self, text: &str, path: &Path) -> Result<Value> {
        let parsed = match self {
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| BackupError::SnapshotParse {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Filesystem layout of a backup directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    backup_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn kind_dir(&self, kind: &str) -> PathBuf {
        self.backup_dir.join(kind)
    }

    pub fn path(&self, kind: &str, id: &str, format: SnapshotFormat) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{}.{}", id, format.extension()))
    }

    /// Write a snapshot atomically: temp file in the same directory, then rename
    pub fn write(&self, kind: &str, id: &str, format: SnapshotFormat, content: &str) -> Result<PathBuf> {
        let dir = self.kind_dir(kind);
        std::fs::create_dir_all(&dir).map_err(|e| BackupError::local_io(&dir, e))?;

        let path = self.path(kind, id, format);
        let tmp = dir.join(format!(".{}.{}.tmp", id, uuid::Uuid::new_v4()));
        std::fs::write(&tmp, content).map_err(|e| BackupError::local_io(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(BackupError::local_io(&path, e));
        }

        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    pub fn read(&self, kind: &str, id: &str, format: SnapshotFormat) -> Result<Value> {
        let path = self.path(kind, id, format);
        let text = std::fs::read_to_string(&path).map_err(|e| BackupError::local_io(&path, e))?;
        format.parse(&text, &path)
    }

    pub fn remove(&self, kind: &str, id: &str, format: SnapshotFormat) -> Result<()> {
        let path = self.path(kind, id, format);
        std::fs::remove_file(&path).map_err(|e| BackupError::local_io(&path, e))
    }

    /// Ids of every snapshot of a kind, sorted. A missing directory has none.
    pub fn list_ids(&self, kind: &str, format: SnapshotFormat) -> Result<Vec<String>> {
        let dir = self.kind_dir(kind);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::local_io(&dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BackupError::local_io(&dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(format.extension()) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !stem.starts_with('.') {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
