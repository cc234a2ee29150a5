//! Configuration Management
//!
//! Settings are layered: config file, then environment, then CLI flags.

use crate::api::{ApiKeys, DEFAULT_SITE};
use crate::engine::SnapshotFormat;
use crate::resource::{get_all_kind_names, get_kind};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKUP_DIR: &str = "backup";
pub const DEFAULT_CONCURRENCY: usize = 4;

/// User configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API base URL, e.g. https://api.datadoghq.eu
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub output_format: Option<SnapshotFormat>,
    /// Resource kinds to operate on when none are given
    #[serde(default)]
    pub resources: Option<Vec<String>>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dd-backup").join("config.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from disk; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub site: Option<String>,
    pub backup_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub format: Option<SnapshotFormat>,
    pub resources: Vec<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: String,
    pub keys: ApiKeys,
    pub backup_dir: PathBuf,
    pub concurrency: usize,
    pub format: SnapshotFormat,
    pub kinds: Vec<String>,
}

impl Settings {
    /// Resolve settings: CLI > environment > config file > defaults
    pub fn resolve<E>(config: &Config, cli: Overrides, env: E) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let site = cli
            .site
            .or_else(|| env("DD_SITE"))
            .or_else(|| config.site.clone())
            .unwrap_or_else(|| DEFAULT_SITE.to_string());
        let site = if site.contains("://") {
            site
        } else {
            // DD_SITE is conventionally a bare domain like datadoghq.eu
            format!("https://api.{}", site)
        };

        let backup_dir = cli
            .backup_dir
            .or_else(|| env("DD_BACKUP_DIR").map(PathBuf::from))
            .or_else(|| config.backup_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));

        let concurrency = match cli.concurrency {
            Some(n) => n,
            None => match env("DD_CONCURRENCY") {
                Some(raw) => raw
                    .parse()
                    .with_context(|| format!("DD_CONCURRENCY must be a number, got '{raw}'"))?,
                None => config.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            },
        };
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }

        let format = cli
            .format
            .or(config.output_format)
            .unwrap_or_default();

        let kinds = if !cli.resources.is_empty() {
            cli.resources
        } else if let Some(resources) = &config.resources {
            resources.clone()
        } else {
            get_all_kind_names().into_iter().map(String::from).collect()
        };
        for kind in &kinds {
            if get_kind(kind).is_none() {
                bail!(
                    "Unknown resource kind '{}'. Known kinds: {}",
                    kind,
                    get_all_kind_names().join(", ")
                );
            }
        }

        let keys = ApiKeys {
            api_key: env("DD_API_KEY").unwrap_or_default(),
            app_key: env("DD_APP_KEY").unwrap_or_default(),
        };
        if keys.api_key.is_empty() || keys.app_key.is_empty() {
            tracing::warn!("DD_API_KEY or DD_APP_KEY is not set; requests will be unauthenticated");
        }

        Ok(Self {
            site,
            keys,
            backup_dir,
            concurrency,
            format,
            kinds,
        })
    }
}
