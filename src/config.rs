//! Configuration management for Clausewise using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::services::batch::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_WORKERS};
use crate::services::versions::{
    DEFAULT_DIFF_CHANGE_LIMIT, DEFAULT_DIFF_LINE_LIMIT, DEFAULT_MAJOR_RISK_THRESHOLD,
};

const UPLOADS_SUBDIR: &str = "uploads";
const PROCESSED_SUBDIR: &str = "processed";
const BATCHES_SUBDIR: &str = "batches";
const VERSIONS_SUBDIR: &str = "versions";

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Copies of uploaded source files.
    pub uploads_dir: PathBuf,
    /// Analyzed document records.
    pub processed_dir: PathBuf,
    /// Batch records.
    pub batches_dir: PathBuf,
    /// Version records.
    pub versions_dir: PathBuf,
    /// Concurrent documents per batch.
    pub workers: usize,
    pub max_batch_size: usize,
    /// Lines of each text considered by version comparison.
    pub diff_line_limit: usize,
    /// Changed lines returned by version comparison.
    pub diff_change_limit: usize,
    /// Risk swing in points that counts as a major change.
    pub major_risk_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        // Platform data dir -> home dir -> current dir
        let data_dir = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clausewise");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            uploads_dir: data_dir.join(UPLOADS_SUBDIR),
            processed_dir: data_dir.join(PROCESSED_SUBDIR),
            batches_dir: data_dir.join(BATCHES_SUBDIR),
            versions_dir: data_dir.join(VERSIONS_SUBDIR),
            data_dir,
            workers: DEFAULT_WORKERS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            diff_line_limit: DEFAULT_DIFF_LINE_LIMIT,
            diff_change_limit: DEFAULT_DIFF_CHANGE_LIMIT,
            major_risk_threshold: DEFAULT_MAJOR_RISK_THRESHOLD,
        }
    }

    /// Point every directory at a new data root.
    fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.uploads_dir = data_dir.join(UPLOADS_SUBDIR);
        self.processed_dir = data_dir.join(PROCESSED_SUBDIR);
        self.batches_dir = data_dir.join(BATCHES_SUBDIR);
        self.versions_dir = data_dir.join(VERSIONS_SUBDIR);
        self.data_dir = data_dir;
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            &self.data_dir,
            &self.uploads_dir,
            &self.processed_dir,
            &self.batches_dir,
            &self.versions_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create directory {}: {}", dir.display(), e),
                )
            })?;
        }
        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Concurrent documents per batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Maximum files accepted in one batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_line_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_change_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_risk_threshold: Option<f64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers clausewise config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("clausewise").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// TOML for `.toml` files, JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.set_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(workers) = self.workers {
            settings.workers = workers.max(1);
        }
        if let Some(max) = self.max_batch_size {
            settings.max_batch_size = max;
        }
        if let Some(limit) = self.diff_line_limit {
            settings.diff_line_limit = limit;
        }
        if let Some(limit) = self.diff_change_limit {
            settings.diff_change_limit = limit;
        }
        if let Some(threshold) = self.major_risk_threshold {
            settings.major_risk_threshold = threshold;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory (--data flag).
    pub data: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Environment overrides, applied after the config file.
fn apply_env_overrides(settings: &mut Settings) {
    if let Some(dir) = std::env::var("CLAUSEWISE_DATA_DIR")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using CLAUSEWISE_DATA_DIR from environment: {}", dir);
        let path = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        settings.set_data_dir(if path.is_absolute() {
            path
        } else {
            current_dir().join(path)
        });
    }

    if let Ok(raw) = std::env::var("CLAUSEWISE_WORKERS") {
        match raw.trim().parse::<usize>() {
            Ok(workers) if workers > 0 => settings.workers = workers,
            _ => tracing::warn!("Ignoring invalid CLAUSEWISE_WORKERS value: {:?}", raw),
        }
    }
}

/// Load settings with explicit options.
///
/// Precedence, lowest first: defaults, config file, environment, `--data`.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await.unwrap_or_else(|e| {
            tracing::warn!("Ignoring config {}: {}", path.display(), e);
            Config::default()
        }),
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config.base_dir().unwrap_or_else(current_dir);
    config.apply_to_settings(&mut settings, &base_dir);

    apply_env_overrides(&mut settings);

    if let Some(data) = options.data {
        let data = if data.is_absolute() {
            data
        } else {
            current_dir().join(data)
        };
        settings.set_data_dir(data);
    }

    (settings, config)
}
