//! JSON configuration file.
//!
//! Default location is `$HOME/.sentinel/config.json`. Every field is
//! optional; a missing file means all defaults. CLI flags override it.
//!
//! The file is also written back by the TUI settings view, and
//! `ConfigWatch` lets a running monitor pick up edits at tick boundaries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::alert::AlertThresholds;
use crate::domain::ConfigError;
use crate::sampling::SortColumn;

pub const DEFAULT_INTERVAL_MS: u64 = 1500;
pub const MIN_INTERVAL_MS: u64 = 100;
pub const DEFAULT_DISPLAY_BUDGET: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time between ticks
    pub interval_ms: u64,
    /// Maximum rows handed to the renderer
    pub display_budget: usize,
    pub proc_root: PathBuf,
    /// Initial sort column, descending
    pub sort: SortColumn,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub cpu_threshold: f64,
    pub mem_threshold: f64,
    pub cooldown_secs: u64,
    /// Webhook URLs by name
    pub webhooks: BTreeMap<String, String>,
    /// Name in `webhooks` alerts are posted to; empty for none
    pub active_webhook: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            display_budget: DEFAULT_DISPLAY_BUDGET,
            proc_root: PathBuf::from("/proc"),
            sort: SortColumn::Cpu,
            alerts: AlertConfig::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        let thresholds = AlertThresholds::default();
        Self {
            enabled: false,
            cpu_threshold: thresholds.cpu_percent,
            mem_threshold: thresholds.memory_percent,
            cooldown_secs: thresholds.cooldown.as_secs(),
            webhooks: BTreeMap::new(),
            active_webhook: String::new(),
        }
    }
}

impl AlertConfig {
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            cpu_percent: self.cpu_threshold,
            memory_percent: self.mem_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }

    /// URL of the active webhook, if one is set and still defined
    pub fn active_webhook_url(&self) -> Option<&str> {
        self.webhooks.get(&self.active_webhook).map(String::as_str).filter(|url| !url.is_empty())
    }

    /// Add or replace a webhook. The first one added becomes active.
    pub fn add_webhook(&mut self, name: &str, url: &str) {
        self.webhooks.insert(name.to_string(), url.to_string());
        if self.active_webhook.is_empty() {
            self.active_webhook = name.to_string();
        }
    }

    /// Returns false when `name` is unknown. Removing the active webhook
    /// leaves none active.
    pub fn remove_webhook(&mut self, name: &str) -> bool {
        if self.webhooks.remove(name).is_none() {
            return false;
        }
        if self.active_webhook == name {
            self.active_webhook.clear();
        }
        true
    }

    /// Returns false when `name` is unknown
    pub fn activate_webhook(&mut self, name: &str) -> bool {
        if !self.webhooks.contains_key(name) {
            return false;
        }
        self.active_webhook = name.to_string();
        true
    }
}

impl Config {
    /// `$HOME/.sentinel`, relative to the working directory when `HOME` is
    /// unset. Holds the config file and the background monitor's pid file.
    pub fn state_dir() -> PathBuf {
        std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default().join(".sentinel")
    }

    /// `$HOME/.sentinel/config.json`
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("config.json")
    }

    /// # Errors
    /// `ConfigError::Read` if the file cannot be read, `ConfigError::Parse`
    /// if it is not valid JSON for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Like `load`, but a missing file yields the defaults.
    ///
    /// # Errors
    /// Any error other than the file not existing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write as pretty JSON, creating the parent directory. The file is
    /// replaced by rename so a watcher never reads half of it.
    ///
    /// # Errors
    /// `ConfigError::Write` on any filesystem failure.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json + "\n").map_err(write_err)?;
        fs::rename(&staging, path).map_err(write_err)?;
        log::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Tick interval, never below `MIN_INTERVAL_MS`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }
}

/// Modification time and size, compared to notice edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

fn stamp(path: &Path) -> Option<FileStamp> {
    let meta = fs::metadata(path).ok()?;
    Some(FileStamp { modified: meta.modified().ok()?, len: meta.len() })
}

/// Polled change detection for the config file
#[derive(Debug)]
pub struct ConfigWatch {
    path: PathBuf,
    stamp: Option<FileStamp>,
}

impl ConfigWatch {
    /// Start watching; the file as it is now counts as seen
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stamp = stamp(&path);
        Self { path, stamp }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The freshly loaded config if the file changed since the last poll.
    /// A file that disappeared yields `None`.
    ///
    /// # Errors
    /// A changed file that cannot be read or parsed. The change is still
    /// marked seen, so the error is reported once per edit.
    pub fn poll(&mut self) -> Result<Option<Config>, ConfigError> {
        let current = stamp(&self.path);
        if current == self.stamp {
            return Ok(None);
        }
        self.stamp = current;
        if current.is_none() {
            return Ok(None);
        }
        Config::load(&self.path).map(Some)
    }
}
