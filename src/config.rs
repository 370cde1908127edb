use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "client.json";
pub const API_URL_ENV: &str = "VECTORA_API_URL";

/// Whether a drag reorder is sent to the store or kept for the session only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReorderPolicy {
    #[default]
    SessionOnly,
    Persist,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub reorder_policy: ReorderPolicy,
    #[serde(default = "default_local_sort")]
    pub local_sort: bool,
    /// `auto`, `ru` or `en`.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            debounce_ms: default_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            reorder_policy: ReorderPolicy::SessionOnly,
            local_sort: default_local_sort(),
            language: default_language(),
        }
    }
}

impl ClientConfig {
    /// Applies `VECTORA_API_URL` when it is set and non-blank.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_override(std::env::var(API_URL_ENV).ok())
    }

    pub fn with_api_override(mut self, value: Option<String>) -> Self {
        if let Some(base) = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            self.api_base = base;
        }
        self
    }

    /// Collection endpoint, always with the trailing slash the store routes expect.
    pub fn tasks_url(&self) -> String {
        format!("{}/tasks/", self.api_base.trim_end_matches('/'))
    }

    pub fn task_url(&self, id: &str) -> String {
        format!("{}/tasks/{id}", self.api_base.trim_end_matches('/'))
    }
}

fn default_api_base() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_local_sort() -> bool {
    true
}

fn default_language() -> String {
    "auto".to_string()
}

/// Reads and writes `client.json` under a config directory.
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// A missing file yields the defaults; a broken one is an error.
    pub fn load(&self) -> Result<ClientConfig, ConfigError> {
        let mut file = match File::open(self.path()) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ClientConfig::default())
            }
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Like [`ConfigStore::load`] but falls back to the defaults, logging why.
    pub fn load_or_default(&self) -> ClientConfig {
        self.load().unwrap_or_else(|err| {
            log::warn!(
                "config: failed to load path={} error={err}; using defaults",
                self.path().display()
            );
            ClientConfig::default()
        })
    }

    pub fn save(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        self.ensure_dirs()?;
        write_atomic(&self.path(), config)
    }
}

fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), ConfigError> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(data)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}
