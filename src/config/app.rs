// src/config/app.rs
//! Service settings: where records live, what to seed on first run, which
//! optional routes and background jobs are on.
//!
//! Sources, later wins:
//! 1) built-in defaults
//! 2) TOML file (`$CANTEEN_CONFIG_PATH` or `config/canteen.toml`; a missing file is fine)
//! 3) environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{ConfigRecord, DEFAULT_ADMIN_PASSWORD, DEFAULT_MYSTERY_CODE};

pub const DEFAULT_CANTEEN_CONFIG_PATH: &str = "config/canteen.toml";
pub const DEFAULT_DATA_DIR: &str = "data";

pub const ENV_CANTEEN_CONFIG_PATH: &str = "CANTEEN_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "CANTEEN_DATA_DIR";
pub const ENV_STATIC_DIR: &str = "CANTEEN_STATIC_DIR";
pub const ENV_ADMIN_PASSWORD: &str = "CANTEEN_ADMIN_PASSWORD";
pub const ENV_MYSTERY_CODE: &str = "CANTEEN_MYSTERY_CODE";
pub const ENV_HOT_RELOAD: &str = "CANTEEN_HOT_RELOAD";
pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Directory holding `menu.json`, `ratings.json`, `config.json`.
    pub data_dir: PathBuf,
    /// Built UI to serve for every non-API path.
    pub static_dir: Option<PathBuf>,
    /// Written to `config.json` only when it does not exist yet.
    pub seed_admin_password: String,
    pub seed_mystery_code: String,
    /// Poll `config.json` and reload secrets after external edits.
    pub hot_reload: bool,
    /// Expose `/metrics`.
    pub debug_routes: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            static_dir: None,
            seed_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            seed_mystery_code: DEFAULT_MYSTERY_CODE.to_string(),
            hot_reload: false,
            debug_routes: false,
        }
    }
}

impl AppSettings {
    /// Resolve the TOML path from env, read it if present, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CANTEEN_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CANTEEN_CONFIG_PATH));

        let mut settings = if path.exists() {
            Self::load_from(&path)?
        } else {
            info!(target: "config", path = %path.display(), "no settings file, using defaults");
            Self::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Read settings from an explicit TOML file. No env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing settings in {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: AppSettings = toml::from_str(s)?;
        Ok(settings)
    }

    pub fn apply_env(&mut self) {
        if let Some(dir) = env_nonempty(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_nonempty(ENV_STATIC_DIR) {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(pw) = env_nonempty(ENV_ADMIN_PASSWORD) {
            self.seed_admin_password = pw;
        }
        if let Some(code) = env_nonempty(ENV_MYSTERY_CODE) {
            self.seed_mystery_code = code;
        }
        if let Some(on) = env_flag(ENV_HOT_RELOAD) {
            self.hot_reload = on;
        }
        if let Some(on) = env_flag(ENV_DEBUG_ROUTES) {
            self.debug_routes = on;
        }
    }

    /// Contents of `config.json` for a fresh data directory.
    pub fn seed_config(&self) -> ConfigRecord {
        ConfigRecord {
            admin_password: self.seed_admin_password.clone(),
            mystery_code: self.seed_mystery_code.clone(),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    match env_nonempty(key)?.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
