use crate::error::{ApiStepsError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "APISTEPS_";

/// Settings shared by every scenario of a test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Start scenarios with debug printing on.
    pub debug: bool,
    /// Directory that relative schema references are resolved against.
    pub schemas_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Fixed seed for the data generator; random when absent.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            schemas_dir: PathBuf::from("schemas"),
            request_timeout_secs: 30,
            user_agent: format!("apisteps/{}", env!("CARGO_PKG_VERSION")),
            seed: None,
        }
    }
}

/// Loads `.env` and `.env.local` from `dir`. Already-set process variables
/// win unless `override_existing` is set.
pub fn load_env_files(dir: &Path, override_existing: bool) {
    let files = [".env", ".env.local"];
    for fname in files.iter() {
        let p = dir.join(fname);
        if p.exists() {
            let loaded = if override_existing {
                dotenvy::from_filename_override(&p)
            } else {
                dotenvy::from_filename(&p)
            };
            if let Err(e) = loaded {
                tracing::warn!("Failed to load {}: {}", p.display(), e);
            }
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}")).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ApiStepsError::ConfigError(format!(
            "Environment variable {ENV_PREFIX}{key} must be a boolean, got '{raw}'"
        ))),
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        ApiStepsError::ConfigError(format!(
            "Environment variable {ENV_PREFIX}{key} must be a non-negative integer, got '{raw}'"
        ))
    })
}

impl Settings {
    /// Defaults overridden by `APISTEPS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(raw) = env_var("DEBUG") {
            settings.debug = parse_bool("DEBUG", &raw)?;
        }
        if let Some(raw) = env_var("SCHEMAS_DIR") {
            settings.schemas_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("REQUEST_TIMEOUT_SECS") {
            settings.request_timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = env_var("USER_AGENT") {
            settings.user_agent = raw;
        }
        if let Some(raw) = env_var("SEED") {
            settings.seed = Some(parse_number("SEED", &raw)?);
        }
        Ok(settings)
    }

    /// Reads settings from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&contents)?),
            other => Err(ApiStepsError::ConfigError(format!(
                "Unsupported settings file extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}
