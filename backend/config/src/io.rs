//! Config file loading.

use crate::env::{resolve_env_vars, resolve_env_vars_with};
use crate::schema::DocsnapConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the docsnap config directory.
/// Priority: `DOCSNAP_CONFIG_DIR` env > `~/.docsnap/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DOCSNAP_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".docsnap"),
        None => PathBuf::from(".docsnap"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Load, env-substitute, and parse the config from disk.
///
/// A missing file yields the defaults; validation then reports what is absent.
pub async fn load_config(path: &Path) -> Result<DocsnapConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(DocsnapConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value = yaml_to_value(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: DocsnapConfig =
        serde_json::from_value(value).context("Failed to deserialize config")?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse config text against an explicit env map.
pub fn parse_config(raw: &str, env: &HashMap<String, String>) -> Result<DocsnapConfig> {
    let value = yaml_to_value(raw).context("Failed to parse config YAML")?;
    let value = resolve_env_vars_with(&value, env)?;
    serde_json::from_value(value).context("Failed to deserialize config")
}

fn yaml_to_value(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(raw)?;
    Ok(serde_json::to_value(yaml)?)
}
