use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docsnap_config::{config_dir, config_file_path, load_config, DocsnapConfig};

/// `--config` wins; otherwise `$DOCSNAP_CONFIG_DIR/config.yaml` or `~/.docsnap/config.yaml`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| config_file_path(&config_dir()))
}

/// Load without validating, for commands that report problems themselves.
pub async fn load_unchecked(path: &Path) -> Result<DocsnapConfig> {
    load_config(path)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_config_path(Some(PathBuf::from("/tmp/custom.yaml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.yaml"));
    }

    #[test]
    fn default_path_is_config_yaml() {
        let path = resolve_config_path(None);
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("config.yaml"));
    }
}
