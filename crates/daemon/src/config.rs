use anyhow::{Context, Result};
use std::path::Path;
use titlecast_runtime_config::{BridgeConfig, ConfigError};
use tracing::info;

use crate::setup;

/// Read the config file. `Ok(None)` when it does not exist.
pub fn read_config(path: &Path) -> Result<Option<BridgeConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(ConfigError::from)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let config = BridgeConfig::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(Some(config))
}

pub fn save_config(path: &Path, config: &BridgeConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config dir {}", dir.display()))?;
    }
    let content = config.to_toml_string()?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config at {}", path.display()))?;
    info!("Config written: {}", path.display());
    Ok(())
}

/// Produce the validated startup config.
///
/// A missing file is created through the interactive setup when `interactive`
/// is set; otherwise environment overrides alone must form a valid config.
/// `force_setup` re-runs the prompts over an existing file.
pub fn resolve_config(
    path: &Path,
    force_setup: bool,
    interactive: bool,
    env: impl Fn(&str) -> Option<String>,
) -> Result<BridgeConfig> {
    let existing = read_config(path)?;
    let file_found = existing.is_some();

    let mut config = match existing {
        Some(config) if !force_setup => config,
        existing => {
            let mut base = existing.unwrap_or_default();
            base.apply_env_overrides(&env);
            if interactive {
                let config = setup::prompt(base)?;
                save_config(path, &config)?;
                config
            } else if !file_found && base.validate().is_err() {
                return Err(ConfigError::Missing(path.display().to_string()).into());
            } else {
                base
            }
        }
    };

    if config.apply_env_overrides(&env) {
        info!("Applied config overrides from environment");
    }
    config
        .validate()
        .with_context(|| format!("Invalid config at {}", path.display()))?;
    Ok(config)
}
