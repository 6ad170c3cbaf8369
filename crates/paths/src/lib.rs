//! Runtime path resolution for titlecast.
//!
//! Every path can be overridden through an environment variable so tests and
//! packaged installs never touch the user's real config directory.

use std::path::PathBuf;

use directories::ProjectDirs;
use titlecast_runtime_config::CONFIG_FILE_NAME;

/// Env var overriding the config file path.
pub const ENV_CONFIG_PATH: &str = "TITLECAST_CONFIG";
/// Env var overriding the title cache document path.
pub const ENV_CACHE_PATH: &str = "TITLECAST_CACHE";

pub const CACHE_FILE_NAME: &str = "title_cache.json";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("could not determine a home directory for titlecast")]
    NoHome,
}

fn project_dirs() -> Result<ProjectDirs, PathError> {
    ProjectDirs::from("", "", "titlecast").ok_or(PathError::NoHome)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn config_dir() -> Result<PathBuf, PathError> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn data_dir() -> Result<PathBuf, PathError> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Config file path: `$TITLECAST_CONFIG`, else `<config dir>/titlecast.toml`.
pub fn config_path() -> Result<PathBuf, PathError> {
    if let Some(path) = env_path(ENV_CONFIG_PATH) {
        return Ok(path);
    }
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Title cache path: `configured` when non-empty, else `$TITLECAST_CACHE`,
/// else `<data dir>/title_cache.json`.
pub fn cache_path(configured: &str) -> Result<PathBuf, PathError> {
    let configured = configured.trim();
    if !configured.is_empty() {
        return Ok(expand_home(configured));
    }
    if let Some(path) = env_path(ENV_CACHE_PATH) {
        return Ok(path);
    }
    Ok(data_dir()?.join(CACHE_FILE_NAME))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
