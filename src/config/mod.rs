//! Configuration loading
//!
//! Reads config.yaml, bootstraps it from the bundled template when missing,
//! and hands the document to the [`Validator`].

pub mod error;
pub mod profile;
pub mod raw;
pub mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE, LOG_DIR_NAME};
use crate::policy::CpuTopology;

pub use error::{ConfigError, ConfigResult};
pub use profile::{
    normalize_process_name, AffinitySetting, AppConfig, Condition, ConditionAction, ConditionKind,
    ProcessProfile, ProfileKind, ProfileSettings,
};
pub use raw::RawConfig;
pub use validate::Validator;

/// `<roaming config dir>/WinControl`, or the working directory when the
/// platform has no config dir.
pub fn app_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(CONFIG_DIR_NAME);
    path
}

pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE_NAME)
}

pub fn log_dir() -> PathBuf {
    app_dir().join(LOG_DIR_NAME)
}

/// Writes the bundled template to `path` if nothing exists there yet.
///
/// # Returns
/// * `Ok(true)` - The template was written
/// * `Ok(false)` - A configuration file already existed
pub fn ensure_default(path: &Path) -> ConfigResult<bool> {
    if path.exists() {
        return Ok(false);
    }

    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(io_error)?;

    info!("Wrote default configuration to {}", path.display());
    Ok(true)
}

/// Reads and validates the configuration at `path`.
pub fn load(path: &Path, topology: CpuTopology) -> ConfigResult<AppConfig> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse(&text, topology)
}

/// Validates an in-memory configuration document.
pub fn parse(text: &str, topology: CpuTopology) -> ConfigResult<AppConfig> {
    let raw = RawConfig::from_yaml(text)?;
    Validator::new(topology).validate(raw)
}
