//! Starter configuration written by `castle init`.

use std::{fs, path::Path};

use crate::{CONFIG_FILENAME, ConfigError};

/// Default configuration template (valid TOML).
const TEMPLATE: &str = include_str!("../templates/config.toml");

/// Returns the starter configuration.
pub fn starter_template() -> &'static str {
    TEMPLATE
}

/// Writes the starter configuration into `dir`, refusing to overwrite an existing file.
pub fn write_starter_config(dir: &Path) -> Result<(), ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    if path.exists() {
        return Err(ConfigError::AlreadyExists { path });
    }
    fs::write(&path, TEMPLATE).map_err(|source| ConfigError::WriteFile { path, source })
}
