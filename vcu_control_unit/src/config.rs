//! Configuration loading for the control unit.
//!
//! A missing file is not fatal: the defaults reproduce the vehicle's
//! calibrated constants. Anything else wrong with the file is.

use std::path::Path;

use tracing::{info, warn};
use vcu_common::config::{ConfigError, ConfigLoader};
use vcu_common::vehicle::config::VcuConfig;

/// Load and validate `path`, falling back to defaults if it does not exist.
pub fn load_config(path: &Path) -> Result<VcuConfig, ConfigError> {
    let cfg = match VcuConfig::load(path) {
        Ok(cfg) => {
            info!(path = %path.display(), "configuration loaded");
            cfg
        }
        Err(ConfigError::FileNotFound) => {
            warn!(path = %path.display(), "configuration file not found, using defaults");
            VcuConfig::default()
        }
        Err(e) => return Err(e),
    };
    cfg.validate()?;
    Ok(cfg)
}
