pub mod probe;
pub mod resolve;
pub mod show_config;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};

use voodoo_player::Configuration;

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Configuration> {
    match path {
        Some(path) => Configuration::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Configuration::load().context("failed to load default config"),
    }
}
