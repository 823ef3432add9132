//! Command implementations.

pub mod config;
pub mod ingest;
pub mod quarantine;

use darkroom_core::Config;
use std::path::Path;

/// Load the config from `path`, or the default location, falling back to
/// defaults with a warning when it cannot be read.
pub fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `darkroom config path`."
            );
            Config::default()
        }
    }
}
