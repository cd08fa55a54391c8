//! Optional TOML file overriding the built-in tuning.
//!
//! Every field may be omitted; missing fields keep their defaults, so a file
//! containing only `[pilot]\nstall_threshold = 8` is valid.

use std::{
    fs,
    path::{Path, PathBuf},
};

use harvester_system_brain::BrainConfig;
use thiserror::Error;

/// Errors raised while loading the tuning file.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the tuning from `path`, or the defaults when no file was given.
pub(crate) fn load(path: Option<&Path>) -> Result<BrainConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(BrainConfig::default());
    };

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}
