//! Errors raised while loading a head config (`head.toml` or inline TOML).

use std::path::PathBuf;
use thiserror::Error;

/// Why a head config could not be loaded.
///
/// Loading helpers return `anyhow::Result`; the cause stays reachable with
/// `downcast_ref::<ConfigError>()`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read head config `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid head config TOML")]
    Toml(#[from] toml::de::Error),

    #[error("invalid head config: {0}")]
    Validation(String),
}
