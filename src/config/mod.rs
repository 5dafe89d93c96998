//! Head configuration, usually loaded from `head.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `verbose`    | Trace resolution and reconciliation to stderr    |
//! | `[render]`   | String rendering (count tag)                     |
//! | `[dom]`      | Live document reconciliation (marker prefix)     |
//! | `[dedupe]`   | Tag identity rules (legacy ids, singleton links) |
//! | `[defaults]` | Input of the lowest-precedence defaults entry    |
//!
//! # Example
//!
//! ```toml
//! verbose = false
//!
//! [dedupe]
//! legacy_id = "distinct"
//!
//! [defaults]
//! titleTemplate = "%s | My Site"
//! meta = [{ charset = "utf-8" }]
//! htmlAttrs = { lang = "en" }
//! ```

mod dedupe;
pub mod defaults;
mod dom;
mod error;
mod render;

pub use dedupe::{DedupeConfig, LegacyIdStrategy};
pub use dom::DomConfig;
pub use error::ConfigError;
pub use render::RenderConfig;

use crate::{log, tag::is_valid_attr_name};
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Root configuration structure representing head.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct HeadConfig {
    /// Trace resolution and reconciliation through `log!`
    #[serde(default)]
    pub verbose: bool,

    /// String rendering settings
    #[serde(default)]
    pub render: RenderConfig,

    /// Live document settings
    #[serde(default)]
    pub dom: DomConfig,

    /// Dedupe settings
    #[serde(default)]
    pub dedupe: DedupeConfig,

    /// Input of the defaults entry, same shape as any entry input
    #[serde(default)]
    pub defaults: Option<serde_json::Value>,
}

impl HeadConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: HeadConfig = toml::from_str(content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        log!("config"; "loaded {}", path.display());
        Self::from_str(&content)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The prefix is completed by hex digits, so it has to be a valid name on its own
        if !is_valid_attr_name(&self.dom.signature_prefix) {
            return Err(ConfigError::Validation(format!(
                "[dom].signature_prefix `{}` is not a valid attribute name",
                self.dom.signature_prefix
            )));
        }
        if self.dedupe.singleton_links.iter().any(|rel| rel.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "[dedupe].singleton_links must not contain empty relations".into(),
            ));
        }
        if let Some(defaults) = &self.defaults
            && !defaults.is_object()
        {
            return Err(ConfigError::Validation("[defaults] must be a table".into()));
        }
        Ok(())
    }
}
