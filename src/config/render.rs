//! `[render]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[render]` section - string rendering options.
///
/// # Example
/// ```toml
/// [render]
/// count_tag = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Append `<meta name="head:count" content="N">` to the head tags.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub count_tag: bool,
}

#[cfg(test)]
mod tests {
    use super::super::HeadConfig;

    #[test]
    fn test_render_config_defaults() {
        let config: HeadConfig = toml::from_str("").unwrap();
        assert!(config.render.count_tag);
    }

    #[test]
    fn test_render_config_disable_count() {
        let config: HeadConfig = toml::from_str("[render]\ncount_tag = false").unwrap();
        assert!(!config.render.count_tag);
    }
}
