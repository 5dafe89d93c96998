//! `[dom]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[dom]` section - live document reconciliation.
///
/// # Example
/// ```toml
/// [dom]
/// signature_prefix = "data-head-"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DomConfig {
    /// Prefix of the ownership marker attribute, followed by the tag signature.
    #[serde(default = "defaults::dom::signature_prefix")]
    #[educe(Default = defaults::dom::signature_prefix())]
    pub signature_prefix: String,
}

#[cfg(test)]
mod tests {
    use super::super::HeadConfig;

    #[test]
    fn test_dom_config_defaults() {
        let config: HeadConfig = toml::from_str("").unwrap();
        assert_eq!(config.dom.signature_prefix, "data-h-");
    }

    #[test]
    fn test_dom_config_custom_prefix() {
        let config: HeadConfig =
            toml::from_str("[dom]\nsignature_prefix = \"data-meta-\"").unwrap();
        assert_eq!(config.dom.signature_prefix, "data-meta-");
    }
}
