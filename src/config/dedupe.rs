//! `[dedupe]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// How the legacy identifying attributes (`vmid`, `hid`) take part in dedupe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyIdStrategy {
    /// The legacy id names one instance: tags collapse only when their ids match.
    #[default]
    Distinct,
    /// The legacy id is ignored and the tag's custom identifying attribute
    /// is treated like `name`.
    AliasName,
}

/// `[dedupe]` section - tag identity rules.
///
/// # Example
/// ```toml
/// [dedupe]
/// legacy_id = "alias-name"
/// singleton_links = ["canonical", "manifest"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DedupeConfig {
    /// Strategy for `vmid`/`hid` tagged elements.
    #[serde(default)]
    pub legacy_id: LegacyIdStrategy,

    /// `link` relations that may appear only once.
    #[serde(default = "defaults::dedupe::singleton_links")]
    #[educe(Default = defaults::dedupe::singleton_links())]
    pub singleton_links: Vec<String>,
}

impl DedupeConfig {
    /// Whether a `rel` value names a singleton relation.
    pub fn is_singleton_rel(&self, rel: &str) -> bool {
        self.singleton_links
            .iter()
            .any(|singleton| singleton.eq_ignore_ascii_case(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::super::HeadConfig;
    use super::*;

    #[test]
    fn test_dedupe_config_defaults() {
        let config: HeadConfig = toml::from_str("").unwrap();
        assert_eq!(config.dedupe.legacy_id, LegacyIdStrategy::Distinct);
        assert_eq!(config.dedupe.singleton_links, vec!["canonical".to_string()]);
    }

    #[test]
    fn test_dedupe_config_alias_name() {
        let config: HeadConfig = toml::from_str(
            r#"
            [dedupe]
            legacy_id = "alias-name"
            singleton_links = ["canonical", "manifest"]
        "#,
        )
        .unwrap();
        assert_eq!(config.dedupe.legacy_id, LegacyIdStrategy::AliasName);
        assert!(config.dedupe.is_singleton_rel("Manifest"));
        assert!(!config.dedupe.is_singleton_rel("icon"));
    }

    #[test]
    fn test_dedupe_config_rejects_unknown_strategy() {
        let result: Result<HeadConfig, _> = toml::from_str("[dedupe]\nlegacy_id = \"merge\"");
        assert!(result.is_err());
    }
}
