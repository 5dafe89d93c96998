//! Dedupe key derivation.
//!
//! Two tags with the same key are "the same" logical tag and collapse into
//! one during resolution. Keys are scoped by tag kind, so a `meta` and a
//! `link` never collapse into each other.
//!
//! | Input                               | Key                          |
//! |-------------------------------------|------------------------------|
//! | explicit `key: "k"`                 | `<kind>:k`                   |
//! | `meta charset`                      | `meta:charset`               |
//! | `meta http-equiv="X"`               | `meta:http-equiv:x`          |
//! | `vmid`/`hid` (distinct strategy)    | `<kind>:vmid:<id>`           |
//! | `meta name="n"` / `property="p"`    | `meta:name:n` / `meta:property:p` |
//! | custom attribute (alias strategy)   | `meta:name:<value>`          |
//! | `link rel="canonical"`              | `link:rel:canonical`         |
//! | `base` / `title`                    | `base` / `title`             |

use super::{AttrValue, Props, TagKind};
use crate::config::{DedupeConfig, LegacyIdStrategy};

/// Identity hints stripped from the attributes during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityHints {
    /// Explicit `key` field.
    pub key: Option<String>,
    /// Legacy identifying attribute (`vmid` or `hid`) and its value.
    pub legacy_id: Option<(&'static str, String)>,
}

/// Derive the dedupe key of a tag, if it has one.
pub fn dedupe_key(
    kind: TagKind,
    props: &Props,
    hints: &IdentityHints,
    config: &DedupeConfig,
) -> Option<String> {
    if let Some(key) = &hints.key {
        return Some(format!("{kind}:{key}"));
    }

    match kind {
        TagKind::Title => Some("title".into()),
        TagKind::Base => Some("base".into()),
        TagKind::Meta => meta_key(props, hints, config),
        TagKind::Link => link_key(props, config).or_else(|| distinct_legacy_key(kind, hints, config)),
        _ => distinct_legacy_key(kind, hints, config),
    }
}

fn meta_key(props: &Props, hints: &IdentityHints, config: &DedupeConfig) -> Option<String> {
    if find(props, "charset").is_some() {
        return Some("meta:charset".into());
    }
    if let Some(equiv) = find_str(props, "http-equiv") {
        return Some(format!("meta:http-equiv:{}", equiv.to_ascii_lowercase()));
    }
    if let Some(key) = distinct_legacy_key(TagKind::Meta, hints, config) {
        return Some(key);
    }
    if let Some(name) = find_str(props, "name") {
        return Some(format!("meta:name:{name}"));
    }
    if let Some(property) = find_str(props, "property") {
        return Some(format!("meta:property:{property}"));
    }
    if hints.legacy_id.is_some() && config.legacy_id == LegacyIdStrategy::AliasName {
        // The first custom attribute plays the role of `name`
        return props
            .iter()
            .find(|attr| attr.name != "content")
            .and_then(|attr| match &attr.value {
                AttrValue::Str(value) => Some(format!("meta:name:{value}")),
                AttrValue::Present => None,
            });
    }
    None
}

fn link_key(props: &Props, config: &DedupeConfig) -> Option<String> {
    let rel = find_str(props, "rel")?.trim();
    config
        .is_singleton_rel(rel)
        .then(|| format!("link:rel:{}", rel.to_ascii_lowercase()))
}

fn distinct_legacy_key(kind: TagKind, hints: &IdentityHints, config: &DedupeConfig) -> Option<String> {
    match (&hints.legacy_id, config.legacy_id) {
        (Some((attr, id)), LegacyIdStrategy::Distinct) => Some(format!("{kind}:{attr}:{id}")),
        _ => None,
    }
}

fn find<'a>(props: &'a Props, name: &str) -> Option<&'a AttrValue> {
    props.iter().find(|attr| attr.name == name).map(|attr| &attr.value)
}

fn find_str<'a>(props: &'a Props, name: &str) -> Option<&'a str> {
    match find(props, name)? {
        AttrValue::Str(value) => Some(value),
        AttrValue::Present => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Attr;

    fn props(pairs: &[(&str, &str)]) -> Props {
        pairs.iter().map(|(k, v)| Attr::new(*k, *v)).collect()
    }

    fn key(kind: TagKind, pairs: &[(&str, &str)]) -> Option<String> {
        dedupe_key(kind, &props(pairs), &IdentityHints::default(), &DedupeConfig::default())
    }

    fn legacy(id: &str) -> IdentityHints {
        IdentityHints {
            key: None,
            legacy_id: Some(("vmid", id.into())),
        }
    }

    #[test]
    fn test_explicit_key_wins_and_is_scoped_by_kind() {
        let hints = IdentityHints {
            key: Some("icon".into()),
            legacy_id: None,
        };
        let config = DedupeConfig::default();
        let meta = dedupe_key(TagKind::Meta, &props(&[("name", "description")]), &hints, &config);
        let link = dedupe_key(TagKind::Link, &props(&[("rel", "icon")]), &hints, &config);
        assert_eq!(meta.as_deref(), Some("meta:icon"));
        assert_eq!(link.as_deref(), Some("link:icon"));
    }

    #[test]
    fn test_meta_rules() {
        assert_eq!(key(TagKind::Meta, &[("charset", "utf-8")]).as_deref(), Some("meta:charset"));
        assert_eq!(
            key(TagKind::Meta, &[("http-equiv", "Content-Security-Policy"), ("content", "x")]).as_deref(),
            Some("meta:http-equiv:content-security-policy")
        );
        assert_eq!(
            key(TagKind::Meta, &[("name", "description"), ("content", "x")]).as_deref(),
            Some("meta:name:description")
        );
        assert_eq!(
            key(TagKind::Meta, &[("property", "og:title"), ("content", "x")]).as_deref(),
            Some("meta:property:og:title")
        );
        assert_eq!(key(TagKind::Meta, &[("unknown-key", "x")]), None);
    }

    #[test]
    fn test_singletons() {
        assert_eq!(key(TagKind::Base, &[("href", "/")]).as_deref(), Some("base"));
        assert_eq!(key(TagKind::Title, &[]).as_deref(), Some("title"));
        assert_eq!(
            key(TagKind::Link, &[("rel", "canonical"), ("href", "/")]).as_deref(),
            Some("link:rel:canonical")
        );
        assert_eq!(key(TagKind::Link, &[("rel", "icon"), ("href", "/f.ico")]), None);
        assert_eq!(key(TagKind::Script, &[("src", "/a.js")]), None);
    }

    #[test]
    fn test_legacy_distinct_strategy() {
        let config = DedupeConfig::default();
        let props = props(&[("unknown-key", "description"), ("content", "test")]);
        let first = dedupe_key(TagKind::Meta, &props, &legacy("desc-1"), &config);
        let second = dedupe_key(TagKind::Meta, &props, &legacy("desc-2"), &config);
        assert_eq!(first.as_deref(), Some("meta:vmid:desc-1"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_legacy_distinct_overrides_name() {
        let config = DedupeConfig::default();
        let props = props(&[("name", "description"), ("content", "test")]);
        let key = dedupe_key(TagKind::Meta, &props, &legacy("desc-1"), &config);
        assert_eq!(key.as_deref(), Some("meta:vmid:desc-1"));
    }

    #[test]
    fn test_legacy_alias_name_strategy() {
        let config = DedupeConfig {
            legacy_id: LegacyIdStrategy::AliasName,
            ..Default::default()
        };
        let props = props(&[("content", "test"), ("unknown-key", "description")]);
        let first = dedupe_key(TagKind::Meta, &props, &legacy("desc-1"), &config);
        let second = dedupe_key(TagKind::Meta, &props, &legacy("desc-2"), &config);
        assert_eq!(first.as_deref(), Some("meta:name:description"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_legacy_id_on_other_kinds() {
        let config = DedupeConfig::default();
        let key = dedupe_key(TagKind::Script, &props(&[("src", "/a.js")]), &legacy("analytics"), &config);
        assert_eq!(key.as_deref(), Some("script:vmid:analytics"));
    }
}
