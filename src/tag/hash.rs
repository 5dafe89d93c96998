//! Content identity of a tag.
//!
//! The hash covers everything that affects the rendered element (kind,
//! position, attributes in order, inner content) and nothing else, so an
//! unchanged tag keeps its identity across resolutions no matter which entry
//! produced it or when.

use super::{AttrValue, InnerContent, Props, TagKind, TagPosition};
use std::fmt;

/// Length of the ownership signature in bytes (6 hex digits).
const SIGNATURE_BYTES: usize = 3;

/// blake3 digest over a tag's rendered form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    pub fn compute(
        kind: TagKind,
        position: TagPosition,
        props: &Props,
        content: Option<&InnerContent>,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_str().as_bytes());
        hasher.update(&[0]);
        hasher.update(position.as_str().as_bytes());
        hasher.update(&[0]);
        for attr in props {
            hasher.update(attr.name.as_bytes());
            match &attr.value {
                AttrValue::Str(value) => {
                    hasher.update(b"=");
                    hasher.update(value.as_bytes());
                }
                AttrValue::Present => {
                    hasher.update(b"?");
                }
            }
            hasher.update(&[0]);
        }
        match content {
            Some(InnerContent::Html(html)) => {
                hasher.update(b"\x01");
                hasher.update(html.as_bytes());
            }
            Some(InnerContent::Text(text)) => {
                hasher.update(b"\x02");
                hasher.update(text.as_bytes());
            }
            None => {}
        }
        Self(hasher.finalize())
    }

    /// Short stable signature, used in the `data-h-<signature>` marker.
    pub fn signature(&self) -> String {
        hex::encode(&self.0.as_bytes()[..SIGNATURE_BYTES])
    }

    /// Full hex digest.
    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.signature())
    }
}
