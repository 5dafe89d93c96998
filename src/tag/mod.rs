//! Normalized tag records.
//!
//! A [`Tag`] is one renderable element derived from an entry's raw input.
//! Besides its attributes it carries the identity the resolver and the
//! reconciler work with: a dedupe key, a content hash, a priority and a
//! position.
//!
//! ```text
//! entry input ──► normalize ──► Tag { kind, props, content,
//!                                     dedupe_key, hash,
//!                                     priority, position, owner }
//! ```

pub mod dedupe;
pub mod hash;
pub mod normalize;

pub use hash::ContentHash;
pub use normalize::{NormalizedEntry, normalize_entry};

use crate::entry::EntryId;
use compact_str::CompactString;
use regex::Regex;
use serde_json::Value;
use smallvec::SmallVec;
use std::{fmt, sync::LazyLock};

/// Whether `name` may be written as an attribute name without escaping.
pub fn is_valid_attr_name(name: &str) -> bool {
    static RE_ATTR_NAME: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z_:][-A-Za-z0-9_:.]*$").unwrap());
    RE_ATTR_NAME.is_match(name)
}

// ============================================================================
// Kind
// ============================================================================

/// Element kinds that end up in the tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagKind {
    Title,
    Base,
    Meta,
    Link,
    Style,
    Script,
    Noscript,
}

impl TagKind {
    /// Element name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Base => "base",
            Self::Meta => "meta",
            Self::Link => "link",
            Self::Style => "style",
            Self::Script => "script",
            Self::Noscript => "noscript",
        }
    }

    /// Void elements render without a closing tag.
    pub const fn is_void(self) -> bool {
        matches!(self, Self::Base | Self::Meta | Self::Link)
    }

    /// Whether `children`/`innerHTML`/`textContent` are meaningful.
    pub const fn takes_content(self) -> bool {
        matches!(
            self,
            Self::Title | Self::Style | Self::Script | Self::Noscript
        )
    }

    /// Whether the element may be placed inside `<body>`.
    pub const fn allows_body(self) -> bool {
        matches!(
            self,
            Self::Link | Self::Style | Self::Script | Self::Noscript
        )
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Ranking of a tag. Higher values render first and win dedupe conflicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagPriority(pub i32);

impl TagPriority {
    pub const CRITICAL: Self = Self(100);
    pub const HIGH: Self = Self(50);
    pub const NORMAL: Self = Self(0);
    pub const LOW: Self = Self(-50);

    /// Parse a named level.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "critical" => Some(Self::CRITICAL),
            "high" => Some(Self::HIGH),
            "normal" => Some(Self::NORMAL),
            "low" => Some(Self::LOW),
            _ => name.trim().parse().ok().map(Self),
        }
    }

    /// Parse a `tagPriority` input value: an integer or a named level.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(|n| Self(n.clamp(i32::MIN.into(), i32::MAX.into()) as i32)),
            Value::String(s) => Self::from_name(s),
            _ => None,
        }
    }
}

impl From<i32> for TagPriority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

// ============================================================================
// Position
// ============================================================================

/// Where in the document a tag lands. Declaration order is render order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TagPosition {
    HeadPrepend,
    #[default]
    Head,
    HeadAppend,
    BodyOpen,
    BodyClose,
}

impl TagPosition {
    pub const ALL: [Self; 5] = [
        Self::HeadPrepend,
        Self::Head,
        Self::HeadAppend,
        Self::BodyOpen,
        Self::BodyClose,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "headPrepend" => Some(Self::HeadPrepend),
            "head" => Some(Self::Head),
            "headAppend" => Some(Self::HeadAppend),
            "bodyOpen" | "bodyPrepend" => Some(Self::BodyOpen),
            "bodyClose" | "bodyAppend" => Some(Self::BodyClose),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HeadPrepend => "headPrepend",
            Self::Head => "head",
            Self::HeadAppend => "headAppend",
            Self::BodyOpen => "bodyOpen",
            Self::BodyClose => "bodyClose",
        }
    }

    pub const fn in_body(self) -> bool {
        matches!(self, Self::BodyOpen | Self::BodyClose)
    }

    /// Positions that grow from the start of their parent element.
    pub const fn is_leading(self) -> bool {
        matches!(self, Self::HeadPrepend | Self::BodyOpen)
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// Attributes and content
// ============================================================================

/// Attribute value. `false` and `null` inputs never produce an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    Str(String),
    /// A boolean attribute, rendered bare.
    Present,
}

impl AttrValue {
    /// Value as it is written to a live element.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Str(s) => s,
            Self::Present => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attr {
    pub name: CompactString,
    pub value: AttrValue,
}

impl Attr {
    pub fn new(name: impl Into<CompactString>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Str(value.into()),
        }
    }
}

/// Attributes in declaration order.
pub type Props = SmallVec<[Attr; 4]>;

/// Inner content of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InnerContent {
    /// Inserted verbatim (`children`, `innerHTML`).
    Html(String),
    /// Escaped on output (`textContent`, titles).
    Text(String),
}

impl InnerContent {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html(s) | Self::Text(s) => s,
        }
    }
}

// ============================================================================
// Tag
// ============================================================================

/// One normalized, renderable element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    pub props: Props,
    pub content: Option<InnerContent>,
    pub dedupe_key: Option<String>,
    pub hash: ContentHash,
    pub priority: TagPriority,
    pub position: TagPosition,
    pub owner: EntryId,
    /// Declaration index within the owning entry
    pub(crate) index: u32,
}

impl Tag {
    /// Look up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.props
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Recompute the content hash after props, content or position changed.
    pub(crate) fn rehash(&mut self) {
        self.hash = ContentHash::compute(self.kind, self.position, &self.props, self.content.as_ref());
    }

    /// Ordering within a position group: priority desc, then registration
    /// order, then declaration order.
    pub(crate) fn sort_key(&self) -> (TagPosition, std::cmp::Reverse<TagPriority>, EntryId, u32) {
        (
            self.position,
            std::cmp::Reverse(self.priority),
            self.owner,
            self.index,
        )
    }

    /// Whether `self` beats `other` for the same dedupe key.
    pub(crate) fn outranks(&self, other: &Tag) -> bool {
        (self.priority, self.owner, self.index) > (other.priority, other.owner, other.index)
    }
}
