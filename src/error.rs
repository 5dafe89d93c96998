//! Error and diagnostic types.
//!
//! Only [`HeadError`] is a hard failure. Everything the resolver or the
//! reconciler can recover from is reported as a [`Diagnostic`] next to the
//! result instead.

use crate::entry::EntryId;
use thiserror::Error;

/// Hard errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum HeadError {
    #[error("document unavailable: missing <{0}>")]
    DocumentUnavailable(&'static str),
}

/// Why a piece of entry input could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("entry input must be an object")]
    NotAnObject,

    #[error("unknown section `{0}`")]
    UnknownSection(String),

    #[error("`{field}` expects {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("invalid attribute name `{0}`")]
    InvalidAttributeName(String),

    #[error("unknown tag priority `{0}`")]
    UnknownPriority(String),

    #[error("unknown tag position `{0}`")]
    UnknownPosition(String),

    #[error("<{0}> does not take inner content")]
    ContentNotAllowed(&'static str),

    #[error("`{0}` is a per-tag field and has no effect on an attribute bag")]
    ReservedField(String),
}

impl InputError {
    pub(crate) fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            field: field.into(),
            expected,
        }
    }
}

/// Recoverable findings reported alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Part of an entry was dropped; the rest of the entry still resolved.
    #[error("entry {entry}: {error}")]
    MalformedEntryInput { entry: EntryId, error: InputError },

    /// Two tags shared a dedupe key. Informational only.
    #[error("`{key}`: entry {winner} overrides entry {loser}")]
    DedupeConflict {
        key: String,
        winner: EntryId,
        loser: EntryId,
    },

    /// The reconciler left a live element or attribute alone because it no
    /// longer carries this crate's marker.
    #[error("not owned, left untouched: {target}")]
    OwnershipViolation { target: String },
}

impl Diagnostic {
    /// Whether the diagnostic signals dropped input rather than a trace.
    pub const fn is_warning(&self) -> bool {
        !matches!(self, Self::DedupeConflict { .. })
    }
}
