//! headweave - one `<head>` from many producers.
//!
//! Independent producers register *entries* (titles, meta tags, links,
//! scripts, styles, `<html>`/`<body>` attributes). The resolver merges them
//! into one deduplicated, ordered [`ResolvedHead`], which is rendered to
//! markup on the server or applied to a live document with a minimal set of
//! mutations.
//!
//! ```text
//! producers ──► EntryStore ──► resolve ──┬──► render_to_string ──► HeadHtml
//!                                        └──► DomReconciler    ──► Document
//! ```
//!
//! # Example
//!
//! ```
//! use headweave::Head;
//! use serde_json::json;
//!
//! let head = Head::new();
//! head.push(json!({ "title": "Home", "titleTemplate": "%s | Site" }));
//! head.push(json!({ "meta": [{ "name": "description", "content": "Welcome" }] }));
//!
//! let html = head.render_to_string();
//! assert_eq!(
//!     html.head_tags,
//!     r#"<title>Home | Site</title><meta name="description" content="Welcome"><meta name="head:count" content="1">"#
//! );
//! ```

pub mod config;
pub mod dom;
pub mod entry;
pub mod error;
pub mod head;
pub mod logger;
pub mod render;
pub mod resolve;
pub mod tag;

pub use config::HeadConfig;
pub use dom::{ApplyReport, Document, DomReconciler, InsertAt, MemoryDocument};
pub use entry::{EntryHandle, EntryId, EntryOptions, HeadInput};
pub use error::{Diagnostic, HeadError, InputError};
pub use head::Head;
pub use render::HeadHtml;
pub use resolve::ResolvedHead;
pub use tag::{Tag, TagKind, TagPosition, TagPriority};
