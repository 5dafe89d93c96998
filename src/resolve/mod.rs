//! Resolution of all entries into one head state.
//!
//! # Pipeline
//!
//! ```text
//! entries ──► normalize ──► dedupe ──► title ──► attrs ──► order
//!  (registration order)     (by key)   (template) (merge)  (position, priority, order)
//! ```
//!
//! Resolution is a pure function of the entries: the same entries in the
//! same order always resolve to the same [`ResolvedHead`].

mod attrs;
mod title;

pub use attrs::AttrBag;
pub use title::{TitleTemplate, TitleTemplateFn};

use crate::{
    config::DedupeConfig,
    entry::{Entry, EntryId},
    error::Diagnostic,
    log,
    tag::{
        Attr, ContentHash, InnerContent, Props, Tag, TagKind, TagPosition, TagPriority,
        normalize_entry,
    },
};
use rustc_hash::FxHashMap;
use std::{collections::hash_map::Entry as MapEntry, sync::Arc};

/// Immutable snapshot of the resolved head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedHead {
    /// Final title, template applied.
    pub title: Option<String>,
    pub html_attrs: AttrBag,
    pub body_attrs: AttrBag,
    /// Deduplicated tags grouped by position, title included.
    pub tags: Vec<Tag>,
    /// Dropped input and dedupe traces, in resolution order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedHead {
    /// Tags placed at `position`, in render order.
    pub fn tags_at(&self, position: TagPosition) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(move |tag| tag.position == position)
    }

    /// The tag holding a dedupe key, if it survived.
    pub fn find(&self, dedupe_key: &str) -> Option<&Tag> {
        self.tags
            .iter()
            .find(|tag| tag.dedupe_key.as_deref() == Some(dedupe_key))
    }

    /// Recoverable input problems, without dedupe traces.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|diag| diag.is_warning())
    }
}

/// One entry's `htmlAttrs`/`bodyAttrs` together with its merge rank.
struct AttrLayer {
    rank: (TagPriority, EntryId),
    html: Vec<Attr>,
    body: Vec<Attr>,
}

/// Resolve entries (in registration order) into a head state.
pub fn resolve(entries: &[Arc<Entry>], config: &DedupeConfig) -> ResolvedHead {
    let mut diagnostics = Vec::new();
    let mut candidates = Vec::new();
    let mut template = None;
    let mut layers = Vec::with_capacity(entries.len());

    for entry in entries {
        let normalized = normalize_entry(entry, config);
        let rank = (entry.options.priority.unwrap_or_default(), entry.id);

        diagnostics.extend(normalized.diagnostics);
        candidates.extend(normalized.tags);
        if let Some(found) = normalized.title_template {
            // Later entries win ties, so `>=` while walking in registration order
            if template.as_ref().is_none_or(|(best, _)| rank.0 >= *best) {
                template = Some((rank.0, found));
            }
        }
        layers.push(AttrLayer {
            rank,
            html: normalized.html_attrs,
            body: normalized.body_attrs,
        });
    }

    let mut tags = dedupe(candidates, &mut diagnostics);
    let title = apply_title(&mut tags, template.map(|(_, template)| template));
    let (html_attrs, body_attrs) = merge_attrs(layers);

    tags.sort_by_key(Tag::sort_key);

    log!("resolve"; "{} entries -> {} tags", entries.len(), tags.len());
    ResolvedHead {
        title,
        html_attrs,
        body_attrs,
        tags,
        diagnostics,
    }
}

/// Keep one tag per dedupe key; keyless tags all survive.
fn dedupe(candidates: Vec<Tag>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Tag> {
    let keep: Vec<bool> = {
        let mut winners: FxHashMap<&str, usize> = FxHashMap::default();

        for (i, tag) in candidates.iter().enumerate() {
            let Some(key) = tag.dedupe_key.as_deref() else {
                continue;
            };
            match winners.entry(key) {
                MapEntry::Vacant(slot) => {
                    slot.insert(i);
                }
                MapEntry::Occupied(mut slot) => {
                    let current = &candidates[*slot.get()];
                    let (winner, loser) = if tag.outranks(current) {
                        let loser = current.owner;
                        slot.insert(i);
                        (tag.owner, loser)
                    } else {
                        (current.owner, tag.owner)
                    };
                    log!("dedupe"; "`{key}`: {winner} overrides {loser}");
                    diagnostics.push(Diagnostic::DedupeConflict {
                        key: key.to_owned(),
                        winner,
                        loser,
                    });
                }
            }
        }

        candidates
            .iter()
            .enumerate()
            .map(|(i, tag)| match tag.dedupe_key.as_deref() {
                Some(key) => winners.get(key) == Some(&i),
                None => true,
            })
            .collect()
    };

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(tag, keep)| keep.then_some(tag))
        .collect()
}

/// Apply the winning template to the winning title tag.
///
/// Returns the final title; the title tag is updated, created (for function
/// templates that produce a title from nothing) or removed accordingly.
fn apply_title(tags: &mut Vec<Tag>, template: Option<TitleTemplate>) -> Option<String> {
    let index = tags.iter().position(|tag| tag.kind == TagKind::Title);
    let raw = index.and_then(|i| tags[i].content.as_ref().map(|c| c.as_str().to_owned()));

    let title = match &template {
        Some(template) => template.apply(raw.as_deref()),
        None => raw,
    };

    match (index, &title) {
        (Some(i), Some(title)) => {
            let tag = &mut tags[i];
            tag.content = Some(InnerContent::Text(title.clone()));
            tag.rehash();
        }
        (Some(i), None) => {
            tags.remove(i);
        }
        (None, Some(title)) => {
            let content = Some(InnerContent::Text(title.clone()));
            tags.push(Tag {
                kind: TagKind::Title,
                props: Props::new(),
                hash: ContentHash::compute(TagKind::Title, TagPosition::Head, &Props::new(), content.as_ref()),
                content,
                dedupe_key: Some("title".into()),
                priority: TagPriority::HIGH,
                position: TagPosition::Head,
                owner: EntryId::DEFAULTS,
                index: 0,
            });
        }
        (None, None) => {}
    }
    title
}

/// Layer attribute bags in ascending (priority, registration) order.
fn merge_attrs(mut layers: Vec<AttrLayer>) -> (AttrBag, AttrBag) {
    layers.sort_by_key(|layer| layer.rank);

    let mut html = AttrBag::new();
    let mut body = AttrBag::new();
    for layer in &layers {
        html.merge(&layer.html);
        body.merge(&layer.body);
    }
    (html, body)
}
