//! Keyed reconciliation of resolved heads against a live document.
//!
//! # Algorithm
//!
//! ```text
//! previous state ─┐
//!                 ├─► slots ─► release stale ─► plan ─► place in order ─► attrs
//! next state ─────┘
//! ```
//!
//! Every tag maps to a slot: its dedupe key, or its content hash plus an
//! occurrence index when it has no key. Per slot the reconciler keeps the
//! element untouched (same hash), patches its attributes in place, or
//! replaces it. Within a position, the longest run of elements still in
//! their old relative order stays put and only the others are moved.

use super::{Document, InsertAt};
use crate::{
    config::DomConfig,
    error::{Diagnostic, HeadError},
    log,
    resolve::{AttrBag, ResolvedHead},
    tag::{ContentHash, InnerContent, Tag, TagPosition},
};
use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};
use std::{mem, sync::Arc};

/// What one [`DomReconciler::apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: usize,
    /// Elements patched in place or replaced.
    pub updated: usize,
    pub removed: usize,
    pub moved: usize,
    /// Attribute and class changes on `<html>` and `<body>`.
    pub attributes: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyReport {
    /// Total number of element and attribute operations.
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.removed + self.moved + self.attributes
    }

    pub fn is_noop(&self) -> bool {
        self.mutations() == 0
    }

    fn violation(&mut self, target: String) {
        log!("dom"; "not owned, left untouched: {target}");
        self.diagnostics.push(Diagnostic::OwnershipViolation { target });
    }
}

/// A live element together with the tag it was last synced to.
#[derive(Debug, Clone)]
struct Managed<E> {
    element: E,
    tag: Tag,
}

/// Attributes and classes this reconciler set on `<html>` or `<body>`.
#[derive(Debug, Clone, Default)]
struct AttrState {
    owned: Vec<(CompactString, String)>,
    classes: Vec<CompactString>,
}

enum Action<E> {
    Keep { element: E, moved: bool },
    Patch { managed: Managed<E>, moved: bool },
    Replace(Managed<E>),
    Create,
}

/// Applies resolved heads to one document, remembering what it manages.
///
/// Use one reconciler per document.
#[derive(Debug)]
pub struct DomReconciler<E> {
    prefix: CompactString,
    previous: Option<Arc<ResolvedHead>>,
    managed: FxHashMap<String, Managed<E>>,
    /// Slots in the order of the last apply
    order: Vec<String>,
    html: AttrState,
    body: AttrState,
}

impl<E> Default for DomReconciler<E> {
    fn default() -> Self {
        Self::new(&DomConfig::default())
    }
}

impl<E> DomReconciler<E> {
    pub fn new(config: &DomConfig) -> Self {
        Self {
            prefix: config.signature_prefix.as_str().into(),
            previous: None,
            managed: FxHashMap::default(),
            order: Vec::new(),
            html: AttrState::default(),
            body: AttrState::default(),
        }
    }

    /// The state of the last successful apply.
    pub fn previous(&self) -> Option<&Arc<ResolvedHead>> {
        self.previous.as_ref()
    }

    /// Number of elements currently managed.
    pub fn len(&self) -> usize {
        self.managed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    /// Name of the ownership marker attribute for a tag.
    pub fn marker(&self, tag: &Tag) -> String {
        format!("{}{}", self.prefix, tag.hash.signature())
    }
}

impl<E: Clone + PartialEq + std::fmt::Debug> DomReconciler<E> {
    /// Bring the document in line with `state`.
    ///
    /// Fails without touching anything if the document lacks `<html>`,
    /// `<head>` or `<body>`.
    pub fn apply<D>(&mut self, doc: &mut D, state: &Arc<ResolvedHead>) -> Result<ApplyReport, HeadError>
    where
        D: Document<Element = E>,
    {
        let html = doc.html().ok_or(HeadError::DocumentUnavailable("html"))?;
        let head = doc.head().ok_or(HeadError::DocumentUnavailable("head"))?;
        let body = doc.body().ok_or(HeadError::DocumentUnavailable("body"))?;

        let mut report = ApplyReport::default();
        let tags = &state.tags;
        let slots = slots(tags);

        // Stale slots go first so replacements never see them
        let old_order = mem::take(&mut self.order);
        {
            let live: FxHashSet<&str> = slots.iter().map(String::as_str).collect();
            for slot in &old_order {
                if live.contains(slot.as_str()) {
                    continue;
                }
                if let Some(managed) = self.managed.remove(slot)
                    && self.release(doc, &managed, &mut report)
                {
                    report.removed += 1;
                }
            }
        }

        let mut plan = self.plan(doc, &slots, tags);
        mark_moves(&mut plan, &slots, tags, &old_order);

        // Elements that stay where they are, usable as insertion anchors
        let anchors: Vec<Option<E>> = plan
            .iter()
            .map(|action| match action {
                Action::Keep { element, moved: false } => Some(element.clone()),
                Action::Patch { managed, moved: false } => Some(managed.element.clone()),
                _ => None,
            })
            .collect();

        let mut last_placed: [Option<E>; TagPosition::ALL.len()] = Default::default();
        for (i, ((slot, tag), action)) in slots.iter().zip(tags).zip(plan).enumerate() {
            let parent = if tag.position.in_body() { &body } else { &head };
            let element = match action {
                Action::Keep { element, moved } => {
                    if moved {
                        doc.insert(parent, &element, anchor(i, tags, &anchors, &last_placed));
                        report.moved += 1;
                    }
                    element
                }
                Action::Patch { managed, moved } => {
                    self.patch(doc, &managed, tag);
                    if moved {
                        doc.insert(parent, &managed.element, anchor(i, tags, &anchors, &last_placed));
                        report.moved += 1;
                    }
                    report.updated += 1;
                    managed.element
                }
                Action::Replace(managed) => {
                    self.release(doc, &managed, &mut report);
                    let element = self.create(doc, tag);
                    doc.insert(parent, &element, anchor(i, tags, &anchors, &last_placed));
                    report.updated += 1;
                    element
                }
                Action::Create => {
                    let element = self.create(doc, tag);
                    doc.insert(parent, &element, anchor(i, tags, &anchors, &last_placed));
                    report.created += 1;
                    element
                }
            };
            last_placed[tag.position.index()] = Some(element.clone());
            self.managed.insert(
                slot.clone(),
                Managed {
                    element,
                    tag: tag.clone(),
                },
            );
        }

        sync_attrs(doc, &html, &state.html_attrs, &mut self.html, &mut report, "html");
        sync_attrs(doc, &body, &state.body_attrs, &mut self.body, &mut report, "body");

        self.order = slots;
        self.previous = Some(Arc::clone(state));

        log!(
            "dom";
            "+{} ~{} -{} moved {} attrs {}",
            report.created, report.updated, report.removed, report.moved, report.attributes
        );
        Ok(report)
    }

    /// Decide per slot what happens to its element.
    fn plan<D>(&mut self, doc: &D, slots: &[String], tags: &[Tag]) -> Vec<Action<E>>
    where
        D: Document<Element = E>,
    {
        let mut plan = Vec::with_capacity(slots.len());
        for (slot, tag) in slots.iter().zip(tags) {
            let action = match self.managed.remove(slot) {
                None => Action::Create,
                Some(managed) if !doc.is_connected(&managed.element) => Action::Create,
                Some(managed) if managed.tag.hash == tag.hash => Action::Keep {
                    element: managed.element,
                    moved: false,
                },
                Some(managed) if self.can_patch(doc, &managed, tag) => Action::Patch {
                    managed,
                    moved: false,
                },
                Some(managed) => Action::Replace(managed),
            };
            plan.push(action);
        }
        plan
    }

    /// Attribute-only change on an element that is still ours.
    fn can_patch<D>(&self, doc: &D, managed: &Managed<E>, tag: &Tag) -> bool
    where
        D: Document<Element = E>,
    {
        managed.tag.kind == tag.kind
            && managed.tag.position == tag.position
            && managed.tag.content == tag.content
            && doc.has_attribute(&managed.element, &self.marker(&managed.tag))
    }

    fn create<D>(&self, doc: &mut D, tag: &Tag) -> E
    where
        D: Document<Element = E>,
    {
        let element = doc.create_element(tag.kind.as_str());
        for attr in &tag.props {
            doc.set_attribute(&element, &attr.name, attr.value.as_str());
        }
        match &tag.content {
            Some(InnerContent::Text(text)) => doc.set_text_content(&element, text),
            Some(InnerContent::Html(html)) => doc.set_inner_html(&element, html),
            None => {}
        }
        doc.set_attribute(&element, &self.marker(tag), "");
        element
    }

    fn patch<D>(&self, doc: &mut D, managed: &Managed<E>, tag: &Tag)
    where
        D: Document<Element = E>,
    {
        let element = &managed.element;
        for old in &managed.tag.props {
            if tag.attr(&old.name).is_none() {
                doc.remove_attribute(element, &old.name);
            }
        }
        for attr in &tag.props {
            if managed.tag.attr(&attr.name) != Some(&attr.value) {
                doc.set_attribute(element, &attr.name, attr.value.as_str());
            }
        }
        doc.remove_attribute(element, &self.marker(&managed.tag));
        doc.set_attribute(element, &self.marker(tag), "");
    }

    /// Remove a managed element if it is still attached and still ours.
    fn release<D>(&self, doc: &mut D, managed: &Managed<E>, report: &mut ApplyReport) -> bool
    where
        D: Document<Element = E>,
    {
        if !doc.is_connected(&managed.element) {
            return false;
        }
        if doc.has_attribute(&managed.element, &self.marker(&managed.tag)) {
            doc.remove(&managed.element);
            return true;
        }
        let target = match &managed.tag.dedupe_key {
            Some(key) => format!("<{}> `{key}`", managed.tag.kind),
            None => format!("<{}>", managed.tag.kind),
        };
        report.violation(target);
        false
    }
}

/// Slot of every tag, in tag order.
fn slots(tags: &[Tag]) -> Vec<String> {
    let mut seen: FxHashMap<ContentHash, usize> = FxHashMap::default();
    tags.iter()
        .map(|tag| match &tag.dedupe_key {
            Some(key) => format!("k:{key}"),
            None => {
                let occurrence = seen.entry(tag.hash).or_default();
                let slot = format!("h:{}#{occurrence}", tag.hash.to_hex());
                *occurrence += 1;
                slot
            }
        })
        .collect()
}

/// Flag kept elements that have to move so their position reads in order.
///
/// Per position, the longest run of elements already in increasing old
/// order stays put. Only the rest are moved.
fn mark_moves<E>(plan: &mut [Action<E>], slots: &[String], tags: &[Tag], old_order: &[String]) {
    let old_index: FxHashMap<&str, usize> = old_order
        .iter()
        .enumerate()
        .map(|(i, slot)| (slot.as_str(), i))
        .collect();

    // (plan index, old index) of kept elements, per position
    let mut groups: [Vec<(usize, usize)>; TagPosition::ALL.len()] = Default::default();
    for (i, action) in plan.iter().enumerate() {
        if !matches!(action, Action::Keep { .. } | Action::Patch { .. }) {
            continue;
        }
        if let Some(&old) = old_index.get(slots[i].as_str()) {
            groups[tags[i].position.index()].push((i, old));
        }
    }

    for group in &groups {
        let olds: Vec<usize> = group.iter().map(|&(_, old)| old).collect();
        for (&(i, _), stays) in group.iter().zip(longest_increasing(&olds)) {
            if let Action::Keep { moved, .. } | Action::Patch { moved, .. } = &mut plan[i] {
                *moved = !stays;
            }
        }
    }
}

/// Membership mask of one longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> Vec<bool> {
    // tails[k]: index of the smallest last value of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (i, &value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < value);
        prev[i] = k.checked_sub(1).map(|k| tails[k]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut member = vec![false; seq.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        member[i] = true;
        cursor = prev[i];
    }
    member
}

/// Where to insert the element of tag `i`.
///
/// After the last element placed in the same position, else before the next
/// stationary element of that position, else at the edge of the parent.
fn anchor<'a, E>(
    i: usize,
    tags: &[Tag],
    anchors: &'a [Option<E>],
    last_placed: &'a [Option<E>],
) -> InsertAt<'a, E> {
    let position = tags[i].position;
    if let Some(previous) = &last_placed[position.index()] {
        return InsertAt::After(previous);
    }

    let mut later_group = None;
    for (j, element) in anchors.iter().enumerate().skip(i + 1) {
        let Some(element) = element else {
            continue;
        };
        let other = tags[j].position;
        if other == position {
            return InsertAt::Before(element);
        }
        if later_group.is_none() && other.in_body() == position.in_body() {
            later_group = Some(element);
        }
    }

    if position.is_leading() {
        return InsertAt::Prepend;
    }
    later_group.map_or(InsertAt::Append, InsertAt::Before)
}

/// Sync an attribute bag onto `<html>` or `<body>`.
///
/// Only attributes and classes this reconciler set are ever removed, and an
/// attribute only while its live value is still the one it set.
fn sync_attrs<D: Document>(
    doc: &mut D,
    element: &D::Element,
    bag: &AttrBag,
    state: &mut AttrState,
    report: &mut ApplyReport,
    label: &str,
) {
    let desired: Vec<(&str, &str)> = bag
        .iter()
        .filter(|attr| attr.name != "class")
        .map(|attr| (attr.name.as_str(), attr.value.as_str()))
        .collect();

    let previous = mem::take(&mut state.owned);
    for (name, value) in &previous {
        if desired.iter().any(|(desired, _)| *desired == name.as_str()) {
            continue;
        }
        match doc.attribute(element, name) {
            Some(live) if live == *value => {
                doc.remove_attribute(element, name);
                report.attributes += 1;
            }
            Some(_) => report.violation(format!("<{label}> attribute `{name}`")),
            None => {}
        }
    }
    for &(name, value) in &desired {
        if doc.attribute(element, name).as_deref() != Some(value) {
            doc.set_attribute(element, name, value);
            report.attributes += 1;
            state.owned.push((name.into(), value.to_owned()));
        } else if let Some(owned) = previous.iter().find(|(owned, _)| owned.as_str() == name) {
            state.owned.push(owned.clone());
        }
    }

    let wanted: Vec<&str> = bag.classes().collect();
    let live_attr = doc.attribute(element, "class").unwrap_or_default();
    let mut live: Vec<&str> = live_attr.split_whitespace().collect();
    let previous = mem::take(&mut state.classes);
    let mut changed = false;

    for class in &previous {
        if !wanted.contains(&class.as_str())
            && let Some(i) = live.iter().position(|live| *live == class.as_str())
        {
            live.remove(i);
            changed = true;
        }
    }
    for &class in &wanted {
        if !live.contains(&class) {
            live.push(class);
            changed = true;
            state.classes.push(class.into());
        } else if previous.iter().any(|owned| owned.as_str() == class) {
            state.classes.push(class.into());
        }
    }

    if changed {
        if live.is_empty() {
            doc.remove_attribute(element, "class");
        } else {
            let joined = live.join(" ");
            doc.set_attribute(element, "class", &joined);
        }
        report.attributes += 1;
    }
}
