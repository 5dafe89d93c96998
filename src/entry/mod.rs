//! Entry store.
//!
//! Holds every producer's contribution in registration order. The store is
//! the single source of truth for resolution: it hands out consistent
//! snapshots and advances a generation counter on every mutation so cached
//! resolutions know when they are stale.
//!
//! # Thread Safety
//!
//! Uses `RwLock` to allow:
//! - Multiple concurrent snapshots
//! - Exclusive writes (register, patch, dispose)

mod handle;

pub use handle::EntryHandle;

use crate::{
    log,
    resolve::TitleTemplateFn,
    tag::{TagPosition, TagPriority},
};
use parking_lot::RwLock;
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Identity of an entry. Ids are handed out in increasing order, so they
/// double as registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    /// Id of the defaults entry, registered before every producer.
    pub const DEFAULTS: Self = Self(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raw input of an entry: a JSON object with head sections, plus an
/// optional title template function that JSON cannot express.
#[derive(Clone, Default)]
pub struct HeadInput {
    value: Value,
    title_template: Option<TitleTemplateFn>,
}

impl HeadInput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            title_template: None,
        }
    }

    /// Compute the title from a function of the resolved title.
    ///
    /// Takes precedence over a `titleTemplate` field in the same input.
    pub fn with_title_template<F>(mut self, template: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.title_template = Some(Arc::new(template));
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn title_template(&self) -> Option<&TitleTemplateFn> {
        self.title_template.as_ref()
    }
}

impl From<Value> for HeadInput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for HeadInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadInput")
            .field("value", &self.value)
            .field("title_template", &self.title_template.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// Options applied to every tag of an entry unless a tag overrides them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub priority: Option<TagPriority>,
    pub position: Option<TagPosition>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: impl Into<TagPriority>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn position(mut self, position: TagPosition) -> Self {
        self.position = Some(position);
        self
    }
}

/// One producer's contribution.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub input: HeadInput,
    pub options: EntryOptions,
}

/// Consistent view of the store, taken under one read lock.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Generation the entries were read at.
    pub generation: u64,
    /// Entries in registration order.
    pub entries: Vec<Arc<Entry>>,
}

#[derive(Debug)]
struct StoreInner {
    entries: Vec<Arc<Entry>>,
    next_id: u64,
    generation: u64,
}

impl StoreInner {
    fn position(&self, id: EntryId) -> Option<usize> {
        // Ids are increasing, so the entries are sorted by id
        self.entries.binary_search_by_key(&id, |entry| entry.id).ok()
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}

/// Ordered collection of registered entries.
#[derive(Debug)]
pub struct EntryStore {
    inner: RwLock<StoreInner>,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                entries: Vec::new(),
                next_id: 1,
                generation: 0,
            }),
        }
    }

    /// Create a store holding the defaults entry.
    ///
    /// The defaults entry has id 0 and therefore loses every conflict against
    /// a producer entry of equal priority.
    pub fn with_defaults(input: impl Into<HeadInput>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            inner.entries.push(Arc::new(Entry {
                id: EntryId::DEFAULTS,
                input: input.into(),
                options: EntryOptions::default(),
            }));
            inner.touch();
        }
        store
    }

    /// Add an entry and return a handle to it.
    pub fn register(
        self: &Arc<Self>,
        input: impl Into<HeadInput>,
        options: EntryOptions,
    ) -> EntryHandle {
        let id = self.insert(input.into(), options);
        EntryHandle::new(id, Arc::clone(self))
    }

    fn insert(&self, input: HeadInput, options: EntryOptions) -> EntryId {
        let mut inner = self.inner.write();
        let id = EntryId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push(Arc::new(Entry { id, input, options }));
        inner.touch();
        log!("entry"; "registered {id}");
        id
    }

    /// Replace an entry's input wholesale.
    ///
    /// Returns `false` (and changes nothing) if the entry was disposed.
    pub fn patch(&self, id: EntryId, input: impl Into<HeadInput>) -> bool {
        let mut inner = self.inner.write();
        let Some(index) = inner.position(id) else {
            return false;
        };
        let options = inner.entries[index].options;
        inner.entries[index] = Arc::new(Entry {
            id,
            input: input.into(),
            options,
        });
        inner.touch();
        log!("entry"; "patched {id}");
        true
    }

    /// Remove an entry. Disposing twice is a no-op.
    pub fn dispose(&self, id: EntryId) -> bool {
        let mut inner = self.inner.write();
        let Some(index) = inner.position(id) else {
            return false;
        };
        inner.entries.remove(index);
        inner.touch();
        log!("entry"; "disposed {id}");
        true
    }

    /// Entries in registration order.
    pub fn list(&self) -> Vec<Arc<Entry>> {
        self.inner.read().entries.clone()
    }

    /// Entries together with the generation they belong to.
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read();
        StoreSnapshot {
            generation: inner.generation,
            entries: inner.entries.clone(),
        }
    }

    /// Current generation; advances on every mutation.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.inner.read().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Arc<EntryStore> {
        Arc::new(EntryStore::new())
    }

    #[test]
    fn test_register_assigns_increasing_ids() {
        let store = store();
        let a = store.register(json!({ "title": "a" }), EntryOptions::new());
        let b = store.register(json!({ "title": "b" }), EntryOptions::new());

        assert!(a.id() < b.id());
        let ids: Vec<_> = store.list().iter().map(|e| e.id).collect();
        assert_eq!(ids, [a.id(), b.id()]);
    }

    #[test]
    fn test_mutations_advance_generation() {
        let store = store();
        let g0 = store.generation();
        let handle = store.register(json!({}), EntryOptions::new());
        let g1 = store.generation();
        assert!(g1 > g0);

        assert!(handle.patch(json!({ "title": "x" })));
        let g2 = store.generation();
        assert!(g2 > g1);

        assert!(handle.dispose());
        assert!(store.generation() > g2);
    }

    #[test]
    fn test_patch_replaces_input_and_keeps_id_and_options() {
        let store = store();
        let options = EntryOptions::new().priority(TagPriority::HIGH);
        let handle = store.register(json!({ "title": "old", "meta": [] }), options);

        handle.patch(json!({ "title": "new" }));

        let entries = store.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, handle.id());
        assert_eq!(entries[0].options, options);
        assert_eq!(entries[0].input.value(), &json!({ "title": "new" }));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let store = store();
        let handle = store.register(json!({}), EntryOptions::new());

        assert!(handle.dispose());
        let generation = store.generation();
        assert!(!handle.dispose());
        assert_eq!(store.generation(), generation);
        assert!(store.is_empty());
    }

    #[test]
    fn test_patch_after_dispose_is_noop() {
        let store = store();
        let handle = store.register(json!({}), EntryOptions::new());
        handle.dispose();

        let generation = store.generation();
        assert!(!handle.patch(json!({ "title": "late" })));
        assert_eq!(store.generation(), generation);
        assert!(!store.contains(handle.id()));
    }

    #[test]
    fn test_defaults_entry_comes_first() {
        let store = Arc::new(EntryStore::with_defaults(json!({ "title": "default" })));
        let handle = store.register(json!({ "title": "page" }), EntryOptions::new());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.entries[0].id, EntryId::DEFAULTS);
        assert_eq!(snapshot.entries[1].id, handle.id());
        assert_eq!(snapshot.generation, store.generation());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutations() {
        let store = store();
        let handle = store.register(json!({ "title": "a" }), EntryOptions::new());
        let snapshot = store.snapshot();

        handle.dispose();

        assert_eq!(snapshot.entries.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_title_template_fn_is_kept() {
        let input = HeadInput::new(json!({ "title": "x" }))
            .with_title_template(|title| title.map(|t| t.to_uppercase()));
        let template = input.title_template().unwrap();
        assert_eq!(template(Some("x")).as_deref(), Some("X"));
        assert!(format!("{input:?}").contains("fn"));
    }
}
