//! The head manager facade.
//!
//! [`Head`] ties the pieces together: producers register entries in the
//! store, and consumers pull the resolved state, render it to a string or
//! apply it to a live document.
//!
//! # Caching
//!
//! ```text
//! register/patch/dispose ──► store generation + 1
//!                                     │
//! resolve() ── cached generation == store generation? ── yes ──► cached Arc
//!                                     │ no
//!                                     └──► resolve entries, swap cache
//! ```
//!
//! The cache lives in an `ArcSwapOption`, so concurrent readers never block
//! on each other or on a resolution in progress.

use crate::{
    config::HeadConfig,
    dom::{ApplyReport, Document, DomReconciler},
    entry::{Entry, EntryHandle, EntryId, EntryOptions, EntryStore, HeadInput},
    error::HeadError,
    log, logger,
    render::{HeadHtml, render_to_string},
    resolve::{ResolvedHead, resolve},
};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// A resolution together with the store generation it was computed from.
#[derive(Debug)]
struct CachedHead {
    generation: u64,
    state: Arc<ResolvedHead>,
}

/// Head manager: entry store, cached resolution and configuration.
#[derive(Debug)]
pub struct Head {
    store: Arc<EntryStore>,
    config: Arc<HeadConfig>,
    cache: ArcSwapOption<CachedHead>,
}

impl Default for Head {
    fn default() -> Self {
        Self::new()
    }
}

impl Head {
    /// Create a head manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HeadConfig::default())
    }

    /// Create a head manager. The `[defaults]` table, if any, becomes the
    /// lowest-precedence entry.
    pub fn with_config(config: HeadConfig) -> Self {
        if config.verbose {
            logger::set_verbose(true);
        }
        let store = match &config.defaults {
            Some(defaults) => EntryStore::with_defaults(defaults.clone()),
            None => EntryStore::new(),
        };
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            cache: ArcSwapOption::empty(),
        }
    }

    pub fn config(&self) -> &HeadConfig {
        &self.config
    }

    /// Register an entry with default options.
    pub fn push(&self, input: impl Into<HeadInput>) -> EntryHandle {
        self.register(input, EntryOptions::default())
    }

    /// Register an entry.
    pub fn register(&self, input: impl Into<HeadInput>, options: EntryOptions) -> EntryHandle {
        self.store.register(input, options)
    }

    /// Replace an entry's input. Returns `false` if it was disposed.
    pub fn patch(&self, id: EntryId, input: impl Into<HeadInput>) -> bool {
        self.store.patch(id, input)
    }

    /// Remove an entry. Returns `false` if it was already gone.
    pub fn dispose(&self, id: EntryId) -> bool {
        self.store.dispose(id)
    }

    /// Entries in registration order, the defaults entry first.
    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.store.list()
    }

    /// The resolved state of the current entries.
    ///
    /// Cached until the next register, patch or dispose.
    pub fn resolve(&self) -> Arc<ResolvedHead> {
        let generation = self.store.generation();
        if let Some(cached) = self.cache.load().as_deref()
            && cached.generation == generation
        {
            return Arc::clone(&cached.state);
        }

        let snapshot = self.store.snapshot();
        let state = Arc::new(resolve(&snapshot.entries, &self.config.dedupe));
        log!("resolve"; "generation {}", snapshot.generation);
        self.cache.store(Some(Arc::new(CachedHead {
            generation: snapshot.generation,
            state: Arc::clone(&state),
        })));
        state
    }

    /// Render the resolved state to markup fragments.
    pub fn render_to_string(&self) -> HeadHtml {
        render_to_string(&self.resolve(), &self.config.render)
    }

    /// Create a reconciler configured for this head.
    pub fn reconciler<E>(&self) -> DomReconciler<E> {
        DomReconciler::new(&self.config.dom)
    }

    /// Resolve, then apply the result to a live document.
    pub fn apply_to_document<D: Document>(
        &self,
        reconciler: &mut DomReconciler<D::Element>,
        doc: &mut D,
    ) -> Result<ApplyReport, HeadError> {
        let state = self.resolve();
        reconciler.apply(doc, &state)
    }
}
