//! Live document reconciliation.
//!
//! [`DomReconciler`] drives any [`Document`] implementation from one
//! resolved head to the next with the smallest set of mutations it can
//! find. [`MemoryDocument`] is an in-memory document for headless use.
//!
//! # Ownership
//!
//! Every element the reconciler creates carries a marker attribute
//! `<prefix><signature>` (default `data-h-1a2b3c`). Elements without a
//! current marker are never removed or patched.

mod memory;
mod reconcile;

pub use memory::{MemoryDocument, NodeId};
pub use reconcile::{ApplyReport, DomReconciler};

use std::fmt::Debug;

/// Where [`Document::insert`] places a node within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt<'a, E> {
    /// First child.
    Prepend,
    /// Last child.
    Append,
    /// Directly before a child of the parent.
    Before(&'a E),
    /// Directly after a child of the parent.
    After(&'a E),
}

/// Minimal mutable document interface the reconciler works against.
///
/// Inserting a node that is already attached moves it.
pub trait Document {
    /// Handle to an element node. Cheap to clone.
    type Element: Clone + PartialEq + Debug;

    fn html(&self) -> Option<Self::Element>;
    fn head(&self) -> Option<Self::Element>;
    fn body(&self) -> Option<Self::Element>;

    /// Create a detached element.
    fn create_element(&mut self, name: &str) -> Self::Element;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    fn has_attribute(&self, element: &Self::Element, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str);
    fn remove_attribute(&mut self, element: &Self::Element, name: &str);

    /// Replace all children with one text node.
    fn set_text_content(&mut self, element: &Self::Element, text: &str);
    /// Replace all children with raw markup.
    fn set_inner_html(&mut self, element: &Self::Element, html: &str);

    fn insert(&mut self, parent: &Self::Element, node: &Self::Element, at: InsertAt<'_, Self::Element>);

    /// Detach an element from its parent.
    fn remove(&mut self, element: &Self::Element);

    /// Whether the element is attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;
}
