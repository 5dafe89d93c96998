//! In-memory document.
//!
//! A small arena-backed element tree implementing [`Document`], for
//! headless reconciliation and tests. Inner HTML is stored verbatim and
//! never parsed.
//!
//! Text and raw-markup nodes dropped by `set_text_content` or
//! `set_inner_html` go back to a free list and their slots are reused.
//! Detached elements keep their slot: their [`NodeId`] stays valid and they
//! can be inserted again.

use super::{Document, InsertAt};
use quick_xml::escape::escape;

/// Index of a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    /// The document node itself.
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    /// Markup set through `set_inner_html`.
    Raw(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of nodes rooted at a document node.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    /// Reusable slots of dropped content nodes
    free: Vec<NodeId>,
    mutations: usize,
}

const ROOT: NodeId = NodeId(0);

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["base", "br", "hr", "img", "input", "link", "meta"];

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// `<html><head></head><body></body></html>`
    pub fn new() -> Self {
        let mut doc = Self::empty();
        let html = doc.append_element(&ROOT, "html", &[]);
        doc.append_element(&html, "head", &[]);
        doc.append_element(&html, "body", &[]);
        doc.mutations = 0;
        doc
    }

    /// `<html><body></body></html>`, a document the reconciler rejects.
    pub fn without_head() -> Self {
        let mut doc = Self::empty();
        let html = doc.append_element(&ROOT, "html", &[]);
        doc.append_element(&html, "body", &[]);
        doc.mutations = 0;
        doc
    }

    fn empty() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Root,
                parent: None,
                children: Vec::new(),
            }],
            free: Vec::new(),
            mutations: 0,
        }
    }

    /// Number of mutating calls made so far.
    pub fn mutations(&self) -> usize {
        self.mutations
    }

    /// Create an element and append it to `parent`.
    pub fn append_element(&mut self, parent: &NodeId, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.push(NodeData::Element {
            name: name.to_owned(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        });
        self.attach(*parent, id, InsertAt::Append);
        self.mutations += 1;
        id
    }

    /// Element name, `None` for non-element nodes.
    pub fn name(&self, node: &NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Child ids. Ids of content nodes are recycled once that content is
    /// replaced.
    pub fn children(&self, node: &NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// All attached elements named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(ROOT, &mut |id| {
            if self.name(&id) == Some(name) {
                found.push(id);
            }
        });
        found
    }

    /// Markup of the children of `node`.
    pub fn inner_html(&self, node: &NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[node.0].children {
            self.write_node(&mut out, *child);
        }
        out
    }

    /// Markup of `node` itself.
    pub fn outer_html(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, *node);
        out
    }

    /// Markup of the whole document.
    pub fn serialize(&self) -> String {
        self.inner_html(&ROOT)
    }

    /// Slots in use, attached or not.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = node;
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.name(child) == Some(name))
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId, at: InsertAt<'_, NodeId>) {
        self.detach(node);
        let children = &self.nodes[parent.0].children;
        let index = match at {
            InsertAt::Prepend => 0,
            InsertAt::Append => children.len(),
            InsertAt::Before(anchor) => children
                .iter()
                .position(|child| child == anchor)
                .unwrap_or(children.len()),
            InsertAt::After(anchor) => children
                .iter()
                .position(|child| child == anchor)
                .map_or(children.len(), |i| i + 1),
        };
        self.nodes[parent.0].children.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
    }

    fn replace_children(&mut self, node: NodeId, data: NodeData) {
        for child in std::mem::take(&mut self.nodes[node.0].children) {
            self.nodes[child.0].parent = None;
            // Callers hold element ids only, content ids are fair to recycle
            if matches!(self.nodes[child.0].data, NodeData::Text(_) | NodeData::Raw(_)) {
                self.nodes[child.0].data = NodeData::Text(String::new());
                self.free.push(child);
            }
        }
        let child = self.push(data);
        self.attach(node, child, InsertAt::Append);
    }

    fn attrs_mut(&mut self, node: &NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    fn walk(&self, node: NodeId, visit: &mut impl FnMut(NodeId)) {
        visit(node);
        for child in &self.nodes[node.0].children {
            self.walk(*child, visit);
        }
    }

    fn write_node(&self, out: &mut String, node: NodeId) {
        match &self.nodes[node.0].data {
            NodeData::Root => out.push_str(&self.inner_html(&node)),
            NodeData::Text(text) => out.push_str(&escape(text.as_str())),
            NodeData::Raw(html) => out.push_str(html),
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value.as_str()));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                for child in &self.nodes[node.0].children {
                    self.write_node(out, *child);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

impl Document for MemoryDocument {
    type Element = NodeId;

    fn html(&self) -> Option<NodeId> {
        self.child(ROOT, "html")
    }

    fn head(&self) -> Option<NodeId> {
        self.child(self.html()?, "head")
    }

    fn body(&self) -> Option<NodeId> {
        self.child(self.html()?, "body")
    }

    fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element {
            name: name.to_owned(),
            attrs: Vec::new(),
        })
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        match &self.nodes[element.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            _ => None,
        }
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) {
        let Some(attrs) = self.attrs_mut(element) else {
            return;
        };
        match attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => attrs.push((name.to_owned(), value.to_owned())),
        }
        self.mutations += 1;
    }

    fn remove_attribute(&mut self, element: &NodeId, name: &str) {
        let Some(attrs) = self.attrs_mut(element) else {
            return;
        };
        let before = attrs.len();
        attrs.retain(|(key, _)| key != name);
        if attrs.len() != before {
            self.mutations += 1;
        }
    }

    fn set_text_content(&mut self, element: &NodeId, text: &str) {
        self.replace_children(*element, NodeData::Text(text.to_owned()));
        self.mutations += 1;
    }

    fn set_inner_html(&mut self, element: &NodeId, html: &str) {
        self.replace_children(*element, NodeData::Raw(html.to_owned()));
        self.mutations += 1;
    }

    fn insert(&mut self, parent: &NodeId, node: &NodeId, at: InsertAt<'_, NodeId>) {
        self.attach(*parent, *node, at);
        self.mutations += 1;
    }

    fn remove(&mut self, element: &NodeId) {
        self.detach(*element);
        self.mutations += 1;
    }

    fn is_connected(&self, element: &NodeId) -> bool {
        let mut current = *element;
        while let Some(parent) = self.nodes[current.0].parent {
            current = parent;
        }
        current == ROOT
    }
}
