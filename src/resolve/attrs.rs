//! Merged `<html>` / `<body>` attribute bags.

use crate::tag::{Attr, AttrValue};

/// Attributes in first-declaration order. Later merges override values in
/// place; `class` merges as a set union.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrBag {
    attrs: Vec<Attr>,
}

impl AttrBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `attrs` on top of the bag.
    pub fn merge(&mut self, attrs: &[Attr]) {
        for attr in attrs {
            match self.attrs.iter_mut().find(|existing| existing.name == attr.name) {
                Some(existing) if attr.name == "class" => {
                    let mut classes: Vec<&str> = existing.value.as_str().split_whitespace().collect();
                    for class in attr.value.as_str().split_whitespace() {
                        if !classes.contains(&class) {
                            classes.push(class);
                        }
                    }
                    existing.value = AttrValue::Str(classes.join(" "));
                }
                Some(existing) => existing.value = attr.value.clone(),
                None => self.attrs.push(attr.clone()),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attrs.iter()
    }

    /// Class names in merge order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get("class")
            .map(AttrValue::as_str)
            .unwrap_or_default()
            .split_whitespace()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}
