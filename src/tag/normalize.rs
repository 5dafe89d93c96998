//! Entry input → tag records.
//!
//! Walks the sections of one entry's input in declaration order and turns
//! them into [`Tag`]s. Anything malformed is dropped at the smallest
//! possible granularity (one attribute, one tag, one section) and reported
//! as a [`Diagnostic`]; the rest of the entry still normalizes.

use super::dedupe::{IdentityHints, dedupe_key};
use super::{
    Attr, AttrValue, ContentHash, InnerContent, Props, Tag, TagKind, TagPosition, TagPriority,
    is_valid_attr_name,
};
use crate::{
    config::DedupeConfig,
    entry::Entry,
    error::{Diagnostic, InputError},
    log,
    resolve::TitleTemplate,
};
use serde_json::{Map, Value};
use std::fmt::Write;

/// Per-tag control fields. They steer normalization and are never rendered.
const RESERVED_FIELDS: [&str; 8] = [
    "key",
    "vmid",
    "hid",
    "tagPriority",
    "tagPosition",
    "children",
    "innerHTML",
    "textContent",
];

/// Everything one entry contributes.
#[derive(Debug, Default)]
pub struct NormalizedEntry {
    /// Tags in declaration order, title included.
    pub tags: Vec<Tag>,
    pub title_template: Option<TitleTemplate>,
    pub html_attrs: Vec<Attr>,
    pub body_attrs: Vec<Attr>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Normalize one entry.
pub fn normalize_entry(entry: &Entry, config: &DedupeConfig) -> NormalizedEntry {
    let mut normalizer = Normalizer {
        entry,
        config,
        out: NormalizedEntry::default(),
        index: 0,
    };
    normalizer.run();
    normalizer.out
}

/// Per-tag overrides of the entry options.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    priority: Option<TagPriority>,
    position: Option<TagPosition>,
}

struct Normalizer<'a> {
    entry: &'a Entry,
    config: &'a DedupeConfig,
    out: NormalizedEntry,
    /// Declaration index of the next tag
    index: u32,
}

impl<'a> Normalizer<'a> {
    fn run(&mut self) {
        let entry = self.entry;
        match entry.input.value() {
            Value::Object(sections) => {
                for (section, value) in sections {
                    self.section(section, value);
                }
            }
            Value::Null => {}
            _ => self.warn(InputError::NotAnObject),
        }

        if let Some(template) = entry.input.title_template() {
            self.out.title_template = Some(TitleTemplate::Func(template.clone()));
        }
    }

    fn section(&mut self, section: &str, value: &Value) {
        match section {
            "title" => self.title(value),
            "titleTemplate" => self.title_template(value),
            "base" => self.single(TagKind::Base, section, value),
            "meta" => self.list(TagKind::Meta, section, value),
            "link" => self.list(TagKind::Link, section, value),
            "style" => self.list(TagKind::Style, section, value),
            "script" => self.list(TagKind::Script, section, value),
            "noscript" => self.list(TagKind::Noscript, section, value),
            "htmlAttrs" => self.out.html_attrs = self.attr_bag(section, value),
            "bodyAttrs" => self.out.body_attrs = self.attr_bag(section, value),
            _ => self.warn(InputError::UnknownSection(section.to_owned())),
        }
    }

    fn title(&mut self, value: &Value) {
        let title = match value {
            Value::Null => return,
            other => match scalar(other) {
                Some(title) => title,
                None => return self.warn(InputError::wrong_type("title", "a string")),
            },
        };
        if title.is_empty() {
            return;
        }
        self.push(
            TagKind::Title,
            Props::new(),
            Some(InnerContent::Text(title)),
            Overrides::default(),
            &IdentityHints::default(),
            None,
        );
    }

    fn title_template(&mut self, value: &Value) {
        self.out.title_template = match value {
            Value::Null => Some(TitleTemplate::Passthrough),
            Value::String(pattern) => Some(TitleTemplate::Pattern(pattern.clone())),
            _ => return self.warn(InputError::wrong_type("titleTemplate", "a string or null")),
        };
    }

    fn single(&mut self, kind: TagKind, section: &str, value: &Value) {
        match value {
            Value::Object(attrs) => self.element(kind, attrs),
            Value::Null => {}
            _ => self.warn(InputError::wrong_type(section, "an object")),
        }
    }

    fn list(&mut self, kind: TagKind, section: &str, value: &Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(attrs) => self.element(kind, attrs),
                        _ => self.warn(InputError::wrong_type(section, "an array of objects")),
                    }
                }
            }
            Value::Null => {}
            _ => self.warn(InputError::wrong_type(section, "an array of objects")),
        }
    }

    fn element(&mut self, kind: TagKind, fields: &Map<String, Value>) {
        let mut props = Props::new();
        let mut content = None;
        let mut hints = IdentityHints::default();
        let mut overrides = Overrides::default();
        // Slot of the `content` placeholder and the values it expands to
        let mut expansion: Option<(usize, Vec<String>)> = None;

        for (name, value) in fields {
            match name.as_str() {
                "key" => match scalar(value) {
                    Some(key) => hints.key = Some(key),
                    None => self.warn(InputError::wrong_type("key", "a string")),
                },
                "vmid" | "hid" => match scalar(value) {
                    Some(id) => {
                        let attr = if name == "vmid" { "vmid" } else { "hid" };
                        hints.legacy_id = Some((attr, id));
                    }
                    None => self.warn(InputError::wrong_type(name.as_str(), "a string")),
                },
                "tagPriority" => match TagPriority::from_value(value) {
                    Some(priority) => overrides.priority = Some(priority),
                    None => self.warn(InputError::UnknownPriority(value.to_string())),
                },
                "tagPosition" => match value.as_str().and_then(TagPosition::from_name) {
                    Some(position) => overrides.position = Some(position),
                    None => self.warn(InputError::UnknownPosition(value.to_string())),
                },
                "children" | "innerHTML" | "textContent" => {
                    if !kind.takes_content() {
                        self.warn(InputError::ContentNotAllowed(kind.as_str()));
                        continue;
                    }
                    match scalar(value) {
                        Some(text) if name == "textContent" => content = Some(InnerContent::Text(text)),
                        Some(html) => content = Some(InnerContent::Html(html)),
                        None => self.warn(InputError::wrong_type(name.as_str(), "a string")),
                    }
                }
                "content" if kind == TagKind::Meta && value.is_array() => {
                    let values = self.content_values(value);
                    expansion = Some((props.len(), values));
                    props.push(Attr::new("content", String::new()));
                }
                _ => {
                    if let Some(attr) = self.attr(name, value) {
                        props.push(attr);
                    }
                }
            }
        }

        let Some((slot, values)) = expansion else {
            return self.push(kind, props, content, overrides, &hints, None);
        };
        for (i, value) in values.into_iter().enumerate() {
            let mut props = props.clone();
            props[slot].value = AttrValue::Str(value);
            // The first sibling keeps the plain key, later ones are suffixed
            let suffix = (i > 0).then_some(i);
            self.push(kind, props, content.clone(), overrides, &hints, suffix);
        }
    }

    fn content_values(&mut self, value: &Value) -> Vec<String> {
        let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
        if items.is_empty() {
            self.warn(InputError::wrong_type("content", "a non-empty array of strings"));
        }
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match scalar(item) {
                Some(value) => values.push(value),
                None => self.warn(InputError::wrong_type("content", "an array of strings")),
            }
        }
        values
    }

    fn attr(&mut self, name: &str, value: &Value) -> Option<Attr> {
        if !is_valid_attr_name(name) {
            self.warn(InputError::InvalidAttributeName(name.to_owned()));
            return None;
        }
        let value = match value {
            Value::String(s) if name == "class" => AttrValue::Str(normalize_class(s.split_whitespace())?),
            Value::String(s) => AttrValue::Str(s.clone()),
            Value::Number(n) => AttrValue::Str(n.to_string()),
            Value::Bool(true) => AttrValue::Present,
            Value::Bool(false) | Value::Null => return None,
            Value::Array(items) if name == "class" => AttrValue::Str(normalize_class(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .flat_map(str::split_whitespace),
            )?),
            Value::Object(flags) if name == "class" => AttrValue::Str(normalize_class(
                flags
                    .iter()
                    .filter(|(_, on)| on.as_bool() == Some(true))
                    .map(|(class, _)| class.as_str()),
            )?),
            _ => {
                self.warn(InputError::wrong_type(name, "a string, number or boolean"));
                return None;
            }
        };
        Some(Attr {
            name: name.into(),
            value,
        })
    }

    fn attr_bag(&mut self, section: &str, value: &Value) -> Vec<Attr> {
        match value {
            Value::Object(fields) => {
                let mut attrs = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    if RESERVED_FIELDS.contains(&name.as_str()) {
                        self.warn(InputError::ReservedField(name.clone()));
                    } else if let Some(attr) = self.attr(name, value) {
                        attrs.push(attr);
                    }
                }
                attrs
            }
            Value::Null => Vec::new(),
            _ => {
                self.warn(InputError::wrong_type(section, "an object"));
                Vec::new()
            }
        }
    }

    fn push(
        &mut self,
        kind: TagKind,
        props: Props,
        content: Option<InnerContent>,
        overrides: Overrides,
        hints: &IdentityHints,
        suffix: Option<usize>,
    ) {
        let mut dedupe_key = dedupe_key(kind, &props, hints, self.config);
        if let (Some(key), Some(suffix)) = (dedupe_key.as_mut(), suffix) {
            write!(key, ":{suffix}").ok();
        }

        let priority = overrides
            .priority
            .or(self.entry.options.priority)
            .unwrap_or_else(|| default_priority(kind, &props));

        let mut position = overrides
            .position
            .or(self.entry.options.position)
            .unwrap_or_default();
        if position.in_body() && !kind.allows_body() {
            log!("entry"; "<{kind}> cannot live in <body>, kept in <head>");
            position = TagPosition::Head;
        }

        let hash = ContentHash::compute(kind, position, &props, content.as_ref());
        self.out.tags.push(Tag {
            kind,
            props,
            content,
            dedupe_key,
            hash,
            priority,
            position,
            owner: self.entry.id,
            index: self.index,
        });
        self.index += 1;
    }

    fn warn(&mut self, error: InputError) {
        log!("warn"; "entry {}: {}", self.entry.id, error);
        self.out.diagnostics.push(Diagnostic::MalformedEntryInput {
            entry: self.entry.id,
            error,
        });
    }
}

/// Priority of a tag when neither the tag nor its entry sets one.
fn default_priority(kind: TagKind, props: &Props) -> TagPriority {
    let has = |name: &str| props.iter().any(|attr| attr.name == name);
    let is = |name: &str, value: &str| {
        props
            .iter()
            .any(|attr| attr.name == name && attr.value == AttrValue::Str(value.into()))
    };
    match kind {
        TagKind::Meta if has("charset") => TagPriority::CRITICAL,
        TagKind::Meta if is("name", "viewport") => TagPriority::HIGH,
        TagKind::Base | TagKind::Title => TagPriority::HIGH,
        _ => TagPriority::NORMAL,
    }
}

/// Strings and numbers are accepted wherever text is expected.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Join class names, dropping duplicates. `None` when nothing is left.
fn normalize_class<'v>(classes: impl Iterator<Item = &'v str>) -> Option<String> {
    let mut seen: Vec<&str> = Vec::new();
    for class in classes {
        if !class.is_empty() && !seen.contains(&class) {
            seen.push(class);
        }
    }
    (!seen.is_empty()).then(|| seen.join(" "))
}
