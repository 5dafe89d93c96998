//! String rendering of a resolved head.
//!
//! Produces markup fragments for server-side rendering: the head tags, the
//! tags opening and closing `<body>`, and the attribute strings for
//! `<html>` and `<body>`. Output only depends on the resolved state, so the
//! same state always renders byte-identical markup.

use crate::{
    config::RenderConfig,
    log,
    resolve::{AttrBag, ResolvedHead},
    tag::{Attr, AttrValue, InnerContent, Tag, TagKind, TagPosition},
};
use quick_xml::escape::escape;
use regex::Regex;
use std::{borrow::Cow, fmt::Write, sync::LazyLock};

/// Name of the tag-count meta element.
pub const COUNT_TAG_NAME: &str = "head:count";

/// Closing sequences that would end a raw-text element early.
static RE_RAW_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script|style|noscript)").unwrap());

// HTML whitespace spelled out: regex is built without `unicode-perl`, so `\s` is unavailable.
static RE_HTML_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html([ \t\n\r\x0C][^>]*)?>").unwrap());
static RE_BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body([ \t\n\r\x0C][^>]*)?>").unwrap());
static RE_HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head[ \t\n\r\x0C]*>").unwrap());
static RE_BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body[ \t\n\r\x0C]*>").unwrap());

/// Rendered markup fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadHtml {
    /// Everything inside `<head>`, count tag last.
    pub head_tags: String,
    /// Tags right after `<body>`.
    pub body_tags_open: String,
    /// Tags right before `</body>`.
    pub body_tags: String,
    /// Attribute string for `<html>`, without a leading space.
    pub html_attrs: String,
    /// Attribute string for `<body>`, without a leading space.
    pub body_attrs: String,
}

impl HeadHtml {
    /// Splice the fragments into a full HTML document.
    ///
    /// Attributes go into the opening `<html>` and `<body>` tags, head tags
    /// before `</head>`, body tags after `<body>` and before `</body>`.
    /// Missing anchors are skipped.
    pub fn inject_into(&self, document: &str) -> String {
        let mut out = String::with_capacity(
            document.len() + self.head_tags.len() + self.body_tags_open.len() + self.body_tags.len(),
        );
        // Splice points as (offset, text) in document order
        let mut splices: Vec<(usize, Cow<'_, str>)> = Vec::with_capacity(5);

        if !self.html_attrs.is_empty()
            && let Some(m) = RE_HTML_OPEN.find(document)
        {
            splices.push((m.end() - 1, Cow::Owned(format!(" {}", self.html_attrs))));
        }
        if let Some(m) = RE_HEAD_CLOSE.find(document) {
            splices.push((m.start(), Cow::Borrowed(&self.head_tags)));
        }
        if let Some(m) = RE_BODY_OPEN.find(document) {
            if !self.body_attrs.is_empty() {
                splices.push((m.end() - 1, Cow::Owned(format!(" {}", self.body_attrs))));
            }
            splices.push((m.end(), Cow::Borrowed(&self.body_tags_open)));
        }
        if let Some(m) = RE_BODY_CLOSE.find(document) {
            splices.push((m.start(), Cow::Borrowed(&self.body_tags)));
        }
        splices.sort_by_key(|(offset, _)| *offset);

        let mut cursor = 0;
        for (offset, text) in splices {
            out.push_str(&document[cursor..offset]);
            out.push_str(&text);
            cursor = offset;
        }
        out.push_str(&document[cursor..]);
        out
    }
}

/// Render a resolved head to markup fragments.
pub fn render_to_string(head: &ResolvedHead, config: &RenderConfig) -> HeadHtml {
    let mut html = HeadHtml::default();
    let mut count = 0usize;

    for tag in &head.tags {
        let target = match tag.position {
            TagPosition::HeadPrepend | TagPosition::Head | TagPosition::HeadAppend => {
                if tag.kind != TagKind::Title {
                    count += 1;
                }
                &mut html.head_tags
            }
            TagPosition::BodyOpen => &mut html.body_tags_open,
            TagPosition::BodyClose => &mut html.body_tags,
        };
        write_tag(target, tag);
    }

    if config.count_tag && count > 0 {
        write!(
            html.head_tags,
            r#"<meta name="{COUNT_TAG_NAME}" content="{count}">"#
        )
        .ok();
    }

    html.html_attrs = render_attr_bag(&head.html_attrs);
    html.body_attrs = render_attr_bag(&head.body_attrs);

    log!("render"; "{} tags, {} counted", head.tags.len(), count);
    html
}

/// Write one element.
fn write_tag(out: &mut String, tag: &Tag) {
    let name = tag.kind.as_str();
    out.push('<');
    out.push_str(name);
    for attr in &tag.props {
        out.push(' ');
        write_attr(out, attr);
    }
    out.push('>');

    if tag.kind.is_void() {
        return;
    }
    match &tag.content {
        Some(InnerContent::Text(text)) => out.push_str(&escape(text.as_str())),
        Some(InnerContent::Html(raw)) => out.push_str(&RE_RAW_CLOSE.replace_all(raw, r"<\/$1")),
        None => {}
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// `name="value"`, or a bare `name` for boolean attributes.
fn write_attr(out: &mut String, attr: &Attr) {
    out.push_str(&attr.name);
    if let AttrValue::Str(value) = &attr.value {
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
}

fn render_attr_bag(bag: &AttrBag) -> String {
    let mut out = String::new();
    for attr in bag.iter() {
        if !out.is_empty() {
            out.push(' ');
        }
        write_attr(&mut out, attr);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DedupeConfig;
    use crate::entry::{Entry, EntryId, EntryOptions, HeadInput};
    use crate::resolve::resolve;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn render(values: Vec<Value>) -> HeadHtml {
        render_with(values, &RenderConfig::default())
    }

    fn render_with(values: Vec<Value>, config: &RenderConfig) -> HeadHtml {
        let entries: Vec<_> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                Arc::new(Entry {
                    id: EntryId::new(i as u64 + 1),
                    input: HeadInput::new(value),
                    options: EntryOptions::default(),
                })
            })
            .collect();
        render_to_string(&resolve(&entries, &DedupeConfig::default()), config)
    }

    fn no_count() -> RenderConfig {
        RenderConfig { count_tag: false }
    }

    #[test]
    fn test_dedupe_later_wins() {
        let html = render_with(
            vec![
                json!({ "meta": [{ "name": "x", "content": "1" }] }),
                json!({ "meta": [{ "name": "x", "content": "2" }] }),
            ],
            &no_count(),
        );
        assert_eq!(html.head_tags, r#"<meta name="x" content="2">"#);
    }

    #[test]
    fn test_description_override_with_count() {
        let html = render(vec![
            json!({ "meta": [{ "name": "description", "content": "desc" }] }),
            json!({ "meta": [{ "name": "description", "content": "desc 2" }] }),
        ]);
        assert_eq!(
            html.head_tags,
            r#"<meta name="description" content="desc 2"><meta name="head:count" content="1">"#
        );
    }

    #[test]
    fn test_link_order_and_count() {
        let html = render(vec![json!({ "link": [
            { "rel": "icon", "href": "/favicon.ico" },
            { "rel": "canonical", "href": "https://mydomain.me" },
        ] })]);
        assert_eq!(
            html.head_tags,
            r#"<link rel="icon" href="/favicon.ico"><link rel="canonical" href="https://mydomain.me"><meta name="head:count" content="2">"#
        );
    }

    #[test]
    fn test_title_is_not_counted() {
        let html = render(vec![json!({
            "title": "test",
            "titleTemplate": "%s | template",
            "meta": [{ "name": "description", "content": "d" }],
        })]);
        assert_eq!(
            html.head_tags,
            r#"<title>test | template</title><meta name="description" content="d"><meta name="head:count" content="1">"#
        );

        let html = render(vec![json!({ "title": "only" })]);
        assert_eq!(html.head_tags, "<title>only</title>");
    }

    #[test]
    fn test_escaping() {
        let html = render_with(
            vec![json!({
                "title": "Tom & \"Jerry\" <3",
                "meta": [{ "name": "description", "content": "a \"quoted\" <b>" }],
            })],
            &no_count(),
        );
        assert_eq!(
            html.head_tags,
            "<title>Tom &amp; &quot;Jerry&quot; &lt;3</title>\
             <meta name=\"description\" content=\"a &quot;quoted&quot; &lt;b&gt;\">"
        );
    }

    #[test]
    fn test_raw_content_cannot_close_element() {
        let html = render_with(
            vec![json!({ "script": [{ "children": "var s = '</script><script>alert(1)';" }] })],
            &no_count(),
        );
        assert_eq!(
            html.head_tags,
            r"<script>var s = '<\/script><script>alert(1)';</script>"
        );
    }

    #[test]
    fn test_boolean_attributes_and_positions() {
        let html = render_with(
            vec![json!({
                "script": [
                    { "src": "/a.js", "async": true, "defer": false },
                    { "src": "/open.js", "tagPosition": "bodyOpen" },
                    { "children": "console.log('hello')", "tagPosition": "bodyClose" },
                ],
                "noscript": [{ "children": "<img src=\"/pixel.gif\">", "tagPosition": "bodyOpen" }],
            })],
            &no_count(),
        );
        assert_eq!(html.head_tags, r#"<script src="/a.js" async></script>"#);
        assert_eq!(
            html.body_tags_open,
            r#"<script src="/open.js"></script><noscript><img src="/pixel.gif"></noscript>"#
        );
        assert_eq!(html.body_tags, "<script>console.log('hello')</script>");
    }

    #[test]
    fn test_attribute_strings() {
        let html = render(vec![
            json!({ "htmlAttrs": { "lang": "en", "dir": "ltr" }, "bodyAttrs": { "class": "dark" } }),
            json!({ "htmlAttrs": { "lang": "de" }, "bodyAttrs": { "class": ["test"], "data-ready": true } }),
        ]);
        assert_eq!(html.html_attrs, r#"lang="de" dir="ltr""#);
        assert_eq!(html.body_attrs, r#"class="dark test" data-ready"#);
        assert_eq!(html.head_tags, "");
    }

    #[test]
    fn test_inject_into_document() {
        let html = HeadHtml {
            head_tags: "<title>t</title>".into(),
            body_tags_open: "<noscript>x</noscript>".into(),
            body_tags: "<script src=\"/a.js\"></script>".into(),
            html_attrs: "lang=\"en\"".into(),
            body_attrs: "class=\"dark\"".into(),
        };
        let document = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body id=\"app\"><main></main></body></html>";
        assert_eq!(
            html.inject_into(document),
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>t</title></head>\
             <body id=\"app\" class=\"dark\"><noscript>x</noscript><main></main>\
             <script src=\"/a.js\"></script></body></html>"
        );
    }

    #[test]
    fn test_inject_into_skips_missing_anchors() {
        let html = HeadHtml {
            head_tags: "<title>t</title>".into(),
            ..Default::default()
        };
        assert_eq!(html.inject_into("<p>fragment</p>"), "<p>fragment</p>");
        assert_eq!(
            html.inject_into("<header></header><head></head>"),
            "<header></header><head><title>t</title></head>"
        );
    }

    #[test]
    fn test_inject_into_tolerates_case_and_whitespace() {
        let html = HeadHtml {
            head_tags: "<title>t</title>".into(),
            body_tags: "<script></script>".into(),
            html_attrs: "lang=\"en\"".into(),
            ..Default::default()
        };
        let document = "<HTML\n  data-x=\"1\"><HEAD></HEAD\t><Body></BODY >";
        assert_eq!(
            html.inject_into(document),
            "<HTML\n  data-x=\"1\" lang=\"en\"><HEAD><title>t</title></HEAD\t><Body><script></script></BODY >"
        );
    }

    #[test]
    fn test_anchor_patterns_compile() {
        for re in [&RE_HTML_OPEN, &RE_BODY_OPEN, &RE_HEAD_CLOSE, &RE_BODY_CLOSE, &RE_RAW_CLOSE] {
            assert!(!re.is_match(""));
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let values = || {
            vec![
                json!({ "title": "a", "meta": [{ "charset": "utf-8" }, { "name": "x", "content": "1" }] }),
                json!({ "link": [{ "rel": "icon", "href": "/i" }], "htmlAttrs": { "lang": "en" } }),
            ]
        };
        assert_eq!(render(values()), render(values()));
    }
}
