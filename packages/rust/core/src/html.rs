//! Small HTML helpers: escaping, tag stripping, link policing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Escape text for use in element content or a quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Drop all tags and collapse whitespace.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// First `n` whitespace-separated words of `text`.
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

/// Hard cap at `max` chars, on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn same_link(href: &str, allowed: &str) -> bool {
    href.trim().trim_end_matches('/') == allowed.trim_end_matches('/')
}

fn is_allowed(href: &str, allowed: &[&str]) -> bool {
    allowed.iter().any(|a| same_link(href, a))
}

/// Unwrap every `<a>` whose `href` is not in `allowed`, keeping its text.
///
/// The fragment is parsed the same way [`foreign_links`] parses it, so
/// unclosed or otherwise malformed anchors are caught too. A fragment with
/// no foreign links is returned unchanged.
pub fn strip_foreign_links(html: &str, allowed: &[&str]) -> String {
    if foreign_links(html, allowed).is_empty() {
        return html.to_string();
    }
    let doc = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(doc.root_element(), allowed, &mut out);
    out
}

fn write_children(parent: ElementRef<'_>, allowed: &[&str], out: &mut String) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape(text)),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(el, allowed, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(el: ElementRef<'_>, allowed: &[&str], out: &mut String) {
    let value = el.value();
    let name = value.name();
    if name == "a" && value.attr("href").is_some_and(|href| !is_allowed(href, allowed)) {
        write_children(el, allowed, out);
        return;
    }

    out.push('<');
    out.push_str(name);
    for (attr, val) in value.attrs() {
        out.push_str(&format!(" {attr}=\"{}\"", escape(val)));
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(el, allowed, out);
    out.push_str(&format!("</{name}>"));
}

/// Every `href` target in a fragment, in document order.
pub fn link_targets(html: &str) -> Vec<String> {
    let doc = Html::parse_fragment(html);
    doc.select(&LINK_SEL)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Targets in `html` that are not in `allowed`.
pub fn foreign_links(html: &str, allowed: &[&str]) -> Vec<String> {
    link_targets(html)
        .into_iter()
        .filter(|href| !is_allowed(href, allowed))
        .collect()
}
