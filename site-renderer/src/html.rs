//! HTML serialization of render trees.

use std::fmt::Write;

use crate::node::{RenderElement, RenderNode};

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &["img", "hr", "br", "meta", "link", "input"];

/// Serialize a render tree to HTML.
#[must_use]
pub fn to_html(node: &RenderNode) -> String {
    let mut out = String::with_capacity(1024);
    write_node(&mut out, node);
    out
}

fn write_node(out: &mut String, node: &RenderNode) {
    match node {
        RenderNode::Text { text } => out.push_str(&escape_text(text)),
        RenderNode::Raw { html } => out.push_str(html),
        RenderNode::Element(el) => write_element(out, el),
    }
}

fn write_element(out: &mut String, el: &RenderElement) {
    out.push('<');
    out.push_str(el.tag);
    for (name, value) in &el.attributes {
        let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
    }
    if !el.styles.is_empty() {
        let _ = write!(out, " style=\"{}\"", escape_attr(&inline_style(&el.styles)));
    }
    out.push('>');
    if VOID_ELEMENTS.contains(&el.tag) {
        return;
    }
    for child in &el.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", el.tag);
}

/// Join declarations into a `style` attribute value.
#[must_use]
pub fn inline_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(p, v)| format!("{p}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Escape text content.
#[must_use]
pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for a double-quoted attribute.
#[must_use]
pub fn escape_attr(input: &str) -> String {
    escape_text(input)
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
