//! Per-type markup.
//!
//! Each function builds the element-specific part of a node: tag, type
//! attributes and leaf content. Shared attributes, inline styles and the
//! children of layout types are added by the composition pass.

use serde_json::Value;
use site_core::{RenderKind, Resolved};

use crate::node::{RenderElement, RenderNode};
use crate::sanitize::sanitize_html;
use crate::RenderMode;

/// Hint shown inside empty containers in the editor.
pub const DROP_HINT: &str = "Drop elements here";

/// Build the markup for a resolved element.
#[must_use]
pub fn markup(resolved: &Resolved, mode: RenderMode) -> RenderElement {
    match resolved.kind {
        RenderKind::Section => RenderElement::new("section"),
        RenderKind::Container | RenderKind::Row | RenderKind::Column | RenderKind::Grid => {
            RenderElement::new("div")
        }
        RenderKind::Tooltip => tooltip(resolved),
        RenderKind::Heading => heading(resolved),
        RenderKind::Text => RenderElement::new("div").with_child(RenderNode::raw(sanitize_html(
            resolved.str_prop("content").unwrap_or_default(),
        ))),
        RenderKind::Button => button(resolved),
        RenderKind::Image => image(resolved, mode),
        RenderKind::Gallery => gallery(resolved),
        RenderKind::Divider => RenderElement::new("hr"),
        RenderKind::Icon => icon(resolved),
        RenderKind::Map => map(resolved, mode),
        RenderKind::Timeline => timeline(resolved),
        RenderKind::Spacer => RenderElement::new("div").with_attr("aria-hidden", "true"),
    }
}

/// Node rendered in place of an empty container's children.
#[must_use]
pub fn placeholder(mode: RenderMode, hint: &str) -> RenderElement {
    let node = RenderElement::new("div")
        .with_attr("class", "site-placeholder")
        .with_attr("data-placeholder", "true");
    match mode {
        RenderMode::Editor => node.with_child(RenderNode::text(hint)),
        RenderMode::Published => node,
    }
}

/// CSS class suffix for a rendering contract.
#[must_use]
pub const fn kind_class(kind: RenderKind) -> &'static str {
    match kind {
        RenderKind::Section => "site-section",
        RenderKind::Container => "site-container",
        RenderKind::Row => "site-row",
        RenderKind::Column => "site-column",
        RenderKind::Grid => "site-grid",
        RenderKind::Tooltip => "site-tooltip",
        RenderKind::Heading => "site-heading",
        RenderKind::Text => "site-text",
        RenderKind::Button => "site-button",
        RenderKind::Image => "site-image",
        RenderKind::Gallery => "site-gallery",
        RenderKind::Divider => "site-divider",
        RenderKind::Icon => "site-icon",
        RenderKind::Map => "site-map",
        RenderKind::Timeline => "site-timeline",
        RenderKind::Spacer => "site-spacer",
    }
}

fn tooltip(resolved: &Resolved) -> RenderElement {
    let placement = match resolved.str_prop("placement") {
        Some(p @ ("top" | "bottom" | "left" | "right")) => p,
        _ => "top",
    };
    RenderElement::new("div")
        .with_attr("data-tooltip", resolved.str_prop("text").unwrap_or_default())
        .with_attr("data-placement", placement)
}

fn heading(resolved: &Resolved) -> RenderElement {
    let tag = match resolved.i64_prop("level").unwrap_or(2) {
        i64::MIN..=1 => "h1",
        2 => "h2",
        3 => "h3",
        4 => "h4",
        5 => "h5",
        _ => "h6",
    };
    RenderElement::new(tag).with_child(RenderNode::text(
        resolved.str_prop("text").unwrap_or_default(),
    ))
}

fn button(resolved: &Resolved) -> RenderElement {
    let variant = resolved
        .str_prop("variant")
        .map_or_else(|| "primary".to_string(), class_token);
    let mut node = RenderElement::new("a")
        .with_attr("href", safe_url(resolved.str_prop("href").unwrap_or("#")))
        .with_attr("class", format!("site-button--{variant}"));
    if resolved.bool_prop("openInNewTab") == Some(true) {
        node.set_attr("target", "_blank");
        node.set_attr("rel", "noopener noreferrer");
    }
    node.with_child(RenderNode::text(resolved.str_prop("label").unwrap_or_default()))
}

fn image(resolved: &Resolved, mode: RenderMode) -> RenderElement {
    match resolved.str_prop("src").filter(|s| !s.trim().is_empty()) {
        Some(src) => RenderElement::new("img")
            .with_attr("src", safe_url(src))
            .with_attr("alt", resolved.str_prop("alt").unwrap_or_default())
            .with_attr("loading", "lazy"),
        None => placeholder(mode, "Add an image"),
    }
}

fn gallery(resolved: &Resolved) -> RenderElement {
    let mut node = RenderElement::new("div");
    for entry in resolved.list_prop("images") {
        let (src, alt, caption) = match entry {
            Value::String(src) => (src.as_str(), "", None),
            Value::Object(map) => (
                map.get("src").and_then(Value::as_str).unwrap_or_default(),
                map.get("alt").and_then(Value::as_str).unwrap_or_default(),
                map.get("caption").and_then(Value::as_str),
            ),
            _ => continue,
        };
        if src.trim().is_empty() {
            continue;
        }
        let mut figure = RenderElement::new("figure").with_child(
            RenderElement::new("img")
                .with_attr("src", safe_url(src))
                .with_attr("alt", alt)
                .with_attr("loading", "lazy"),
        );
        if let Some(caption) = caption.filter(|c| !c.is_empty()) {
            figure = figure.with_child(
                RenderElement::new("figcaption").with_child(RenderNode::text(caption)),
            );
        }
        node = node.with_child(figure);
    }
    node
}

fn icon(resolved: &Resolved) -> RenderElement {
    let name = class_token(resolved.str_prop("name").unwrap_or("star"));
    RenderElement::new("i")
        .with_attr("class", format!("icon icon-{name}"))
        .with_attr("aria-hidden", "true")
}

fn map(resolved: &Resolved, mode: RenderMode) -> RenderElement {
    let Some(address) = resolved
        .str_prop("address")
        .map(str::trim)
        .filter(|a| !a.is_empty())
    else {
        return placeholder(mode, "Add an address");
    };
    let zoom = resolved.i64_prop("zoom").unwrap_or(14).clamp(1, 21);
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("q", address)
        .append_pair("z", &zoom.to_string())
        .append_pair("output", "embed")
        .finish();
    RenderElement::new("iframe")
        .with_attr("src", format!("https://maps.google.com/maps?{query}"))
        .with_attr("title", format!("Map of {address}"))
        .with_attr("loading", "lazy")
}

fn timeline(resolved: &Resolved) -> RenderElement {
    let mut list = RenderElement::new("ol");
    for event in resolved.list_prop("events") {
        let Value::Object(event) = event else {
            continue;
        };
        let field = |name: &str| {
            event
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };
        let mut item = RenderElement::new("li");
        if let Some(date) = field("date") {
            item = item.with_child(
                RenderElement::new("time")
                    .with_attr("datetime", date)
                    .with_child(RenderNode::text(date)),
            );
        }
        if let Some(title) = field("title") {
            item = item.with_child(RenderElement::new("h4").with_child(RenderNode::text(title)));
        }
        if let Some(description) = field("description") {
            item = item
                .with_child(RenderElement::new("p").with_child(RenderNode::text(description)));
        }
        list = list.with_child(item);
    }
    list
}

/// Neutralize script URLs.
fn safe_url(url: &str) -> String {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("vbscript:") {
        "#".to_string()
    } else {
        url.trim().to_string()
    }
}

/// Restrict a value to characters valid in a class name.
fn class_token(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::to_html;
    use serde_json::json;
    use site_core::resolve::resolve;
    use site_core::{ComponentRegistry, Element, Viewport};

    fn render(element: &Element, mode: RenderMode) -> String {
        let descriptor = ComponentRegistry::builtin()
            .resolve(&element.kind)
            .expect("registered");
        to_html(&markup(&resolve(element, descriptor, Viewport::Desktop), mode).into())
    }

    #[test]
    fn test_heading_level() {
        let h = Element::with_id("h", "heading").with_prop("text", "Title").with_prop("level", 1);
        assert_eq!(render(&h, RenderMode::Published), "<h1>Title</h1>");
        let clamped = Element::with_id("h", "heading").with_prop("level", 9);
        assert!(render(&clamped, RenderMode::Published).starts_with("<h6>"));
    }

    #[test]
    fn test_text_removes_scripts_but_keeps_markup() {
        let t = Element::with_id("t", "text")
            .with_prop("content", "<p><strong>Hi</strong></p><script>steal()</script>");
        assert_eq!(
            render(&t, RenderMode::Published),
            "<div><p><strong>Hi</strong></p></div>"
        );
    }

    #[test]
    fn test_text_drops_handlers_and_script_links() {
        let t = Element::with_id("t", "text").with_prop(
            "content",
            "<p onclick=\"steal()\"><a href=\"javascript:steal()\">x</a><img src=x onerror=steal()></p>",
        );
        let html = render(&t, RenderMode::Published);
        assert_eq!(html, "<div><p><a>x</a></p></div>");
        assert!(!html.contains("steal"));
    }

    #[test]
    fn test_button_new_tab_and_unsafe_href() {
        let b = Element::with_id("b", "button")
            .with_prop("href", "javascript:alert(1)")
            .with_prop("openInNewTab", true)
            .with_prop("label", "Go");
        let html = render(&b, RenderMode::Published);
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("class=\"site-button--primary\""));
        assert!(html.ends_with(">Go</a>"));
    }

    #[test]
    fn test_gallery_figures() {
        let g = Element::with_id("g", "gallery").with_prop(
            "images",
            json!([
                {"src": "/a.jpg", "alt": "A", "caption": "First"},
                "/b.jpg",
                {"src": ""},
                42
            ]),
        );
        let html = render(&g, RenderMode::Published);
        assert_eq!(html.matches("<figure>").count(), 2);
        assert!(html.contains("<figcaption>First</figcaption>"));
        assert!(html.contains("src=\"/b.jpg\""));
    }

    #[test]
    fn test_timeline_events() {
        let t = Element::with_id("t", "timeline").with_prop(
            "events",
            json!([{"date": "2024", "title": "Founded", "description": "Day one"}]),
        );
        assert_eq!(
            render(&t, RenderMode::Published),
            "<ol><li><time datetime=\"2024\">2024</time><h4>Founded</h4><p>Day one</p></li></ol>"
        );
    }

    #[test]
    fn test_map_encodes_address() {
        let m = Element::with_id("m", "map").with_prop("address", "1 Main St & Co");
        let html = render(&m, RenderMode::Published);
        assert!(html.contains("q=1+Main+St+%26+Co"));
        assert!(html.contains("z=14"));
    }

    #[test]
    fn test_empty_map_and_image_placeholders() {
        let m = Element::with_id("m", "map");
        assert!(render(&m, RenderMode::Editor).contains("Add an address"));
        assert!(!render(&m, RenderMode::Published).contains("Add an address"));
        assert!(render(&Element::with_id("i", "image"), RenderMode::Editor)
            .contains("data-placeholder"));
    }

    #[test]
    fn test_tooltip_and_icon() {
        let t = Element::with_id("t", "tooltip")
            .with_prop("text", "More")
            .with_prop("placement", "sideways");
        assert_eq!(
            render(&t, RenderMode::Published),
            "<div data-tooltip=\"More\" data-placement=\"top\"></div>"
        );
        let i = Element::with_id("i", "icon").with_prop("name", "Arrow Right\"");
        assert!(render(&i, RenderMode::Published).contains("class=\"icon icon-arrowright\""));
    }
}
