//! CSS declarations derived from resolved element properties.
//!
//! The same declarations feed inline styles in the editor and the
//! per-element rules of the published stylesheet, so both presentations
//! agree for every viewport.

use serde_json::Value;
use site_core::resolve::{spacing_px, Direction, Spacing};
use site_core::{RenderKind, Resolved};

/// A single `property: value` pair.
pub type Declaration = (String, String);

/// CSS declarations for an element resolved at one viewport.
#[must_use]
pub fn declarations(resolved: &Resolved) -> Vec<Declaration> {
    let mut out = Decls::default();

    if let Some(layout) = resolved.layout {
        match layout.direction {
            Direction::Horizontal => {
                out.push("display", "flex");
                let flow = if layout.columns == 1 { "column" } else { "row" };
                out.push("flex-direction", flow);
                out.push("flex-wrap", "wrap");
            }
            Direction::Vertical => {
                out.push("display", "flex");
                out.push("flex-direction", "column");
            }
            Direction::Grid => {
                out.push("display", "grid");
                out.push(
                    "grid-template-columns",
                    format!("repeat({}, minmax(0, 1fr))", layout.columns),
                );
            }
        }
        out.push("gap", format!("{}px", layout.gap_px));
        out.push("justify-content", layout.justify.css());
        out.push("align-items", layout.align.css());
        if resolved.props.contains_key("padding") {
            out.push("padding", format!("{}px", layout.padding_px));
        }
    }

    match resolved.kind {
        RenderKind::Section => {
            out.push("width", "100%");
            if resolved.bool_prop("fullWidth") == Some(false) {
                out.push("max-width", "1200px");
                out.push("margin", "0 auto");
            }
            if let Some(url) = resolved.str_prop("backgroundImage").filter(|s| !s.is_empty()) {
                out.push("background-image", format!("url(\"{}\")", css_string(url)));
                out.push("background-size", "cover");
                out.push("background-position", "center");
            }
        }
        RenderKind::Container => {
            out.push("width", "100%");
            if let Some(max) = length(resolved.props.get("maxWidth")) {
                out.push("max-width", max);
            }
            out.push("margin", "0 auto");
        }
        RenderKind::Column => {
            let span = resolved.i64_prop("span").unwrap_or(1).clamp(1, 12);
            out.push("flex", format!("{span} 1 0"));
            out.push("min-width", "0");
        }
        RenderKind::Tooltip => out.push("position", "relative"),
        RenderKind::Heading | RenderKind::Text => {
            text_styles(resolved, &mut out);
            if let Some(size) = length(resolved.props.get("fontSize")) {
                out.push("font-size", size);
            }
        }
        RenderKind::Button => {
            if let Some(align) = resolved.str_prop("align") {
                out.push("align-self", flex_align(align));
            }
        }
        RenderKind::Image => {
            if let Some(w) = length(resolved.props.get("width")) {
                out.push("width", w);
            }
            if let Some(h) = length(resolved.props.get("height")) {
                out.push("height", h);
            }
            if let Some(fit) = resolved.str_prop("fit") {
                out.push("object-fit", css_ident(fit));
            }
        }
        RenderKind::Gallery => {
            let columns = site_core::resolve::columns(resolved.props.get("columns"));
            out.push("display", "grid");
            out.push("grid-template-columns", format!("repeat({columns}, minmax(0, 1fr))"));
            out.push(
                "gap",
                format!("{}px", spacing_px(resolved.props.get("gap"), Spacing::gap_px)),
            );
        }
        RenderKind::Divider => {
            let thickness = resolved.i64_prop("thickness").unwrap_or(1).max(0);
            let style = resolved.str_prop("style").map_or("solid", css_ident);
            let color = resolved.str_prop("color").map_or("currentColor", css_ident);
            out.push("border", "0");
            out.push("border-top", format!("{thickness}px {style} {color}"));
        }
        RenderKind::Icon => {
            if let Some(size) = length(resolved.props.get("size")) {
                out.push("font-size", size);
            }
        }
        RenderKind::Map => {
            out.push("width", "100%");
            out.push("border", "0");
            if let Some(h) = length(resolved.props.get("height")) {
                out.push("height", h);
            }
        }
        RenderKind::Spacer => {
            let px = match resolved.props.get("height") {
                Some(Value::Number(_)) => length(resolved.props.get("height")),
                other => Some(format!("{}px", spacing_px(other, Spacing::padding_px))),
            };
            if let Some(px) = px {
                out.push("height", px);
            }
        }
        RenderKind::Row | RenderKind::Grid | RenderKind::Timeline => {}
    }

    if let Some(bg) = resolved
        .str_prop("background")
        .filter(|b| !b.is_empty() && *b != "transparent")
    {
        out.push("background", css_ident(bg));
    }
    // Text kinds set color in `text_styles`; dividers fold it into the border.
    if !matches!(
        resolved.kind,
        RenderKind::Heading | RenderKind::Text | RenderKind::Divider
    ) {
        if let Some(color) = resolved.str_prop("color") {
            out.push("color", css_ident(color));
        }
    }

    out.0
}

fn text_styles(resolved: &Resolved, out: &mut Decls) {
    if let Some(align) = resolved.str_prop("align") {
        out.push("text-align", css_ident(align));
    }
    if let Some(color) = resolved.str_prop("color") {
        out.push("color", css_ident(color));
    }
}

fn flex_align(align: &str) -> &'static str {
    match align {
        "center" => "center",
        "right" | "end" => "flex-end",
        "stretch" => "stretch",
        _ => "flex-start",
    }
}

/// A CSS length: numbers are pixels, strings are passed through sanitized.
fn length(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => n.as_f64().map(|px| format!("{px}px")),
        Value::String(s) if !s.trim().is_empty() => Some(css_ident(s.trim()).to_string()),
        _ => None,
    }
}

/// Drop characters that could terminate a declaration or rule.
fn css_ident(value: &str) -> &str {
    match value.find([';', '{', '}', '<', '>', '"', '\\']) {
        Some(end) => &value[..end],
        None => value,
    }
}

fn css_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\n' | '\r' | '<' | '>'))
        .collect()
}

#[derive(Default)]
struct Decls(Vec<Declaration>);

impl Decls {
    /// Add a declaration; a later push of the same property wins.
    fn push(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(p, _)| p == property) {
            Some(slot) => slot.1 = value,
            None => self.0.push((property.to_string(), value)),
        }
    }
}
