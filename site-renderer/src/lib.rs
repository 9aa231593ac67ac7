//! # Saorsa Site Renderer
//!
//! Composition engine turning an element tree into markup and styles.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   resolve    ┌──────────────┐   to_html   ┌──────────┐
//! │ ElementTree  │ ───────────▶ │  RenderNode  │ ──────────▶ │   HTML   │
//! │ + Viewport   │  per element │  (virt. DOM) │             └──────────┘
//! └──────────────┘              └──────────────┘
//!        │                                                  ┌──────────┐
//!        └──────────── stylesheet (desktop + @media) ─────▶ │   CSS    │
//!                                                           └──────────┘
//! ```
//!
//! Rendering never mutates the tree. Elements of unknown type become a
//! visible placeholder plus a [`RenderDiagnostic`]; their siblings render
//! normally.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod components;
pub mod error;
pub mod html;
pub mod node;
pub mod page;
pub mod sanitize;
pub mod style;
pub mod stylesheet;

pub use error::{RenderError, RenderResult};
pub use node::{RenderElement, RenderNode};
pub use page::{export_page, PageOptions, PublishedPage};
pub use stylesheet::{stylesheet, CssRule, Stylesheet};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use site_core::resolve::resolve;
use site_core::{ComponentRegistry, Element, ElementId, ElementTree, Viewport};

/// Where the output is going to be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Interactive canvas: inline styles, edit affordances, drop hints.
    #[default]
    Editor,
    /// Published site: styles come from the stylesheet.
    Published,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Editor => "editor",
            Self::Published => "published",
        })
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "editor" => Ok(Self::Editor),
            "published" | "publish" => Ok(Self::Published),
            other => Err(format!("unknown render mode: {other}")),
        }
    }
}

/// A problem found while rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderDiagnostic {
    /// Element the problem was found on.
    pub element_id: ElementId,
    /// The element's declared type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

/// Result of a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    /// Viewport the tree was resolved for.
    pub viewport: Viewport,
    /// Root of the render tree.
    pub root: RenderNode,
    /// Problems recovered from during the pass.
    pub diagnostics: Vec<RenderDiagnostic>,
}

impl RenderOutput {
    /// Serialize the render tree to HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        html::to_html(&self.root)
    }

    /// Whether any element could not be rendered faithfully.
    #[must_use]
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Treat diagnostics as a hard failure.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownComponents`] if any diagnostics were recorded.
    pub fn into_result(self) -> RenderResult<RenderNode> {
        if self.diagnostics.is_empty() {
            Ok(self.root)
        } else {
            Err(RenderError::UnknownComponents(self.diagnostics))
        }
    }
}

/// The composition engine.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'r> {
    registry: &'r ComponentRegistry,
    mode: RenderMode,
}

impl<'r> Renderer<'r> {
    /// Create an editor-mode renderer over a registry.
    #[must_use]
    pub fn new(registry: &'r ComponentRegistry) -> Self {
        Self {
            registry,
            mode: RenderMode::Editor,
        }
    }

    /// Set the render mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// The active render mode.
    #[must_use]
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render a tree for one viewport.
    ///
    /// In editor mode the page is wrapped in a frame sized to the viewport's
    /// reference width.
    #[must_use]
    pub fn render(&self, tree: &ElementTree, viewport: Viewport) -> RenderOutput {
        let mut pass = Pass {
            renderer: self,
            viewport,
            diagnostics: Vec::new(),
        };
        let page = pass.element(tree.root());

        let root = match self.mode {
            RenderMode::Editor => RenderElement::new("div")
                .with_attr("class", "site-frame")
                .with_attr("data-viewport", viewport.as_str())
                .with_styles([
                    ("width".to_string(), format!("{}px", viewport.frame_width())),
                    ("max-width".to_string(), "100%".to_string()),
                ])
                .with_child(page)
                .into(),
            RenderMode::Published => page,
        };

        tracing::debug!(
            "Rendered {} nodes for {viewport} ({} mode, {} diagnostics)",
            tree.node_count(),
            self.mode,
            pass.diagnostics.len()
        );
        RenderOutput {
            viewport,
            root,
            diagnostics: pass.diagnostics,
        }
    }
}

/// State of one render pass.
struct Pass<'a, 'r> {
    renderer: &'a Renderer<'r>,
    viewport: Viewport,
    diagnostics: Vec<RenderDiagnostic>,
}

impl Pass<'_, '_> {
    fn element(&mut self, element: &Element) -> RenderNode {
        let mode = self.renderer.mode;
        let Ok(descriptor) = self.renderer.registry.resolve(&element.kind) else {
            return self.unknown(element);
        };
        let resolved = resolve(element, descriptor, self.viewport);

        let mut node = components::markup(&resolved, mode);
        let class = match node.attr("class") {
            Some(extra) => format!("{} {extra}", components::kind_class(resolved.kind)),
            None => components::kind_class(resolved.kind).to_string(),
        };
        let mut common = vec![
            ("data-element-id".to_string(), element.id.to_string()),
            ("data-element-type".to_string(), element.kind.clone()),
        ];
        node.attributes.retain(|(name, _)| name != "class");
        common.push(("class".to_string(), class));
        common.append(&mut node.attributes);
        node.attributes = common;

        if mode == RenderMode::Editor {
            node.styles = style::declarations(&resolved);
            if descriptor.supports_inline_edit {
                if let Some(field) = &descriptor.inline_field {
                    node.set_attr("contenteditable", "true");
                    node.set_attr("data-edit-field", field.as_str());
                }
            }
        }

        if descriptor.accepts_children {
            if element.children.is_empty() {
                node.children
                    .push(components::placeholder(mode, components::DROP_HINT).into());
            } else {
                for child in &element.children {
                    let rendered = self.element(child);
                    node.children.push(rendered);
                }
            }
        } else if !element.children.is_empty() {
            tracing::debug!(
                "Ignoring {} children of leaf element {}",
                element.children.len(),
                element.id
            );
        }

        node.into()
    }

    fn unknown(&mut self, element: &Element) -> RenderNode {
        tracing::warn!(
            "Unknown component type '{}' on element {}",
            element.kind,
            element.id
        );
        self.diagnostics.push(RenderDiagnostic {
            element_id: element.id.clone(),
            kind: element.kind.clone(),
            message: format!("Unknown component type: {}", element.kind),
        });

        let mut node = RenderElement::new("div")
            .with_attr("data-element-id", element.id.to_string())
            .with_attr("data-unknown-type", element.kind.clone())
            .with_attr("class", "site-unknown");
        if self.renderer.mode == RenderMode::Editor {
            node.set_attr("role", "alert");
            node = node.with_child(RenderNode::text(format!(
                "Unknown component: {}",
                element.kind
            )));
        }
        // Keep the content of a mistyped container visible.
        for child in &element.children {
            let rendered = self.element(child);
            node.children.push(rendered);
        }
        node.into()
    }
}
