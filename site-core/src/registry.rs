//! Component registry - static metadata for every element type.
//!
//! The registry maps an element's `type` to its [`ComponentDescriptor`]:
//! default properties, initial size, the fields the property panel may edit,
//! capability flags, and the [`RenderKind`] the renderer dispatches on.
//!
//! The built-in table is constructed once on first use and is read-only
//! afterwards. Hosts that need extra types build their own registry with
//! [`ComponentRegistry::with_builtins`] and share it immutably.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;
use serde_json::{json, Value};

use crate::{CoreError, CoreResult, Element, Props};

/// Rendering contract of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    /// Full-width page band.
    Section,
    /// Centered, width-limited wrapper.
    Container,
    /// Horizontal flex layout.
    Row,
    /// Vertical flex layout (usually inside a row).
    Column,
    /// CSS grid layout.
    Grid,
    /// Wrapper that shows a tooltip over its children.
    Tooltip,
    /// `h1`-`h6` heading.
    Heading,
    /// Rich formatted text.
    Text,
    /// Link styled as a button.
    Button,
    /// Single image.
    Image,
    /// Grid of images.
    Gallery,
    /// Horizontal rule.
    Divider,
    /// Named icon glyph.
    Icon,
    /// Embedded map.
    Map,
    /// Ordered list of dated events.
    Timeline,
    /// Vertical whitespace.
    Spacer,
}

impl RenderKind {
    /// Whether this contract lays out children.
    #[must_use]
    pub const fn is_layout(self) -> bool {
        matches!(
            self,
            Self::Section | Self::Container | Self::Row | Self::Column | Self::Grid | Self::Tooltip
        )
    }
}

/// Initial size of a freshly placed element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultSize {
    /// Width (`"100%"`, `"auto"` or pixels).
    pub width: Value,
    /// Height (`"auto"` or pixels).
    pub height: Value,
}

impl DefaultSize {
    fn new(width: impl Into<Value>, height: impl Into<Value>) -> Self {
        Self {
            width: width.into(),
            height: height.into(),
        }
    }
}

/// Registry entry describing one element type.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// The discriminator key.
    #[serde(rename = "type")]
    pub kind: String,
    /// Properties an element starts from before its own props apply.
    pub default_props: Props,
    /// Size used when first placed on the canvas.
    pub default_size: DefaultSize,
    /// Property names the property panel may expose.
    pub editable_fields: Vec<String>,
    /// Whether elements of this type may have children.
    pub accepts_children: bool,
    /// Whether the content can be edited in place on the canvas.
    pub supports_inline_edit: bool,
    /// Prop replaced when an inline edit session commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_field: Option<String>,
    /// Rendering contract.
    pub render: RenderKind,
}

impl ComponentDescriptor {
    /// Create a descriptor with no defaults.
    ///
    /// Capability flags are derived from `render`: layout kinds accept
    /// children, everything else is a leaf.
    #[must_use]
    pub fn new(kind: impl Into<String>, render: RenderKind) -> Self {
        Self {
            kind: kind.into(),
            default_props: Props::new(),
            default_size: DefaultSize::new("auto", "auto"),
            editable_fields: Vec::new(),
            accepts_children: render.is_layout(),
            supports_inline_edit: false,
            inline_field: None,
            render,
        }
    }

    /// Replace the default props with the entries of a JSON object.
    ///
    /// Non-object values are ignored.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(map) = defaults {
            self.default_props = map;
        }
        self
    }

    /// Set the initial size.
    #[must_use]
    pub fn with_size(mut self, width: impl Into<Value>, height: impl Into<Value>) -> Self {
        self.default_size = DefaultSize::new(width, height);
        self
    }

    /// Set the fields exposed to the property panel.
    #[must_use]
    pub fn with_editable(mut self, fields: &[&str]) -> Self {
        self.editable_fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Enable inline editing of `field`.
    #[must_use]
    pub fn with_inline_edit(mut self, field: &str) -> Self {
        self.supports_inline_edit = true;
        self.inline_field = Some(field.to_string());
        self
    }

    /// Create a new element of this type populated with the default props.
    #[must_use]
    pub fn instantiate(&self) -> Element {
        let mut element = Element::new(self.kind.clone());
        element.props = self.default_props.clone();
        element
    }
}

/// Lookup table from element type to descriptor.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: HashMap<String, ComponentDescriptor>,
}

static BUILTIN: LazyLock<ComponentRegistry> = LazyLock::new(ComponentRegistry::with_builtins);

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry of built-in component types.
    #[must_use]
    pub fn builtin() -> &'static ComponentRegistry {
        &BUILTIN
    }

    /// Create a registry pre-populated with the built-in component types.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin_descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Add or replace the entry for `descriptor.kind`.
    ///
    /// Returns the descriptor previously registered under that type, if any.
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Option<ComponentDescriptor> {
        let previous = self.entries.insert(descriptor.kind.clone(), descriptor);
        if let Some(ref prev) = previous {
            tracing::debug!("Replaced component descriptor '{}'", prev.kind);
        }
        previous
    }

    /// Look up the descriptor for a type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownComponentType`] if the type is not registered.
    pub fn resolve(&self, kind: &str) -> CoreResult<&ComponentDescriptor> {
        self.entries
            .get(kind)
            .ok_or_else(|| CoreError::UnknownComponentType(kind.to_string()))
    }

    /// Whether a type is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Create a new element of a registered type with its default props.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownComponentType`] if the type is not registered.
    pub fn instantiate(&self, kind: &str) -> CoreResult<Element> {
        self.resolve(kind).map(ComponentDescriptor::instantiate)
    }

    /// All descriptors, sorted by type.
    #[must_use]
    pub fn descriptors(&self) -> Vec<&ComponentDescriptor> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by(|a, b| a.kind.cmp(&b.kind));
        all
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn builtin_descriptors() -> Vec<ComponentDescriptor> {
    use RenderKind as K;

    vec![
        ComponentDescriptor::new("section", K::Section)
            .with_defaults(json!({"padding": "large", "background": "transparent", "fullWidth": true}))
            .with_size("100%", 400)
            .with_editable(&["padding", "background", "backgroundImage", "fullWidth", "align"]),
        ComponentDescriptor::new("container", K::Container)
            .with_defaults(json!({"padding": "medium", "maxWidth": 1200}))
            .with_size("100%", "auto")
            .with_editable(&["padding", "maxWidth", "background", "gap"]),
        ComponentDescriptor::new("row", K::Row)
            .with_defaults(json!({"columns": 2, "gap": "medium", "justify": "start", "align": "stretch"}))
            .with_size("100%", "auto")
            .with_editable(&["columns", "gap", "justify", "align", "wrap"]),
        ComponentDescriptor::new("column", K::Column)
            .with_defaults(json!({"gap": "small", "align": "stretch", "span": 1}))
            .with_size("auto", "auto")
            .with_editable(&["span", "gap", "align", "padding", "background"]),
        ComponentDescriptor::new("grid", K::Grid)
            .with_defaults(json!({"columns": 3, "gap": "medium"}))
            .with_size("100%", "auto")
            .with_editable(&["columns", "gap", "align"]),
        ComponentDescriptor::new("tooltip", K::Tooltip)
            .with_defaults(json!({"text": "Tooltip", "placement": "top"}))
            .with_editable(&["text", "placement"]),
        ComponentDescriptor::new("heading", K::Heading)
            .with_defaults(json!({"text": "Heading", "level": 2, "align": "left"}))
            .with_size("100%", "auto")
            .with_editable(&["text", "level", "align", "color"])
            .with_inline_edit("text"),
        ComponentDescriptor::new("text", K::Text)
            .with_defaults(json!({"content": "<p>Text</p>", "align": "left"}))
            .with_size("100%", "auto")
            .with_editable(&["content", "align", "color", "fontSize"])
            .with_inline_edit("content"),
        ComponentDescriptor::new("button", K::Button)
            .with_defaults(json!({"label": "Button", "href": "#", "variant": "primary"}))
            .with_size(160, 48)
            .with_editable(&["label", "href", "variant", "openInNewTab", "align"])
            .with_inline_edit("label"),
        ComponentDescriptor::new("image", K::Image)
            .with_defaults(json!({"src": "", "alt": ""}))
            .with_size("100%", 300)
            .with_editable(&["src", "alt", "width", "height", "fit"]),
        ComponentDescriptor::new("gallery", K::Gallery)
            .with_defaults(json!({"images": [], "columns": 3, "gap": "small"}))
            .with_size("100%", 400)
            .with_editable(&["images", "columns", "gap"]),
        ComponentDescriptor::new("divider", K::Divider)
            .with_defaults(json!({"thickness": 1, "color": "#e5e7eb"}))
            .with_size("100%", 1)
            .with_editable(&["thickness", "color", "style"]),
        ComponentDescriptor::new("icon", K::Icon)
            .with_defaults(json!({"name": "star", "size": 24}))
            .with_size(24, 24)
            .with_editable(&["name", "size", "color"]),
        ComponentDescriptor::new("map", K::Map)
            .with_defaults(json!({"address": "", "zoom": 14, "height": 300}))
            .with_size("100%", 300)
            .with_editable(&["address", "zoom", "height"]),
        ComponentDescriptor::new("timeline", K::Timeline)
            .with_defaults(json!({"events": []}))
            .with_size("100%", "auto")
            .with_editable(&["events"]),
        ComponentDescriptor::new("spacer", K::Spacer)
            .with_defaults(json!({"height": "medium"}))
            .with_size("100%", 32)
            .with_editable(&["height"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = ComponentRegistry::builtin();
        assert_eq!(registry.len(), 16);
        for kind in ["section", "row", "column", "grid", "tooltip", "container"] {
            assert!(registry.resolve(kind).expect(kind).accepts_children);
        }
        for kind in ["text", "heading", "divider", "icon"] {
            assert!(!registry.resolve(kind).expect(kind).accepts_children);
        }
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = ComponentRegistry::builtin();
        let err = registry.resolve("not-registered").unwrap_err();
        assert!(matches!(err, CoreError::UnknownComponentType(ref t) if t == "not-registered"));
    }

    #[test]
    fn test_register_replaces_entry() {
        let mut registry = ComponentRegistry::with_builtins();
        let previous = registry.register(
            ComponentDescriptor::new("button", RenderKind::Button)
                .with_defaults(json!({"label": "Buy now"})),
        );
        assert!(previous.is_some());
        let button = registry.resolve("button").expect("button");
        assert_eq!(button.default_props["label"], json!("Buy now"));
        assert!(!button.supports_inline_edit);
        // The shared built-in table is untouched.
        let builtin = ComponentRegistry::builtin().resolve("button").expect("button");
        assert_eq!(builtin.default_props["label"], json!("Button"));
    }

    #[test]
    fn test_custom_type_registration() {
        let mut registry = ComponentRegistry::with_builtins();
        assert!(registry
            .register(ComponentDescriptor::new("hero", RenderKind::Section))
            .is_none());
        assert!(registry.resolve("hero").expect("hero").accepts_children);
    }

    #[test]
    fn test_instantiate_uses_defaults() {
        let element = ComponentRegistry::builtin()
            .instantiate("heading")
            .expect("heading");
        assert_eq!(element.kind, "heading");
        assert_eq!(element.props["level"], json!(2));
        assert!(element.children.is_empty());
    }

    #[test]
    fn test_inline_edit_fields() {
        let registry = ComponentRegistry::builtin();
        let text = registry.resolve("text").expect("text");
        assert!(text.supports_inline_edit);
        assert_eq!(text.inline_field.as_deref(), Some("content"));
        assert!(!registry.resolve("image").expect("image").supports_inline_edit);
    }

    #[test]
    fn test_descriptors_sorted() {
        let kinds: Vec<_> = ComponentRegistry::builtin()
            .descriptors()
            .into_iter()
            .map(|d| d.kind.as_str())
            .collect();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
    }
}
