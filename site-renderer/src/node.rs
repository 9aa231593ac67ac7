//! Render tree - the platform-agnostic output of a composition pass.
//!
//! A [`RenderNode`] tree can be serialized to HTML with [`crate::html`],
//! shipped to an editor front-end as JSON, or inspected in tests.

use serde::Serialize;

/// One node of the render tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "lowercase")]
pub enum RenderNode {
    /// An HTML element.
    Element(RenderElement),
    /// Plain text, escaped on output.
    Text {
        /// The text.
        text: String,
    },
    /// Pre-sanitized markup emitted verbatim.
    Raw {
        /// The markup.
        html: String,
    },
}

impl RenderNode {
    /// A text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// A raw markup node.
    #[must_use]
    pub fn raw(html: impl Into<String>) -> Self {
        Self::Raw { html: html.into() }
    }

    /// The element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&RenderElement> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Depth-first search for the node rendered for a tree element.
    #[must_use]
    pub fn find_by_element_id(&self, id: &str) -> Option<&RenderElement> {
        let el = self.as_element()?;
        if el.attr("data-element-id") == Some(id) {
            return Some(el);
        }
        el.children.iter().find_map(|c| c.find_by_element_id(id))
    }

    /// Concatenated text of this subtree (raw markup included as-is).
    #[must_use]
    pub fn text_content(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Raw { html } => html.clone(),
            Self::Element(el) => el.children.iter().map(Self::text_content).collect(),
        }
    }
}

impl From<RenderElement> for RenderNode {
    fn from(el: RenderElement) -> Self {
        Self::Element(el)
    }
}

/// An HTML element with ordered attributes and inline styles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderElement {
    /// Tag name.
    pub tag: &'static str,
    /// Attributes in output order.
    pub attributes: Vec<(String, String)>,
    /// Inline style declarations in output order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<(String, String)>,
    /// Child nodes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderElement {
    /// Create an empty element.
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            styles: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set an attribute, replacing an existing one of the same name.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set an attribute in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Append inline style declarations.
    #[must_use]
    pub fn with_styles(mut self, declarations: impl IntoIterator<Item = (String, String)>) -> Self {
        self.styles.extend(declarations);
        self
    }

    /// Append a child node.
    #[must_use]
    pub fn with_child(mut self, node: impl Into<RenderNode>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an inline style value.
    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text and raw nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &RenderElement> {
        self.children.iter().filter_map(RenderNode::as_element)
    }
}
