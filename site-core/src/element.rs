//! Page elements - the building blocks of a site tree.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::CoreError;

/// Property bag carried by an element (and by each responsive override).
pub type Props = Map<String, Value>;

/// Unique identifier for an element.
///
/// Identifiers are opaque strings; freshly created elements get a UUIDv4.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Rendering target selected by the editor's viewport toggle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    /// Wide screens; the base presentation.
    #[default]
    Desktop,
    /// Medium screens.
    Tablet,
    /// Narrow screens.
    Mobile,
}

impl Viewport {
    /// All viewports, widest first.
    pub const ALL: [Viewport; 3] = [Viewport::Desktop, Viewport::Tablet, Viewport::Mobile];

    /// Reference frame width used for editor previews, in pixels.
    #[must_use]
    pub const fn frame_width(self) -> u32 {
        match self {
            Self::Desktop => 1280,
            Self::Tablet => 768,
            Self::Mobile => 375,
        }
    }

    /// Maximum width matched by this viewport's media query, if any.
    ///
    /// Desktop styles are the unconditional base.
    #[must_use]
    pub const fn max_width(self) -> Option<u32> {
        match self {
            Self::Desktop => None,
            Self::Tablet => Some(1024),
            Self::Mobile => Some(640),
        }
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Tablet => "tablet",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Viewport {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(Self::Desktop),
            "tablet" => Ok(Self::Tablet),
            "mobile" => Ok(Self::Mobile),
            other => Err(CoreError::UnknownViewport(other.to_string())),
        }
    }
}

/// A node in the page tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Unique identifier.
    pub id: ElementId,
    /// Component type discriminator, resolved through the registry.
    #[serde(rename = "type")]
    pub kind: String,
    /// Base properties.
    #[serde(default)]
    pub props: Props,
    /// Partial property maps applied on top of `props` for one viewport.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub responsive_overrides: BTreeMap<Viewport, Props>,
    /// Ordered children (container types only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    /// Create a new element of the given type with a fresh id and no props.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self::with_id(ElementId::new(), kind)
    }

    /// Create an element with an explicit id.
    #[must_use]
    pub fn with_id(id: impl Into<ElementId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: Props::new(),
            responsive_overrides: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Set a base property.
    #[must_use]
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Set a property override for one viewport.
    #[must_use]
    pub fn with_override(
        mut self,
        viewport: Viewport,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.responsive_overrides
            .entry(viewport)
            .or_default()
            .insert(name.into(), value.into());
        self
    }

    /// Append a child.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Element::subtree_len).sum::<usize>()
    }

    /// Visit this subtree in pre-order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Element)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Find a descendant (or `self`) by id.
    #[must_use]
    pub fn find(&self, id: &ElementId) -> Option<&Element> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Find a descendant (or `self`) by id, mutably.
    pub fn find_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}
