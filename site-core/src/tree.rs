//! Element tree for a single page.
//!
//! Every mutation is pure: it borrows the current tree and returns a new one,
//! leaving history (undo/redo) and persistence to the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::resolve::merge_props;
use crate::{ComponentRegistry, CoreError, CoreResult, Element, ElementId, Props, Viewport};

/// A page tree with a single root element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementTree {
    root: Element,
}

impl ElementTree {
    /// Wrap a root element.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateId`] if two nodes share an id.
    pub fn new(root: Element) -> CoreResult<Self> {
        let tree = Self { root };
        tree.check_unique_ids()?;
        Ok(tree)
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Consume the tree, returning the root element.
    #[must_use]
    pub fn into_root(self) -> Element {
        self.root
    }

    /// Get an element by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no element has this id.
    pub fn get_node(&self, id: &ElementId) -> CoreResult<&Element> {
        self.root
            .find(id)
            .ok_or_else(|| CoreError::NotFound(id.clone()))
    }

    /// Whether an element with this id exists.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.root.find(id).is_some()
    }

    /// The parent of an element, or `None` for the root and unknown ids.
    #[must_use]
    pub fn parent_of(&self, id: &ElementId) -> Option<&Element> {
        fn search<'a>(node: &'a Element, id: &ElementId) -> Option<&'a Element> {
            if node.children.iter().any(|c| &c.id == id) {
                return Some(node);
            }
            node.children.iter().find_map(|c| search(c, id))
        }
        search(&self.root, id)
    }

    /// Total number of elements.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.subtree_len()
    }

    /// All element ids in pre-order.
    #[must_use]
    pub fn ids(&self) -> Vec<ElementId> {
        let mut ids = Vec::with_capacity(self.node_count());
        self.root.walk(&mut |e| ids.push(e.id.clone()));
        ids
    }

    /// Shallow-merge `partial` into an element's base props.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the element does not exist.
    pub fn update_props(&self, id: &ElementId, partial: &Props) -> CoreResult<Self> {
        self.map_node(id, |element| {
            merge_props(&mut element.props, partial);
            Ok(())
        })
    }

    /// Shallow-merge `partial` into one viewport's override map, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the element does not exist.
    pub fn update_responsive_override(
        &self,
        id: &ElementId,
        viewport: Viewport,
        partial: &Props,
    ) -> CoreResult<Self> {
        self.map_node(id, |element| {
            merge_props(
                element.responsive_overrides.entry(viewport).or_default(),
                partial,
            );
            Ok(())
        })
    }

    /// Drop an element's override map for one viewport.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the element does not exist.
    pub fn clear_responsive_override(&self, id: &ElementId, viewport: Viewport) -> CoreResult<Self> {
        self.map_node(id, |element| {
            element.responsive_overrides.remove(&viewport);
            Ok(())
        })
    }

    /// Insert `element` (with its subtree) as child `index` of `parent_id`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the parent does not exist.
    /// - [`CoreError::UnknownComponentType`] if the parent's type is not registered.
    /// - [`CoreError::NotCapable`] if the parent does not accept children.
    /// - [`CoreError::IndexOutOfRange`] if `index > child_count`.
    /// - [`CoreError::DuplicateId`] if the subtree reuses an id.
    /// - [`CoreError::UnknownComponentType`] if a subtree node has an unregistered type.
    /// - [`CoreError::InvalidTree`] if a leaf in the subtree carries children.
    pub fn insert_child(
        &self,
        registry: &ComponentRegistry,
        parent_id: &ElementId,
        element: Element,
        index: usize,
    ) -> CoreResult<Self> {
        let parent = self.get_node(parent_id)?;
        Self::check_accepts_children(registry, parent)?;
        if index > parent.children.len() {
            return Err(CoreError::IndexOutOfRange {
                index,
                len: parent.children.len(),
            });
        }

        let mut seen: HashSet<ElementId> = self.ids().into_iter().collect();
        let mut duplicate = None;
        element.walk(&mut |e| {
            if duplicate.is_none() && !seen.insert(e.id.clone()) {
                duplicate = Some(e.id.clone());
            }
        });
        if let Some(id) = duplicate {
            return Err(CoreError::DuplicateId(id));
        }
        Self::check_registered(registry, &element)?;

        tracing::debug!(
            "Insert {} '{}' under {} at {}",
            element.kind,
            element.id,
            parent_id,
            index
        );
        self.map_node(parent_id, move |parent| {
            parent.children.insert(index, element);
            Ok(())
        })
    }

    /// Remove an element and its entire subtree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CannotRemoveRoot`] for the root and
    /// [`CoreError::NotFound`] if the element does not exist.
    pub fn remove_node(&self, id: &ElementId) -> CoreResult<Self> {
        let mut next = self.clone();
        let removed = next.detach(id)?;
        tracing::debug!(
            "Removed '{}' ({} nodes)",
            removed.id,
            removed.subtree_len()
        );
        Ok(next)
    }

    /// Move an element (with its subtree) to child `index` of `new_parent`.
    ///
    /// `index` is interpreted against the new parent's children after the
    /// element has been detached from its old position.
    ///
    /// # Errors
    ///
    /// Same as [`Self::insert_child`] and [`Self::remove_node`]; additionally
    /// [`CoreError::InvalidMove`] when `new_parent` lies inside the moved subtree.
    pub fn move_node(
        &self,
        registry: &ComponentRegistry,
        id: &ElementId,
        new_parent: &ElementId,
        index: usize,
    ) -> CoreResult<Self> {
        let moving = self.get_node(id)?;
        if moving.find(new_parent).is_some() {
            return Err(CoreError::InvalidMove(format!(
                "cannot move {id} into its own subtree"
            )));
        }
        let mut detached = self.clone();
        let element = detached.detach(id)?;
        detached.insert_child(registry, new_parent, element, index)
    }

    /// Check every structural invariant against a registry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateId`] for repeated ids,
    /// [`CoreError::UnknownComponentType`] for unregistered types and
    /// [`CoreError::InvalidTree`] for leaves that carry children.
    pub fn validate(&self, registry: &ComponentRegistry) -> CoreResult<()> {
        self.check_unique_ids()?;
        Self::check_registered(registry, &self.root)
    }

    /// Serialize the tree to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Deserialize a tree from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or ids repeat.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let root: Element = serde_json::from_str(json)?;
        Self::new(root)
    }

    fn check_accepts_children(registry: &ComponentRegistry, parent: &Element) -> CoreResult<()> {
        let descriptor = registry.resolve(&parent.kind)?;
        if descriptor.accepts_children {
            Ok(())
        } else {
            Err(CoreError::NotCapable {
                id: parent.id.clone(),
                kind: parent.kind.clone(),
                capability: "children",
            })
        }
    }

    /// Every node of `subtree` has a registered type and leaves stay childless.
    fn check_registered(registry: &ComponentRegistry, subtree: &Element) -> CoreResult<()> {
        let mut result = Ok(());
        subtree.walk(&mut |element| {
            if result.is_err() {
                return;
            }
            result = registry.resolve(&element.kind).and_then(|descriptor| {
                if !descriptor.accepts_children && !element.children.is_empty() {
                    Err(CoreError::InvalidTree(format!(
                        "leaf element {} of type '{}' has {} children",
                        element.id,
                        element.kind,
                        element.children.len()
                    )))
                } else {
                    Ok(())
                }
            });
        });
        result
    }

    fn check_unique_ids(&self) -> CoreResult<()> {
        let mut seen = HashSet::new();
        let mut duplicate = None;
        self.root.walk(&mut |e| {
            if duplicate.is_none() && !seen.insert(&e.id) {
                duplicate = Some(e.id.clone());
            }
        });
        match duplicate {
            Some(id) => Err(CoreError::DuplicateId(id)),
            None => Ok(()),
        }
    }

    /// Clone the tree and apply `f` to one node of the copy.
    fn map_node<F>(&self, id: &ElementId, f: F) -> CoreResult<Self>
    where
        F: FnOnce(&mut Element) -> CoreResult<()>,
    {
        let mut next = self.clone();
        let node = next
            .root
            .find_mut(id)
            .ok_or_else(|| CoreError::NotFound(id.clone()))?;
        f(node)?;
        Ok(next)
    }

    /// Remove a non-root node from this tree in place, returning it.
    fn detach(&mut self, id: &ElementId) -> CoreResult<Element> {
        fn take(node: &mut Element, id: &ElementId) -> Option<Element> {
            if let Some(pos) = node.children.iter().position(|c| &c.id == id) {
                return Some(node.children.remove(pos));
            }
            node.children.iter_mut().find_map(|c| take(c, id))
        }

        if &self.root.id == id {
            return Err(CoreError::CannotRemoveRoot);
        }
        take(&mut self.root, id).ok_or_else(|| CoreError::NotFound(id.clone()))
    }
}

impl TryFrom<Element> for ElementTree {
    type Error = CoreError;

    fn try_from(root: Element) -> CoreResult<Self> {
        Self::new(root)
    }
}
