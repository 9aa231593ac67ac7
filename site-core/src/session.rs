//! Editor session state.
//!
//! An [`EditorSession`] owns what one editor tab works on: the site's tree,
//! the selected viewport and element, the undo/redo history and at most one
//! inline edit. Every successful mutation records exactly one history entry.

use std::sync::Arc;

use crate::resolve::{self, Resolved};
use crate::{
    ComponentRegistry, CoreResult, EditOutcome, Element, ElementId, ElementTree, History,
    InlineEdit, Props, Viewport,
};

/// The editing state of one site.
#[derive(Debug, Clone)]
pub struct EditorSession {
    website_id: String,
    registry: Arc<ComponentRegistry>,
    tree: ElementTree,
    viewport: Viewport,
    selected: Option<ElementId>,
    history: History,
    inline: Option<InlineEdit>,
}

impl EditorSession {
    /// Open a session over an existing tree.
    #[must_use]
    pub fn new(
        website_id: impl Into<String>,
        tree: ElementTree,
        registry: Arc<ComponentRegistry>,
    ) -> Self {
        Self {
            website_id: website_id.into(),
            registry,
            tree,
            viewport: Viewport::default(),
            selected: None,
            history: History::default(),
            inline: None,
        }
    }

    /// Replace the history with one of a different depth.
    #[must_use]
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = History::new(depth);
        self
    }

    /// Site being edited.
    #[must_use]
    pub fn website_id(&self) -> &str {
        &self.website_id
    }

    /// Current tree.
    #[must_use]
    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    /// Registry used for validation and resolution.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Viewport selected in the editor.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Switch the editor's viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport != viewport {
            tracing::debug!("Viewport {} -> {viewport}", self.viewport);
            self.viewport = viewport;
        }
    }

    /// Currently selected element.
    #[must_use]
    pub fn selected(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    /// Select an element, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NotFound`] if the element does not exist.
    pub fn select(&mut self, id: Option<&ElementId>) -> CoreResult<()> {
        if let Some(id) = id {
            self.tree.get_node(id)?;
        }
        self.selected = id.cloned();
        Ok(())
    }

    /// Effective props and layout of an element at the current viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if the element or its type cannot be found.
    pub fn resolve(&self, id: &ElementId) -> CoreResult<Resolved> {
        let element = self.tree.get_node(id)?;
        let descriptor = self.registry.resolve(&element.kind)?;
        Ok(resolve::resolve(element, descriptor, self.viewport))
    }

    /// Shallow-merge `partial` into an element's base props.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::update_props`].
    pub fn update_props(&mut self, id: &ElementId, partial: &Props) -> CoreResult<()> {
        self.apply(|tree, _| tree.update_props(id, partial))
    }

    /// Shallow-merge `partial` into an element's override for `viewport`.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::update_responsive_override`].
    pub fn update_responsive_override(
        &mut self,
        id: &ElementId,
        viewport: Viewport,
        partial: &Props,
    ) -> CoreResult<()> {
        self.apply(|tree, _| tree.update_responsive_override(id, viewport, partial))
    }

    /// Insert a new element under `parent_id`.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::insert_child`].
    pub fn insert_child(
        &mut self,
        parent_id: &ElementId,
        element: Element,
        index: usize,
    ) -> CoreResult<()> {
        self.apply(|tree, registry| tree.insert_child(registry, parent_id, element, index))
    }

    /// Instantiate a registered type with its defaults and insert it.
    ///
    /// Returns the new element's id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnknownComponentType`] for unregistered
    /// types, otherwise see [`ElementTree::insert_child`].
    pub fn add_component(
        &mut self,
        kind: &str,
        parent_id: &ElementId,
        index: usize,
    ) -> CoreResult<ElementId> {
        let element = self.registry.instantiate(kind)?;
        let id = element.id.clone();
        self.insert_child(parent_id, element, index)?;
        Ok(id)
    }

    /// Remove an element and its subtree.
    ///
    /// Clears the selection and any inline edit that lived in the subtree.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::remove_node`].
    pub fn remove_node(&mut self, id: &ElementId) -> CoreResult<()> {
        self.apply(|tree, _| tree.remove_node(id))?;
        if self.selected.as_ref().is_some_and(|s| !self.tree.contains(s)) {
            self.selected = None;
        }
        if self
            .inline
            .as_ref()
            .is_some_and(|edit| !self.tree.contains(edit.element_id()))
        {
            self.inline = None;
        }
        Ok(())
    }

    /// Move an element to a new parent and position.
    ///
    /// # Errors
    ///
    /// See [`ElementTree::move_node`].
    pub fn move_node(
        &mut self,
        id: &ElementId,
        new_parent: &ElementId,
        index: usize,
    ) -> CoreResult<()> {
        self.apply(|tree, registry| tree.move_node(registry, id, new_parent, index))
    }

    /// Replace the whole tree (e.g. after loading a template).
    ///
    /// # Errors
    ///
    /// Returns an error if the tree fails [`ElementTree::validate`].
    pub fn replace_tree(&mut self, tree: ElementTree) -> CoreResult<()> {
        tree.validate(&self.registry)?;
        self.apply(|_, _| Ok(tree))?;
        self.selected = None;
        self.inline = None;
        Ok(())
    }

    /// Start an inline edit, committing any edit already in progress.
    ///
    /// # Errors
    ///
    /// See [`InlineEdit::begin`].
    pub fn begin_inline_edit(&mut self, id: &ElementId) -> CoreResult<()> {
        self.commit_inline_edit()?;
        self.inline = Some(InlineEdit::begin(&self.tree, &self.registry, id)?);
        Ok(())
    }

    /// Feed the latest text into the active inline edit.
    ///
    /// Returns `false` when no edit is active.
    pub fn inline_input(&mut self, text: impl Into<String>) -> bool {
        match self.inline.as_mut() {
            Some(edit) => {
                edit.input(text);
                true
            }
            None => false,
        }
    }

    /// The active inline edit, if any.
    #[must_use]
    pub fn inline_edit(&self) -> Option<&InlineEdit> {
        self.inline.as_ref()
    }

    /// Commit the active inline edit (on blur).
    ///
    /// Returns whether the tree changed. An edit session produces at most one
    /// history entry regardless of how many inputs it received.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NotFound`] if the element vanished.
    pub fn commit_inline_edit(&mut self) -> CoreResult<bool> {
        let Some(edit) = self.inline.take() else {
            return Ok(false);
        };
        match edit.commit(&self.tree)? {
            EditOutcome::Committed(next) => {
                let previous = std::mem::replace(&mut self.tree, next);
                self.history.record(previous);
                Ok(true)
            }
            EditOutcome::Unchanged => Ok(false),
        }
    }

    /// Abandon the active inline edit.
    pub fn cancel_inline_edit(&mut self) {
        if let Some(edit) = self.inline.take() {
            edit.cancel();
        }
    }

    /// Undo the last mutation. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        self.cancel_inline_edit();
        match self.history.undo(&self.tree) {
            Some(previous) => {
                self.tree = previous;
                self.drop_stale_selection();
                true
            }
            None => false,
        }
    }

    /// Redo the last undone mutation. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        self.cancel_inline_edit();
        match self.history.redo(&self.tree) {
            Some(next) => {
                self.tree = next;
                self.drop_stale_selection();
                true
            }
            None => false,
        }
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn apply<F>(&mut self, op: F) -> CoreResult<()>
    where
        F: FnOnce(&ElementTree, &ComponentRegistry) -> CoreResult<ElementTree>,
    {
        let next = op(&self.tree, self.registry.as_ref())?;
        let previous = std::mem::replace(&mut self.tree, next);
        self.history.record(previous);
        Ok(())
    }

    fn drop_stale_selection(&mut self) {
        if self.selected.as_ref().is_some_and(|s| !self.tree.contains(s)) {
            self.selected = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use serde_json::json;

    fn session() -> EditorSession {
        let tree = ElementTree::new(
            Element::with_id("root", "section")
                .with_child(Element::with_id("h", "heading").with_prop("text", "Hi")),
        )
        .expect("tree");
        EditorSession::new("site-1", tree, Arc::new(ComponentRegistry::with_builtins()))
    }

    fn props(value: serde_json::Value) -> Props {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Props::new(),
        }
    }

    #[test]
    fn test_mutation_records_history() {
        let mut s = session();
        s.update_props(&"h".into(), &props(json!({"level": 1})))
            .expect("update");
        assert!(s.can_undo());
        assert!(s.undo());
        assert_eq!(s.tree().get_node(&"h".into()).expect("h").props.get("level"), None);
        assert!(s.redo());
        assert_eq!(
            s.tree().get_node(&"h".into()).expect("h").props["level"],
            json!(1)
        );
    }

    #[test]
    fn test_failed_mutation_records_nothing() {
        let mut s = session();
        let err = s
            .insert_child(&"h".into(), Element::new("text"), 0)
            .unwrap_err();
        assert!(matches!(err, CoreError::NotCapable { .. }));
        assert!(!s.can_undo());
    }

    #[test]
    fn test_inline_edit_is_one_history_entry() {
        let mut s = session();
        s.begin_inline_edit(&"h".into()).expect("begin");
        for text in ["H", "He", "Hel", "Hello"] {
            assert!(s.inline_input(text));
        }
        assert!(s.commit_inline_edit().expect("commit"));
        assert!(s.undo());
        assert!(!s.can_undo());
        assert_eq!(
            s.tree().get_node(&"h".into()).expect("h").props["text"],
            json!("Hi")
        );
    }

    #[test]
    fn test_unchanged_inline_edit_records_nothing() {
        let mut s = session();
        s.begin_inline_edit(&"h".into()).expect("begin");
        assert!(!s.commit_inline_edit().expect("commit"));
        assert!(!s.can_undo());
        assert!(!s.inline_input("late"));
    }

    #[test]
    fn test_add_component_and_remove_clears_selection() {
        let mut s = session();
        let id = s
            .add_component("button", &"root".into(), 1)
            .expect("add");
        s.select(Some(&id)).expect("select");
        s.remove_node(&id).expect("remove");
        assert!(s.selected().is_none());
        assert_eq!(s.tree().node_count(), 2);
    }

    #[test]
    fn test_resolve_uses_selected_viewport() {
        let mut s = session();
        s.update_responsive_override(&"h".into(), Viewport::Mobile, &props(json!({"level": 4})))
            .expect("override");
        assert_eq!(s.resolve(&"h".into()).expect("resolve").i64_prop("level"), Some(2));
        s.set_viewport(Viewport::Mobile);
        assert_eq!(s.resolve(&"h".into()).expect("resolve").i64_prop("level"), Some(4));
    }

    #[test]
    fn test_replace_tree_validates() {
        let mut s = session();
        let bad = ElementTree::new(Element::with_id("x", "mystery")).expect("tree");
        assert!(matches!(
            s.replace_tree(bad),
            Err(CoreError::UnknownComponentType(_))
        ));
        assert!(!s.can_undo());
    }
}
