//! Inline (on-canvas) text editing.
//!
//! Keystrokes only touch a local buffer. The tree changes once, when the edit
//! is committed on blur, through [`ElementTree::update_props`].

use serde_json::Value;

use crate::{ComponentRegistry, CoreError, CoreResult, ElementId, ElementTree, Props};

/// Result of committing an inline edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The buffer differed from the original; carries the updated tree.
    Committed(ElementTree),
    /// Nothing changed; the tree is left as it was.
    Unchanged,
}

/// An in-progress inline edit of one element's inline field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineEdit {
    element_id: ElementId,
    field: String,
    original: String,
    buffer: String,
}

impl InlineEdit {
    /// Start editing the inline field of `id`.
    ///
    /// The buffer starts with the field's current value, falling back to the
    /// descriptor default.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the element does not exist.
    /// - [`CoreError::UnknownComponentType`] if its type is not registered.
    /// - [`CoreError::NotCapable`] if the type does not support inline editing.
    pub fn begin(tree: &ElementTree, registry: &ComponentRegistry, id: &ElementId) -> CoreResult<Self> {
        let element = tree.get_node(id)?;
        let descriptor = registry.resolve(&element.kind)?;
        let field = descriptor
            .inline_field
            .as_ref()
            .filter(|_| descriptor.supports_inline_edit)
            .ok_or_else(|| CoreError::NotCapable {
                id: id.clone(),
                kind: element.kind.clone(),
                capability: "inline editing",
            })?;

        let original = element
            .props
            .get(field)
            .or_else(|| descriptor.default_props.get(field))
            .map(text_value)
            .unwrap_or_default();

        tracing::debug!("Inline edit of {id}.{field} started");
        Ok(Self {
            element_id: id.clone(),
            field: field.clone(),
            buffer: original.clone(),
            original,
        })
    }

    /// Element being edited.
    #[must_use]
    pub fn element_id(&self) -> &ElementId {
        &self.element_id
    }

    /// Prop the edit will replace.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Current buffer contents.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether the buffer differs from the value captured at `begin`.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.buffer != self.original
    }

    /// Replace the buffer with the latest editor contents.
    pub fn input(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    /// Write the buffer back into the tree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the element was removed meanwhile.
    pub fn commit(self, tree: &ElementTree) -> CoreResult<EditOutcome> {
        if !self.is_dirty() {
            tracing::debug!("Inline edit of {} unchanged", self.element_id);
            return Ok(EditOutcome::Unchanged);
        }
        let mut partial = Props::new();
        partial.insert(self.field, Value::String(self.buffer));
        let next = tree.update_props(&self.element_id, &partial)?;
        tracing::debug!("Inline edit of {} committed", self.element_id);
        Ok(EditOutcome::Committed(next))
    }

    /// Abandon the edit.
    pub fn cancel(self) {
        tracing::debug!("Inline edit of {} cancelled", self.element_id);
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Element;
    use serde_json::json;

    fn tree() -> ElementTree {
        ElementTree::new(
            Element::with_id("root", "section")
                .with_child(Element::with_id("t", "text").with_prop("content", "<p>Old</p>"))
                .with_child(Element::with_id("b", "button"))
                .with_child(Element::with_id("img", "image")),
        )
        .expect("valid tree")
    }

    #[test]
    fn test_commit_replaces_field() {
        let tree = tree();
        let mut edit =
            InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"t".into()).expect("begin");
        assert_eq!(edit.field(), "content");
        assert_eq!(edit.buffer(), "<p>Old</p>");

        edit.input("<p>New</p>");
        let EditOutcome::Committed(next) = edit.commit(&tree).expect("commit") else {
            panic!("expected committed");
        };
        assert_eq!(
            next.get_node(&"t".into()).expect("t").props["content"],
            json!("<p>New</p>")
        );
        // The source tree is untouched.
        assert_eq!(
            tree.get_node(&"t".into()).expect("t").props["content"],
            json!("<p>Old</p>")
        );
    }

    #[test]
    fn test_input_does_not_touch_tree() {
        let tree = tree();
        let before = tree.clone();
        let mut edit =
            InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"t".into()).expect("begin");
        edit.input("a");
        edit.input("ab");
        assert!(edit.is_dirty());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_unchanged_commit() {
        let tree = tree();
        let mut edit =
            InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"t".into()).expect("begin");
        edit.input("<p>Temp</p>");
        edit.input("<p>Old</p>");
        assert_eq!(edit.commit(&tree).expect("commit"), EditOutcome::Unchanged);
    }

    #[test]
    fn test_begin_uses_descriptor_default() {
        let tree = tree();
        let edit =
            InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"b".into()).expect("begin");
        assert_eq!(edit.field(), "label");
        assert_eq!(edit.buffer(), "Button");
    }

    #[test]
    fn test_begin_on_non_editable_type() {
        let tree = tree();
        let err = InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"img".into()).unwrap_err();
        assert!(matches!(err, CoreError::NotCapable { ref kind, .. } if kind == "image"));
    }

    #[test]
    fn test_commit_after_removal_fails() {
        let tree = tree();
        let mut edit =
            InlineEdit::begin(&tree, ComponentRegistry::builtin(), &"t".into()).expect("begin");
        edit.input("changed");
        let pruned = tree.remove_node(&"t".into()).expect("remove");
        assert!(matches!(edit.commit(&pruned), Err(CoreError::NotFound(_))));
    }
}
