//! Canonical serialized representation of a site, shared by the store, the
//! HTTP surface and the publish pipeline.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{CoreResult, Element, ElementTree};

/// Persisted form of a site's element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDocument {
    /// Site the tree belongs to.
    pub website_id: String,
    /// Monotonic save counter.
    #[serde(default)]
    pub version: u64,
    /// Last save time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub updated_at: u64,
    /// Root element of the page.
    pub root: Element,
}

impl SiteDocument {
    /// Build a document from a tree, stamped with the current time.
    #[must_use]
    pub fn from_tree(website_id: impl Into<String>, tree: &ElementTree, version: u64) -> Self {
        Self {
            website_id: website_id.into(),
            version,
            updated_at: current_timestamp_ms(),
            root: tree.root().clone(),
        }
    }

    /// Convert the document back into a tree.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::DuplicateId`] if the document reuses an id.
    pub fn into_tree(self) -> CoreResult<ElementTree> {
        ElementTree::new(self.root)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoreError, Viewport};
    use serde_json::json;

    fn sample_tree() -> ElementTree {
        ElementTree::new(
            Element::with_id("root", "section").with_child(
                Element::with_id("row", "row")
                    .with_prop("columns", 3)
                    .with_override(Viewport::Tablet, "columns", 2)
                    .with_child(Element::with_id("a", "column"))
                    .with_child(Element::with_id("b", "column")),
            ),
        )
        .expect("valid tree")
    }

    #[test]
    fn test_document_round_trip() {
        let tree = sample_tree();
        let doc = SiteDocument::from_tree("site-1", &tree, 4);
        let json = doc.to_json().expect("serialize");
        let parsed = SiteDocument::from_json(&json).expect("parse");
        assert_eq!(parsed, doc);
        assert_eq!(parsed.into_tree().expect("tree"), tree);
    }

    #[test]
    fn test_document_wire_names() {
        let doc = SiteDocument::from_tree("site-1", &sample_tree(), 1);
        let value = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(value["websiteId"], json!("site-1"));
        assert!(value["updatedAt"].is_u64());
        assert_eq!(value["root"]["children"][0]["responsiveOverrides"]["tablet"]["columns"], json!(2));
    }

    #[test]
    fn test_document_rejects_duplicate_ids() {
        let doc: SiteDocument = serde_json::from_value(json!({
            "websiteId": "site-1",
            "root": {"id": "x", "type": "section", "children": [{"id": "x", "type": "text"}]}
        }))
        .expect("parse");
        assert_eq!(doc.version, 0);
        assert!(matches!(doc.into_tree(), Err(CoreError::DuplicateId(_))));
    }

    #[test]
    fn test_timestamp_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(current_timestamp_ms() > 1_577_836_800_000);
    }
}
