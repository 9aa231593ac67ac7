//! Input validation for untrusted data.
//!
//! Every id taken from a path and every body that reaches the store is
//! checked here first.

use site_core::{Element, ElementTree};
use thiserror::Error;

/// Maximum length for site ids.
pub const MAX_SITE_ID_LEN: usize = 64;
/// Maximum length for element ids (UUIDs are 36 chars).
pub const MAX_ELEMENT_ID_LEN: usize = 64;
/// Maximum number of elements in one tree.
pub const MAX_ELEMENTS_PER_TREE: usize = 10_000;
/// Maximum length of a custom domain (RFC 1035).
pub const MAX_DOMAIN_LEN: usize = 253;
/// Maximum request body accepted by the API.
pub const MAX_BODY_SIZE: usize = 4 * 1_048_576; // 4MB

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Site id exceeds maximum length.
    #[error("site id too long (max {MAX_SITE_ID_LEN} chars)")]
    SiteIdTooLong,
    /// Site id is empty or contains invalid characters.
    #[error("site id contains invalid characters")]
    SiteIdInvalidChars,
    /// Element id exceeds maximum length.
    #[error("element id too long (max {MAX_ELEMENT_ID_LEN} chars)")]
    ElementIdTooLong,
    /// Element id is empty or contains invalid characters.
    #[error("element id contains invalid characters: {0:?}")]
    ElementIdInvalidChars(String),
    /// Too many elements in a tree.
    #[error("too many elements (max {MAX_ELEMENTS_PER_TREE})")]
    TooManyElements,
    /// Custom domain is not a plausible host name.
    #[error("invalid custom domain: {0:?}")]
    InvalidDomain(String),
    /// Query parameter could not be parsed.
    #[error("invalid {name}: {value:?}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
    /// Request body is missing required data.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl ValidationError {
    /// Short label used for the validation-failure metric.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SiteIdTooLong | Self::SiteIdInvalidChars => "site_id",
            Self::ElementIdTooLong | Self::ElementIdInvalidChars(_) => "element_id",
            Self::TooManyElements => "tree_size",
            Self::InvalidDomain(_) => "custom_domain",
            Self::InvalidParameter { .. } => "parameter",
            Self::InvalidBody(_) => "body",
        }
    }
}

/// Check if a character is valid for ids (ASCII alphanumeric, hyphen, or underscore).
fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Validate a site id.
///
/// Valid site ids:
/// - 1-64 characters
/// - ASCII alphanumeric, hyphen, underscore only
///
/// # Errors
///
/// Returns [`ValidationError::SiteIdTooLong`] if the id exceeds 64 characters.
/// Returns [`ValidationError::SiteIdInvalidChars`] if the id is empty or contains invalid characters.
pub fn validate_site_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_SITE_ID_LEN {
        return Err(ValidationError::SiteIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::SiteIdInvalidChars);
    }
    Ok(())
}

/// Validate an element id.
///
/// # Errors
///
/// Returns [`ValidationError::ElementIdTooLong`] if the id exceeds 64 characters.
/// Returns [`ValidationError::ElementIdInvalidChars`] if the id is empty or contains invalid characters.
pub fn validate_element_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_ELEMENT_ID_LEN {
        return Err(ValidationError::ElementIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::ElementIdInvalidChars(id.to_string()));
    }
    Ok(())
}

/// Validate every id in a subtree and its size.
///
/// # Errors
///
/// Returns the first invalid element id, or
/// [`ValidationError::TooManyElements`] when the subtree is too large.
pub fn validate_subtree(element: &Element) -> Result<(), ValidationError> {
    if element.subtree_len() > MAX_ELEMENTS_PER_TREE {
        return Err(ValidationError::TooManyElements);
    }
    let mut result = Ok(());
    element.walk(&mut |e| {
        if result.is_ok() {
            result = validate_element_id(e.id.as_str());
        }
    });
    result
}

/// Validate a whole tree (ids and size).
///
/// # Errors
///
/// See [`validate_subtree`].
pub fn validate_tree(tree: &ElementTree) -> Result<(), ValidationError> {
    validate_subtree(tree.root())
}

/// Validate a custom domain.
///
/// Valid domains are dot-separated labels of ASCII alphanumerics and
/// hyphens, with at least two labels and no label starting or ending with
/// a hyphen.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidDomain`] otherwise.
pub fn validate_custom_domain(domain: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidDomain(domain.to_string());
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid());
    }
    let label_ok = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    if labels.into_iter().all(label_ok) {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_site_ids() {
        assert!(validate_site_id("default").is_ok());
        assert!(validate_site_id("my-site").is_ok());
        assert!(validate_site_id("site_123").is_ok());
        assert!(validate_site_id("a").is_ok());
        assert!(validate_site_id("ABC123").is_ok());
    }

    #[test]
    fn test_invalid_site_ids() {
        assert!(validate_site_id("").is_err());
        assert!(validate_site_id("has spaces").is_err());
        assert!(validate_site_id("has/slash").is_err());
        assert!(validate_site_id("../../../etc/passwd").is_err());
        assert!(validate_site_id("path\\traversal").is_err());
        assert!(validate_site_id("contains<script>").is_err());
        assert!(validate_site_id("caf\u{e9}").is_err());
    }

    #[test]
    fn test_site_id_boundary() {
        // Exactly at limit should pass
        assert!(validate_site_id(&"x".repeat(MAX_SITE_ID_LEN)).is_ok());
        // One over should fail
        assert!(matches!(
            validate_site_id(&"x".repeat(MAX_SITE_ID_LEN + 1)),
            Err(ValidationError::SiteIdTooLong)
        ));
    }

    #[test]
    fn test_element_ids() {
        assert!(validate_element_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_element_id("hero_title").is_ok());
        assert!(validate_element_id("").is_err());
        assert!(validate_element_id("has spaces").is_err());
        assert!(validate_element_id(&"x".repeat(100)).is_err());
    }

    #[test]
    fn test_subtree_ids_are_checked() {
        let good = Element::with_id("root", "section").with_child(Element::with_id("a-1", "text"));
        assert!(validate_subtree(&good).is_ok());

        let bad = Element::with_id("root", "section").with_child(Element::with_id("a b", "text"));
        assert!(matches!(
            validate_subtree(&bad),
            Err(ValidationError::ElementIdInvalidChars(id)) if id == "a b"
        ));
    }

    #[test]
    fn test_custom_domains() {
        assert!(validate_custom_domain("example.com").is_ok());
        assert!(validate_custom_domain("www.my-site.example.co").is_ok());
        assert!(validate_custom_domain("localhost").is_err());
        assert!(validate_custom_domain("-bad.example.com").is_err());
        assert!(validate_custom_domain("bad..example.com").is_err());
        assert!(validate_custom_domain("https://example.com").is_err());
        assert!(validate_custom_domain(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert!(ValidationError::SiteIdTooLong.to_string().contains("64"));
        assert!(ValidationError::TooManyElements.to_string().contains("10000"));
        assert_eq!(ValidationError::InvalidDomain("x".into()).kind(), "custom_domain");
    }
}
