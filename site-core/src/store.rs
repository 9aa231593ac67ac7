//! Shared tree storage for the editor surface.
//!
//! [`TreeStore`] is a thread-safe map from website id to [`ElementTree`],
//! optionally mirrored to a data directory as one [`SiteDocument`] JSON file
//! per site. It implements [`TreeRepository`], the persistence contract the
//! rest of the system depends on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{ComponentRegistry, CoreError, ElementTree, SiteDocument};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No tree is stored for the site.
    #[error("Site not found: {0}")]
    SiteNotFound(String),
    /// A site with this id already exists.
    #[error("Site already exists: {0}")]
    AlreadyExists(String),
    /// A tree operation failed.
    #[error(transparent)]
    Tree(#[from] CoreError),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Short machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::SiteNotFound(_) => "site_not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Tree(e) => e.code(),
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Persistence contract for element trees.
pub trait TreeRepository: Send + Sync {
    /// Load the tree of a site.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SiteNotFound`] if nothing is stored for the site.
    fn load_tree(&self, website_id: &str) -> StoreResult<ElementTree>;

    /// Store the tree of a site, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be persisted.
    fn save_tree(&self, website_id: &str, tree: &ElementTree) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
struct StoredSite {
    tree: ElementTree,
    version: u64,
}

/// Thread-safe tree storage shared across HTTP handlers.
///
/// # Example
///
/// ```
/// use site_core::store::{TreeRepository, TreeStore};
///
/// let store = TreeStore::new();
/// let tree = store.create_site("my-site").unwrap();
/// assert_eq!(store.load_tree("my-site").unwrap(), tree);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeStore {
    sites: Arc<RwLock<HashMap<String, StoredSite>>>,
    /// Optional data directory for filesystem persistence.
    data_dir: Option<PathBuf>,
}

impl TreeStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that mirrors every save to `data_dir`.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            sites: Arc::default(),
            data_dir: Some(data_dir),
        })
    }

    /// The configured data directory, if any.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Create a site whose tree is a single empty `section`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if the site is already stored.
    pub fn create_site(&self, website_id: &str) -> StoreResult<ElementTree> {
        if self.exists(website_id) {
            return Err(StoreError::AlreadyExists(website_id.to_string()));
        }
        let root = ComponentRegistry::builtin().instantiate("section")?;
        let tree = ElementTree::new(root)?;
        self.save_tree(website_id, &tree)?;
        tracing::info!("Created site {website_id}");
        Ok(tree)
    }

    /// Whether a tree is stored for the site (in memory or on disk).
    #[must_use]
    pub fn exists(&self, website_id: &str) -> bool {
        let in_memory = self
            .sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(website_id);
        in_memory || self.file_path(website_id).is_some_and(|p| p.exists())
    }

    /// Apply a pure tree operation and store the result.
    ///
    /// The write lock is held across the operation and the write to disk,
    /// so concurrent updates to the same site are serialized and the file
    /// always holds the newest version. Memory changes only once the write
    /// succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SiteNotFound`] if the site is unknown, the
    /// operation's error, or a persistence error.
    pub fn update<F>(&self, website_id: &str, op: F) -> StoreResult<ElementTree>
    where
        F: FnOnce(&ElementTree) -> Result<ElementTree, CoreError>,
    {
        // Pull a disk-only site into memory first.
        if !self.in_memory(website_id) {
            self.load_tree(website_id)?;
        }
        let mut sites = self.sites.write().unwrap_or_else(PoisonError::into_inner);
        let site = sites
            .get_mut(website_id)
            .ok_or_else(|| StoreError::SiteNotFound(website_id.to_string()))?;
        let tree = op(&site.tree)?;
        let version = site.version + 1;
        self.persist(&SiteDocument::from_tree(website_id, &tree, version))?;
        site.tree = tree.clone();
        site.version = version;
        Ok(tree)
    }

    /// The canonical document of a site.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SiteNotFound`] if the site is unknown.
    pub fn document(&self, website_id: &str) -> StoreResult<SiteDocument> {
        let tree = self.load_tree(website_id)?;
        let version = self
            .sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(website_id)
            .map_or(0, |s| s.version);
        Ok(SiteDocument::from_tree(website_id, &tree, version))
    }

    /// Ids of all sites held in memory, sorted.
    #[must_use]
    pub fn site_ids(&self) -> Vec<String> {
        let sites = self.sites.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<_> = sites.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove a site from memory and disk.
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the persisted file cannot be deleted.
    pub fn delete_site(&self, website_id: &str) -> StoreResult<bool> {
        let removed = self
            .sites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(website_id)
            .is_some();
        let mut deleted_file = false;
        if let Some(path) = self.file_path(website_id) {
            if path.exists() {
                std::fs::remove_file(&path)?;
                deleted_file = true;
            }
        }
        if removed || deleted_file {
            tracing::info!("Deleted site {website_id}");
        }
        Ok(removed || deleted_file)
    }

    /// Load every persisted site from the data directory into memory.
    ///
    /// Files that fail to parse are skipped with a warning. Returns the ids
    /// that were loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the data directory can't be read.
    pub fn load_all(&self) -> StoreResult<Vec<String>> {
        let Some(ref data_dir) = self.data_dir else {
            return Ok(Vec::new());
        };
        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(data_dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            match read_document(&path) {
                Ok(doc) => {
                    let website_id = doc.website_id.clone();
                    let version = doc.version;
                    match doc.into_tree() {
                        Ok(tree) => {
                            self.insert(&website_id, tree, version);
                            loaded.push(website_id);
                        }
                        Err(e) => tracing::warn!("Skipping {}: {e}", path.display()),
                    }
                }
                Err(e) => tracing::warn!("Skipping {}: {e}", path.display()),
            }
        }
        loaded.sort();
        Ok(loaded)
    }

    fn in_memory(&self, website_id: &str) -> bool {
        self.sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(website_id)
    }

    fn insert(&self, website_id: &str, tree: ElementTree, version: u64) {
        self.sites
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(website_id.to_string(), StoredSite { tree, version });
    }

    fn file_path(&self, website_id: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_filename(website_id))))
    }

    /// Write a document to disk. No-op without a data directory.
    fn persist(&self, doc: &SiteDocument) -> StoreResult<()> {
        let Some(path) = self.file_path(&doc.website_id) else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(doc)?;
        std::fs::write(&path, json)?;
        tracing::debug!("Persisted site {} v{} to {}", doc.website_id, doc.version, path.display());
        Ok(())
    }
}

impl TreeRepository for TreeStore {
    fn load_tree(&self, website_id: &str) -> StoreResult<ElementTree> {
        if let Some(site) = self
            .sites
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(website_id)
        {
            return Ok(site.tree.clone());
        }

        let path = self
            .file_path(website_id)
            .filter(|p| p.exists())
            .ok_or_else(|| StoreError::SiteNotFound(website_id.to_string()))?;
        let doc = read_document(&path)?;
        let version = doc.version;
        let tree = doc.into_tree()?;
        self.insert(website_id, tree.clone(), version);
        tracing::debug!("Loaded site {website_id} from {}", path.display());
        Ok(tree)
    }

    fn save_tree(&self, website_id: &str, tree: &ElementTree) -> StoreResult<()> {
        let mut sites = self.sites.write().unwrap_or_else(PoisonError::into_inner);
        let version = sites.get(website_id).map_or(0, |s| s.version) + 1;
        self.persist(&SiteDocument::from_tree(website_id, tree, version))?;
        sites.insert(
            website_id.to_string(),
            StoredSite {
                tree: tree.clone(),
                version,
            },
        );
        Ok(())
    }
}

fn read_document(path: &Path) -> StoreResult<SiteDocument> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Sanitize a website id for use as a filename.
///
/// Replaces any character that is not alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(website_id: &str) -> String {
    website_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Element, ElementId, Props};
    use serde_json::json;

    fn sample_tree() -> ElementTree {
        ElementTree::new(
            Element::with_id("root", "section")
                .with_child(Element::with_id("title", "heading").with_prop("text", "Hello")),
        )
        .expect("valid tree")
    }

    #[test]
    fn test_create_site_has_section_root() {
        let store = TreeStore::new();
        let tree = store.create_site("alpha").expect("create");
        assert_eq!(tree.root().kind, "section");
        assert_eq!(tree.node_count(), 1);
        assert_eq!(store.site_ids(), vec!["alpha".to_string()]);
    }

    #[test]
    fn test_create_existing_site_fails() {
        let store = TreeStore::new();
        store.create_site("alpha").expect("create");
        assert!(matches!(
            store.create_site("alpha"),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_load_missing_site() {
        let store = TreeStore::new();
        let err = store.load_tree("nope").unwrap_err();
        assert!(matches!(err, StoreError::SiteNotFound(ref id) if id == "nope"));
        assert_eq!(err.code(), "site_not_found");
    }

    #[test]
    fn test_save_and_load() {
        let store = TreeStore::new();
        let tree = sample_tree();
        store.save_tree("alpha", &tree).expect("save");
        assert_eq!(store.load_tree("alpha").expect("load"), tree);
    }

    #[test]
    fn test_update_applies_operation_and_bumps_version() {
        let store = TreeStore::new();
        store.save_tree("alpha", &sample_tree()).expect("save");
        let mut partial = Props::new();
        partial.insert("text".into(), json!("Bye"));

        let updated = store
            .update("alpha", |tree| {
                tree.update_props(&ElementId::from("title"), &partial)
            })
            .expect("update");

        let title = updated.get_node(&ElementId::from("title")).expect("title");
        assert_eq!(title.props["text"], json!("Bye"));
        assert_eq!(store.document("alpha").expect("doc").version, 2);
    }

    #[test]
    fn test_failed_update_leaves_tree_untouched() {
        let store = TreeStore::new();
        let tree = sample_tree();
        store.save_tree("alpha", &tree).expect("save");

        let err = store
            .update("alpha", |t| t.remove_node(&ElementId::from("root")))
            .unwrap_err();
        assert!(matches!(err, StoreError::Tree(CoreError::CannotRemoveRoot)));
        assert_eq!(err.code(), "cannot_remove_root");
        assert_eq!(store.load_tree("alpha").expect("load"), tree);
    }

    /// Turn the site's file into a directory so the next write fails.
    fn block_writes(dir: &Path, website_id: &str) {
        let path = dir.join(format!("{website_id}.json"));
        if path.exists() {
            std::fs::remove_file(&path).expect("remove");
        }
        std::fs::create_dir(&path).expect("block");
    }

    #[test]
    fn test_failed_write_keeps_memory_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TreeStore::with_data_dir(dir.path()).expect("store");
        let tree = sample_tree();
        store.save_tree("alpha", &tree).expect("save");
        block_writes(dir.path(), "alpha");

        let err = store
            .update("alpha", |t| t.remove_node(&ElementId::from("title")))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.load_tree("alpha").expect("load"), tree);
        assert_eq!(store.document("alpha").expect("doc").version, 1);

        let err = store.save_tree("alpha", &ElementTree::new(Element::with_id("r", "section")).expect("tree"));
        assert!(err.is_err());
        assert_eq!(store.load_tree("alpha").expect("load"), tree);
        assert_eq!(store.document("alpha").expect("doc").version, 1);
    }

    #[test]
    fn test_failed_first_write_stores_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TreeStore::with_data_dir(dir.path()).expect("store");
        block_writes(dir.path(), "beta");

        assert!(store.save_tree("beta", &sample_tree()).is_err());
        assert!(store.site_ids().is_empty());
    }

    #[test]
    fn test_concurrent_updates_leave_newest_version_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TreeStore::with_data_dir(dir.path()).expect("store");
        store.save_tree("alpha", &sample_tree()).expect("save");

        std::thread::scope(|scope| {
            for n in 0..8 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..10 {
                        let mut partial = Props::new();
                        partial.insert("text".into(), json!(format!("{n}-{i}")));
                        store
                            .update("alpha", |t| t.update_props(&ElementId::from("title"), &partial))
                            .expect("update");
                    }
                });
            }
        });

        let in_memory = store.document("alpha").expect("doc");
        assert_eq!(in_memory.version, 81);
        let on_disk = read_document(&dir.path().join("alpha.json")).expect("read");
        assert_eq!(on_disk.version, 81);
        assert_eq!(on_disk.root, in_memory.root);
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = sample_tree();
        {
            let store = TreeStore::with_data_dir(dir.path()).expect("store");
            store.save_tree("site/one", &tree).expect("save");
        }
        assert!(dir.path().join("site_one.json").exists());

        let reopened = TreeStore::with_data_dir(dir.path()).expect("store");
        assert_eq!(reopened.load_tree("site/one").expect("load"), tree);
    }

    #[test]
    fn test_load_all_skips_corrupt_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let store = TreeStore::with_data_dir(dir.path()).expect("store");
            store.save_tree("alpha", &sample_tree()).expect("save");
            store.save_tree("beta", &sample_tree()).expect("save");
        }
        std::fs::write(dir.path().join("broken.json"), "{not json").expect("write");

        let store = TreeStore::with_data_dir(dir.path()).expect("store");
        let loaded = store.load_all().expect("load all");
        assert_eq!(loaded, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(store.site_ids().len(), 2);
    }

    #[test]
    fn test_delete_site_removes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TreeStore::with_data_dir(dir.path()).expect("store");
        store.create_site("alpha").expect("create");
        assert!(store.delete_site("alpha").expect("delete"));
        assert!(!dir.path().join("alpha.json").exists());
        assert!(!store.delete_site("alpha").expect("delete again"));
        assert!(!store.exists("alpha"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("abc-123_x"), "abc-123_x");
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
    }
}
