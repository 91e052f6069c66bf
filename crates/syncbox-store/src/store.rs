//! The [`ObjectStore`]: PUT/GET/HEAD/DELETE/LIST over a root directory.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::etag::{content_etag, metadata_etag};

/// The storage class reported for every object.
pub const STORAGE_CLASS: &str = "STANDARD";

/// Metadata for a single stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Metadata ETag (see [`metadata_etag`](crate::metadata_etag)).
    pub etag: String,
}

/// One row of a listing.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Slash-delimited key relative to the store root.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Metadata ETag.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Always [`STORAGE_CLASS`].
    pub storage_class: &'static str,
}

/// Filesystem object store rooted at a single directory.
///
/// All operations resolve keys through a traversal check: a key whose
/// cleaned form would escape the root is rejected with
/// [`StoreError::InvalidKey`] before any filesystem access.
///
/// # Examples
///
/// ```no_run
/// use syncbox_store::ObjectStore;
///
/// # async fn demo() -> Result<(), syncbox_store::StoreError> {
/// let store = ObjectStore::new("/var/lib/syncbox");
/// let etag = store.put("notes/today.md", b"hello").await?;
/// assert!(etag.starts_with('"'));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a store rooted at `root`. The directory itself is created by
    /// the caller at startup; operations assume it exists.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `data` at `key`, creating parent directories as needed and
    /// truncating any existing object. Returns the content ETag.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidKey`] for traversal, [`StoreError::Io`] on
    /// filesystem failure.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<String, StoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        debug!(key, size = data.len(), "stored object");
        Ok(content_etag(data))
    }

    /// Read the object at `key`: metadata plus the full content.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no regular file exists at the key.
    pub async fn get(&self, key: &str) -> Result<(ObjectMeta, Bytes), StoreError> {
        let path = self.resolve(key)?;
        let meta = self.stat(key, &path).await?;
        let data = fs::read(&path).await.map_err(not_found_or_io)?;
        Ok((meta, Bytes::from(data)))
    }

    /// Metadata for the object at `key` without reading its content.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no regular file exists at the key.
    pub async fn head(&self, key: &str) -> Result<ObjectMeta, StoreError> {
        let path = self.resolve(key)?;
        self.stat(key, &path).await
    }

    /// Remove the object at `key`. Removing a missing object succeeds.
    /// Afterwards, empty parent directories are pruned upward, stopping at
    /// (and never removing) the root.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on a removal failure other than "not found".
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => debug!(key, "deleted object"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key, "delete of missing object");
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(parent) = path.parent() {
            self.prune_empty_dirs(parent.to_path_buf()).await;
        }
        Ok(())
    }

    /// Walk the store depth-first in per-directory lexical order, skipping
    /// `.git` subtrees, and collect up to `max_keys` objects whose keys
    /// start with `prefix` (an empty prefix matches everything).
    ///
    /// A missing or unreadable root yields an empty listing rather than an
    /// error, matching the walk's skip-on-error behavior for entries.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] only if the background walk task fails to run.
    pub async fn list(
        &self,
        prefix: &str,
        max_keys: usize,
    ) -> Result<Vec<ObjectInfo>, StoreError> {
        let root = self.root.clone();
        let prefix = prefix.to_owned();
        let objects = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            walk_dir(&root, &root, &prefix, max_keys, &mut out);
            out
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        Ok(objects)
    }

    /// Map a slash-delimited key to an on-disk path, rejecting any key
    /// whose components would escape the root.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::InvalidKey);
                }
            }
        }
        if depth == 0 {
            return Err(StoreError::InvalidKey);
        }
        Ok(path)
    }

    async fn stat(&self, key: &str, path: &Path) -> Result<ObjectMeta, StoreError> {
        let md = fs::metadata(path).await.map_err(not_found_or_io)?;
        if !md.is_file() {
            return Err(StoreError::NotFound);
        }
        let last_modified = DateTime::<Utc>::from(md.modified()?);
        Ok(ObjectMeta {
            size: md.len(),
            last_modified,
            etag: metadata_etag(key, &last_modified),
        })
    }

    /// Remove empty directories from `dir` upward, halting at the root or
    /// at the first non-empty (or unreadable) directory.
    async fn prune_empty_dirs(&self, mut dir: PathBuf) {
        while dir != self.root && dir.starts_with(&self.root) {
            match fs::read_dir(&dir).await {
                Ok(mut entries) => match entries.next_entry().await {
                    Ok(Some(_)) | Err(_) => break,
                    Ok(None) => {
                        if let Err(e) = fs::remove_dir(&dir).await {
                            warn!(dir = %dir.display(), error = %e, "failed to prune empty directory");
                            break;
                        }
                        trace!(dir = %dir.display(), "pruned empty directory");
                    }
                },
                Err(_) => break,
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

fn not_found_or_io(err: std::io::Error) -> StoreError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StoreError::NotFound
    } else {
        StoreError::Io(err)
    }
}

/// Depth-first walk. Unreadable directories and entries are skipped, not
/// surfaced; enumeration stops once `max_keys` objects are collected.
fn walk_dir(dir: &Path, root: &Path, prefix: &str, max_keys: usize, out: &mut Vec<ObjectInfo>) {
    if out.len() >= max_keys {
        return;
    }
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<std::fs::DirEntry> = read_dir.filter_map(Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        if out.len() >= max_keys {
            return;
        }
        let Ok(md) = entry.metadata() else { continue };
        let path = entry.path();

        if md.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            walk_dir(&path, root, prefix, max_keys, out);
            continue;
        }
        if !md.is_file() {
            continue;
        }

        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let key: String = rel
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/");
        if !prefix.is_empty() && !key.starts_with(prefix) {
            continue;
        }
        let Ok(modified) = md.modified() else { continue };
        let last_modified = DateTime::<Utc>::from(modified);
        out.push(ObjectInfo {
            etag: metadata_etag(&key, &last_modified),
            key,
            last_modified,
            size: md.len(),
            storage_class: STORAGE_CLASS,
        });
    }
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    use super::*;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = ObjectStore::new(dir.path());
        (dir, store)
    }

    // -----------------------------------------------------------------------
    // PUT / GET
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_round_trip_put_and_get() {
        let (_dir, store) = store();
        let etag = store
            .put("notes/test.md", b"hello world")
            .await
            .unwrap_or_else(|e| panic!("put failed: {e}"));

        let expected = hex::encode(Sha256::digest(b"hello world"));
        assert_eq!(etag, format!("\"{}\"", &expected[..32]));

        let (meta, data) = store
            .get("notes/test.md")
            .await
            .unwrap_or_else(|e| panic!("get failed: {e}"));
        assert_eq!(data.as_ref(), b"hello world");
        assert_eq!(meta.size, 11);
    }

    #[tokio::test]
    async fn test_should_truncate_on_overwrite() {
        let (_dir, store) = store();
        store.put("a.txt", b"a longer body").await.expect("first put");
        store.put("a.txt", b"short").await.expect("second put");

        let (meta, data) = store.get("a.txt").await.expect("get");
        assert_eq!(data.as_ref(), b"short");
        assert_eq!(meta.size, 5);
    }

    #[tokio::test]
    async fn test_should_create_nested_parent_directories() {
        let (dir, store) = store();
        store.put("a/b/c/deep.txt", b"x").await.expect("put");
        assert!(dir.path().join("a/b/c/deep.txt").is_file());
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_missing_object() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get("ghost.txt").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.head("ghost.txt").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_should_return_not_found_for_directory_key() {
        let (_dir, store) = store();
        store.put("sub/file.txt", b"x").await.expect("put");
        assert!(matches!(store.get("sub").await, Err(StoreError::NotFound)));
    }

    // -----------------------------------------------------------------------
    // Key resolution
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_reject_traversal_keys() {
        let (_dir, store) = store();
        for key in ["../escape.txt", "a/../../escape.txt", "/etc/passwd"] {
            assert!(
                matches!(store.put(key, b"x").await, Err(StoreError::InvalidKey)),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_should_allow_interior_parent_segments_that_stay_inside_root() {
        // `a/../b.txt` cleans to `b.txt`; the lexical check rejects any
        // parent segment outright, which is stricter but safe.
        let (_dir, store) = store();
        assert!(matches!(
            store.put("a/../b.txt", b"x").await,
            Err(StoreError::InvalidKey)
        ));
    }

    // -----------------------------------------------------------------------
    // HEAD ETags
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_use_distinct_etag_derivations_for_put_and_head() {
        let (_dir, store) = store();
        let put_etag = store.put("k.txt", b"content").await.expect("put");
        let head = store.head("k.txt").await.expect("head");
        assert_ne!(put_etag, head.etag);
        assert_eq!(head.etag.trim_matches('"').len(), 64);
    }

    #[tokio::test]
    async fn test_should_report_matching_etags_from_head_and_list() {
        let (_dir, store) = store();
        store.put("k.txt", b"content").await.expect("put");
        let head = store.head("k.txt").await.expect("head");
        let listed = store.list("", 1000).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].etag, head.etag);
    }

    // -----------------------------------------------------------------------
    // DELETE and directory pruning
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_succeed_deleting_missing_object() {
        let (_dir, store) = store();
        store.delete("nope.txt").await.expect("delete should succeed");
    }

    #[tokio::test]
    async fn test_should_prune_empty_directories_up_to_root() {
        let (dir, store) = store();
        store.put("a/b/c/file.txt", b"x").await.expect("put");
        store.delete("a/b/c/file.txt").await.expect("delete");

        assert!(!dir.path().join("a").exists());
        assert!(dir.path().exists());
    }

    #[tokio::test]
    async fn test_should_keep_non_empty_directories() {
        let (dir, store) = store();
        store.put("a/keep.txt", b"x").await.expect("put keep");
        store.put("a/b/gone.txt", b"x").await.expect("put gone");
        store.delete("a/b/gone.txt").await.expect("delete");

        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a/keep.txt").is_file());
    }

    // -----------------------------------------------------------------------
    // LIST
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_should_list_all_objects_with_slash_keys() {
        let (_dir, store) = store();
        store.put("a.txt", b"1").await.expect("put a");
        store.put("sub/b.txt", b"2").await.expect("put b");

        let objects = store.list("", 1000).await.expect("list");
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt", "sub/b.txt"]);
        assert!(objects.iter().all(|o| o.storage_class == "STANDARD"));
    }

    #[tokio::test]
    async fn test_should_filter_listing_by_prefix() {
        let (_dir, store) = store();
        store.put("a.txt", b"1").await.expect("put a");
        store.put("sub/b.txt", b"2").await.expect("put b");

        let objects = store.list("sub/", 1000).await.expect("list");
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "sub/b.txt");
    }

    #[tokio::test]
    async fn test_should_stop_listing_at_max_keys() {
        let (_dir, store) = store();
        for name in ["a.txt", "b.txt", "c.txt"] {
            store.put(name, b"x").await.expect("put");
        }
        let objects = store.list("", 2).await.expect("list");
        assert_eq!(objects.len(), 2);
    }

    #[tokio::test]
    async fn test_should_skip_git_directory_in_listing() {
        let (dir, store) = store();
        std::fs::create_dir_all(dir.path().join(".git/objects")).expect("mkdir .git");
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main").expect("write HEAD");
        store.put("visible.txt", b"x").await.expect("put");

        let objects = store.list("", 1000).await.expect("list");
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["visible.txt"]);
    }

    #[tokio::test]
    async fn test_should_return_empty_listing_for_missing_root() {
        let store = ObjectStore::new("/nonexistent/syncbox-test-root");
        let objects = store.list("", 1000).await.expect("list");
        assert!(objects.is_empty());
    }
}
