mod validity;

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    flock::FileLock,
    git::{RepositorySource, SourceError},
    locator::{CacheKey, Locator, DEFAULT_REMOTE_PREFIX},
};

pub use validity::{InvalidReason, Validity};

pub const DEFAULT_ENTRY_PREFIX: &str = "github_tools";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache location {location} is not a directory")]
    BadLocation { location: String },
    #[error("Failed to clone repository {locator}: {source}")]
    Acquisition {
        locator: String,
        #[source]
        source: SourceError,
    },
    #[error(transparent)]
    Lock(#[from] crate::flock::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// A directory holding the files of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: PathBuf,
    key: Option<CacheKey>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key of the cache entry, `None` for a caller's own local directory.
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }
}

/// Maps locators to reusable working copies under a single cache root.
///
/// Every remote locator owns the entry `<root>/<prefix>_<key>`, guarded by
/// the sibling lock file `<root>/<prefix>_<key>.lock`. The root is created on
/// first use and never removed by the cache itself.
pub struct WorkspaceCache<S> {
    root: PathBuf,
    entry_prefix: String,
    remote_prefixes: Vec<String>,
    source: S,
}

impl<S: RepositorySource> WorkspaceCache<S> {
    pub fn new(root: impl Into<PathBuf>, source: S) -> WorkspaceCache<S> {
        WorkspaceCache {
            root: root.into(),
            entry_prefix: DEFAULT_ENTRY_PREFIX.to_owned(),
            remote_prefixes: vec![DEFAULT_REMOTE_PREFIX.to_owned()],
            source,
        }
    }

    pub fn with_entry_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_prefix = prefix.into();
        self
    }

    pub fn with_remote_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.remote_prefixes = prefixes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}_{}", self.entry_prefix, key))
    }

    /// Returns a ready workspace for `locator`, cloning only when no valid
    /// cache entry exists.
    pub fn resolve(&self, locator: &str) -> Result<Workspace, CacheError> {
        if let Locator::Local(path) = Locator::classify(locator, &self.remote_prefixes) {
            debug!("Using local directory {}", path.display());
            return Ok(Workspace {
                path: path.to_path_buf(),
                key: None,
            });
        }

        let key = CacheKey::of(locator);
        self.ensure_root()?;
        let path = self.entry_path(&key);
        let _lock = FileLock::new(&self.lock_path(&key))?;

        if path.exists() {
            match self.validate(&path, locator) {
                Validity::Valid => {
                    debug!("Reusing cached workspace {} for {}", path.display(), locator);
                    return Ok(Workspace {
                        path,
                        key: Some(key),
                    });
                }
                Validity::Invalid(reason) => {
                    warn!(
                        "Discarding cached workspace {}: {}",
                        path.display(),
                        reason
                    );
                    remove_entry(&path);
                }
            }
        }

        std::fs::create_dir_all(&path)?;
        info!("Cloning {} into {}", locator, path.display());
        if let Err(source) = self.source.acquire(locator, &path) {
            remove_entry(&path);
            return Err(CacheError::Acquisition {
                locator: locator.to_owned(),
                source,
            });
        }

        Ok(Workspace {
            path,
            key: Some(key),
        })
    }

    /// Checks whether the entry at `path` may be served for `locator`.
    pub fn validate(&self, path: &Path, locator: &str) -> Validity {
        if !path.is_dir() {
            return Validity::Invalid(InvalidReason::Missing);
        }
        match self.source.inspect(path) {
            Ok(copy) => Validity::of(&copy, locator),
            Err(error) => Validity::Invalid(InvalidReason::Unreadable(error.to_string())),
        }
    }

    /// Removes every entry and lock file this cache created under its root.
    /// Anything else in the root is left alone.
    pub fn clear(&self) -> Result<(), CacheError> {
        if !self.root.exists() {
            return Ok(());
        }
        info!(
            "Clearing {}_* workspaces under {}",
            self.entry_prefix,
            self.root.display()
        );
        let marker = format!("{}_", self.entry_prefix);
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(&marker) {
                continue;
            }
            let path = entry.path();
            debug!("Removing {}", path.display());
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn ensure_root(&self) -> Result<(), CacheError> {
        if self.root.exists() {
            if !self.root.is_dir() {
                return Err(CacheError::BadLocation {
                    location: self.root.display().to_string(),
                });
            }
        } else {
            std::fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}_{}.lock", self.entry_prefix, key))
    }
}

fn remove_entry(path: &Path) {
    if let Err(error) = std::fs::remove_dir_all(path) {
        warn!("Could not remove {}: {}", path.display(), error);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::git::WorkingCopy;

    use pretty_assertions::assert_eq;

    const LOCATOR: &str = "https://github.com/example/repo";

    /// Writes a marker file instead of cloning and reports whatever origin
    /// it was last asked to acquire.
    #[derive(Default)]
    struct FakeSource {
        acquired: RefCell<Vec<String>>,
        fail: bool,
    }

    impl RepositorySource for FakeSource {
        fn acquire(&self, locator: &str, destination: &Path) -> Result<(), SourceError> {
            self.acquired.borrow_mut().push(locator.to_owned());
            std::fs::write(destination.join("origin"), locator)?;
            if self.fail {
                return Err(git2::Error::from_str("remote hung up").into());
            }
            Ok(())
        }

        fn inspect(&self, workspace: &Path) -> Result<WorkingCopy, SourceError> {
            let origin = std::fs::read_to_string(workspace.join("origin"))?;
            Ok(WorkingCopy {
                bare: false,
                empty: false,
                origin: Some(origin),
            })
        }
    }

    #[test]
    fn entry_path_uses_prefix_and_key() {
        let cache = WorkspaceCache::new("/tmp", FakeSource::default());
        let key = CacheKey::of(LOCATOR);
        assert_eq!(
            cache.entry_path(&key),
            PathBuf::from(format!("/tmp/github_tools_{key}"))
        );
    }

    #[test]
    fn second_resolve_reuses_entry() {
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(root.path(), FakeSource::default());

        let first = cache.resolve(LOCATOR).unwrap();
        let second = cache.resolve(LOCATOR).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.key(), Some(&CacheKey::of(LOCATOR)));
        assert_eq!(cache.source().acquired.borrow().len(), 1);
    }

    #[test]
    fn different_locators_get_different_entries() {
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(root.path(), FakeSource::default());

        let repo = cache.resolve(LOCATOR).unwrap();
        let other = cache.resolve("https://github.com/example/other").unwrap();

        assert_ne!(repo.path(), other.path());
        assert_ne!(repo.key(), other.key());
    }

    #[test]
    fn origin_mismatch_forces_reacquisition() {
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(root.path(), FakeSource::default());

        let workspace = cache.resolve(LOCATOR).unwrap();
        std::fs::write(
            workspace.path().join("origin"),
            "https://github.com/someone/else",
        )
        .unwrap();
        std::fs::write(workspace.path().join("stale.txt"), "stale").unwrap();

        let again = cache.resolve(LOCATOR).unwrap();
        assert_eq!(again.path(), workspace.path());
        assert_eq!(cache.source().acquired.borrow().len(), 2);
        assert!(!again.path().join("stale.txt").exists());
        assert_eq!(cache.validate(again.path(), LOCATOR), Validity::Valid);
    }

    #[test]
    fn failed_acquisition_leaves_no_entry() {
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(
            root.path(),
            FakeSource {
                fail: true,
                ..Default::default()
            },
        );

        let error = cache.resolve(LOCATOR).unwrap_err();
        assert!(matches!(error, CacheError::Acquisition { .. }));
        assert!(error.to_string().contains("remote hung up"));
        assert!(!cache.entry_path(&CacheKey::of(LOCATOR)).exists());
    }

    #[test]
    fn local_directory_is_returned_unchanged() {
        let local = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(root.path(), FakeSource::default());

        let workspace = cache.resolve(local.path().to_str().unwrap()).unwrap();
        assert_eq!(workspace.path(), local.path());
        assert_eq!(workspace.key(), None);
        assert!(cache.source().acquired.borrow().is_empty());
    }

    #[test]
    fn root_is_created_lazily() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("nested").join("cache");
        let cache = WorkspaceCache::new(&root, FakeSource::default());
        assert!(!root.exists());

        cache.resolve(LOCATOR).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn file_as_root_is_rejected() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("file");
        std::fs::write(&root, "").unwrap();
        let cache = WorkspaceCache::new(&root, FakeSource::default());

        assert!(matches!(
            cache.resolve(LOCATOR),
            Err(CacheError::BadLocation { .. })
        ));
    }

    #[test]
    fn clear_removes_only_own_entries() {
        let root = tempfile::tempdir().unwrap();
        let cache = WorkspaceCache::new(root.path(), FakeSource::default());
        let workspace = cache.resolve(LOCATOR).unwrap();
        std::fs::write(root.path().join("unrelated.txt"), "keep").unwrap();

        cache.clear().unwrap();

        assert!(!workspace.path().exists());
        assert!(root.path().join("unrelated.txt").exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }
}
