mod source;

use std::{path::Path, time::Duration};

use thiserror::Error;

pub use source::GitSource;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Transfer did not complete within {}s", .after.as_secs())]
    TimedOut { after: Duration },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// What a source can tell about an existing local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub bare: bool,
    /// No commits checked out (unborn HEAD).
    pub empty: bool,
    /// URL of the `origin` remote, if there is one.
    pub origin: Option<String>,
}

/// The transfer capability the workspace cache is built on.
pub trait RepositorySource {
    /// Obtains a complete working copy of `locator` inside `destination`,
    /// which exists and is empty.
    fn acquire(&self, locator: &str, destination: &Path) -> Result<(), SourceError>;

    /// Opens an existing local copy and describes it.
    fn inspect(&self, workspace: &Path) -> Result<WorkingCopy, SourceError>;
}
