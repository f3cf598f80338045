use std::{env, error::Error, path::PathBuf, time::Duration};

use crate::{
    cache::{WorkspaceCache, DEFAULT_ENTRY_PREFIX},
    git::GitSource,
    locator::DEFAULT_REMOTE_PREFIX,
    Repofetch,
};

#[derive(Default)]
pub struct RepofetchBuilder {
    cache_directory_path: Option<PathBuf>,
    entry_prefix: Option<String>,
    remote_prefixes: Vec<String>,
    acquisition_timeout: Option<Duration>,
}

impl RepofetchBuilder {
    /// Directory holding the cached workspaces.
    ///
    /// Defaults to the platform temporary directory.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory_path = Some(path.into());
        self
    }

    /// Name prefix of the cache entries, followed by `_` and the cache key.
    ///
    /// Defaults to `github_tools`.
    pub fn entry_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entry_prefix = Some(prefix.into());
        self
    }

    /// Adds a locator prefix that marks a remote repository. Can be called
    /// several times.
    ///
    /// Defaults to `https://github.com/` when never called.
    pub fn remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefixes.push(prefix.into());
        self
    }

    /// Upper bound for transferring a single repository.
    ///
    /// Unbounded by default.
    pub fn acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = Some(timeout);
        self
    }

    pub fn try_build(self) -> Result<Repofetch, Box<dyn Error>> {
        let Self {
            cache_directory_path,
            entry_prefix,
            mut remote_prefixes,
            acquisition_timeout,
        } = self;

        let cache_directory = cache_directory_path.unwrap_or_else(env::temp_dir);
        if cache_directory.exists() && !cache_directory.is_dir() {
            return Err(format!("{} is not a directory", cache_directory.display()).into());
        }

        if remote_prefixes.is_empty() {
            remote_prefixes.push(DEFAULT_REMOTE_PREFIX.to_owned());
        }

        let cache = WorkspaceCache::new(cache_directory, GitSource::new(acquisition_timeout))
            .with_entry_prefix(entry_prefix.unwrap_or_else(|| DEFAULT_ENTRY_PREFIX.to_owned()))
            .with_remote_prefixes(remote_prefixes);

        Ok(Repofetch { cache })
    }
}
