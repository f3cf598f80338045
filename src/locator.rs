use std::{fmt::Display, path::Path};

use sha2::{Digest, Sha256};

/// Number of hex characters of the digest kept in a cache key.
pub const KEY_LENGTH: usize = 12;

pub const DEFAULT_REMOTE_PREFIX: &str = "https://github.com/";

/// How a caller-supplied locator string is going to be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    /// A remote address, served from the workspace cache.
    Remote(&'a str),
    /// A directory that already exists on disk. It is used in place and never
    /// owned by the cache.
    Local(&'a Path),
}

impl<'a> Locator<'a> {
    /// Anything that does not start with one of `remote_prefixes` and names an
    /// existing path is local. Everything else, including paths that do not
    /// exist, goes through the cache.
    pub fn classify<S: AsRef<str>>(locator: &'a str, remote_prefixes: &[S]) -> Self {
        let remote = remote_prefixes
            .iter()
            .any(|prefix| locator.starts_with(prefix.as_ref()));
        let path = Path::new(locator);
        if !remote && path.exists() {
            Locator::Local(path)
        } else {
            Locator::Remote(locator)
        }
    }
}

/// Short deterministic digest of a locator, used to name its cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn of(locator: &str) -> CacheKey {
        let digest = format!("{:x}", Sha256::digest(locator.as_bytes()));
        CacheKey(digest[..KEY_LENGTH].to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
