use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    cache::{CacheError, Workspace, WorkspaceCache},
    files::{self, LineRange},
    git::GitSource,
    tree,
};

mod builder;

pub use builder::RepofetchBuilder;

/// Entry points for callers that expect every failure as data.
pub struct Repofetch {
    cache: WorkspaceCache<GitSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub status: WriteStatus,
    pub message: String,
    pub file_path: String,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.status == WriteStatus::Success
    }
}

impl Repofetch {
    pub fn builder() -> RepofetchBuilder {
        RepofetchBuilder::default()
    }

    pub fn cache(&self) -> &WorkspaceCache<GitSource> {
        &self.cache
    }

    /// Returns the local workspace for `locator`, cloning it if needed.
    pub fn resolve(&self, locator: &str) -> Result<Workspace, CacheError> {
        self.cache.resolve(locator)
    }

    /// Tree of the repository, or `"Error: <message>"`.
    pub fn directory_structure(&self, locator: &str) -> String {
        let rendered = self
            .cache
            .resolve(locator)
            .map_err(|error| error.to_string())
            .and_then(|workspace| {
                tree::directory_tree(workspace.path()).map_err(|error| error.to_string())
            });
        match rendered {
            Ok(text) => text,
            Err(message) => format!("Error: {message}"),
        }
    }

    /// Content or error marker for every requested path. If the workspace
    /// itself cannot be resolved the map holds a single `"error"` entry.
    pub fn read_files<S: AsRef<str>>(
        &self,
        locator: &str,
        paths: &[S],
    ) -> BTreeMap<String, String> {
        match self.cache.resolve(locator) {
            Ok(workspace) => files::read_many(workspace.path(), paths),
            Err(error) => BTreeMap::from([(
                "error".to_owned(),
                format!("Failed to process repository: {error}"),
            )]),
        }
    }

    /// Writes a whole file, or only `range` of it when given.
    pub fn write_file(
        &self,
        locator: &str,
        path: &str,
        content: &str,
        range: Option<LineRange>,
    ) -> WriteReport {
        let written = self
            .cache
            .resolve(locator)
            .map_err(|error| error.to_string())
            .and_then(|workspace| {
                files::write_file(workspace.path(), path, content, range)
                    .map_err(|error| error.to_string())
            });
        match written {
            Ok(_) => WriteReport {
                status: WriteStatus::Success,
                message: format!("Successfully wrote content to {path}"),
                file_path: path.to_owned(),
            },
            Err(message) => WriteReport {
                status: WriteStatus::Error,
                message: format!("Failed to write file: {message}"),
                file_path: path.to_owned(),
            },
        }
    }

    /// Deletes every cached workspace.
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }
}
