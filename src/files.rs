use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FILE_NOT_FOUND: &str = "Error: File not found";
pub const PATH_ESCAPES: &str = "Error: path escapes the workspace";

#[derive(Error, Debug)]
pub enum FileError {
    #[error("path {path} escapes the workspace")]
    OutsideWorkspace { path: String },
    #[error("{path} does not exist, line edits need an existing file")]
    MissingTarget { path: String },
    #[error("cannot create directory {path}: {source}")]
    CreateDirectory {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Inclusive, 1-based range of lines to replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> LineRange {
        LineRange { start, end }
    }

    /// Zero-based `start..end` slice bounds for a file of `len` lines.
    fn clamp(self, len: usize) -> (usize, usize) {
        let start = self.start.saturating_sub(1).min(len);
        let end = self.end.min(len).max(start);
        (start, end)
    }
}

/// Joins `relative` onto `workspace`, refusing anything that could leave it.
pub fn workspace_path(workspace: &Path, relative: &str) -> Result<PathBuf, FileError> {
    let escapes = Path::new(relative).components().any(|component| {
        matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(FileError::OutsideWorkspace {
            path: relative.to_owned(),
        });
    }
    Ok(workspace.join(relative))
}

/// Reads every path in `paths`, keyed by the path as given.
///
/// A path that cannot be served gets an `"Error: ..."` value; the other
/// paths are unaffected.
pub fn read_many<S: AsRef<str>>(workspace: &Path, paths: &[S]) -> BTreeMap<String, String> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            (path.to_owned(), read_entry(workspace, path))
        })
        .collect()
}

fn read_entry(workspace: &Path, relative: &str) -> String {
    let full_path = match workspace_path(workspace, relative) {
        Ok(full_path) => full_path,
        Err(error) => {
            debug!("Refusing to read: {}", error);
            return PATH_ESCAPES.to_owned();
        }
    };
    if !full_path.is_file() {
        trace!("{} is not a file", full_path.display());
        return FILE_NOT_FOUND.to_owned();
    }
    match std::fs::read_to_string(&full_path) {
        Ok(content) => content,
        Err(error) => format!("Error: failed to read file: {error}"),
    }
}

/// Writes `content` to `relative` inside `workspace` and returns the full path.
///
/// Without a range the file is replaced, and missing parent directories are
/// created. With a range, lines `start..=end` of the existing file are
/// replaced by the lines of `content`. Lines end at `\n`, `\r\n` or a lone
/// `\r`, and every line of the result ends in `\n`.
pub fn write_file(
    workspace: &Path,
    relative: &str,
    content: &str,
    range: Option<LineRange>,
) -> Result<PathBuf, FileError> {
    let full_path = workspace_path(workspace, relative)?;
    let display = || full_path.display().to_string();

    let output = match range {
        None => {
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    FileError::CreateDirectory {
                        path: parent.display().to_string(),
                        source,
                    }
                })?;
            }
            content.to_owned()
        }
        Some(range) => {
            if !full_path.is_file() {
                return Err(FileError::MissingTarget { path: display() });
            }
            let existing =
                std::fs::read_to_string(&full_path).map_err(|source| FileError::Read {
                    path: display(),
                    source,
                })?;
            splice_lines(&existing, content, range)
        }
    };

    std::fs::write(&full_path, output).map_err(|source| FileError::Write {
        path: display(),
        source,
    })?;
    debug!("Wrote {}", full_path.display());
    Ok(full_path)
}

fn splice_lines(existing: &str, content: &str, range: LineRange) -> String {
    let mut lines = split_lines(existing);
    let (start, end) = range.clamp(lines.len());
    lines.splice(start..end, split_lines(content));

    let mut output = String::with_capacity(existing.len() + content.len());
    for line in lines {
        output.push_str(line);
        output.push('\n');
    }
    output
}

/// Like [`str::lines`], but a lone `\r` also ends a line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(at) = rest.find(['\r', '\n']) {
        lines.push(&rest[..at]);
        let terminator = if rest[at..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[at + terminator..];
    }
    if !rest.is_empty() {
        lines.push(rest);
    }
    lines
}
