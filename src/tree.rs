use std::{
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use thiserror::Error;

/// Entries whose names start with this prefix are never shown.
pub const METADATA_PREFIX: &str = ".git";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const GUIDE: &str = "│   ";
const BLANK: &str = "    ";

#[derive(Error, Debug)]
#[error("Cannot list directory {path}: {source}")]
pub struct TreeError {
    path: String,
    source: std::io::Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// A directory whose contents could not be listed.
    Unreadable(String),
}

/// One line of the tree, in pre-order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Last visible entry of its directory.
    pub last: bool,
    /// For every ancestor level, whether that ancestor has later siblings.
    pub guides: Vec<bool>,
}

struct Child {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

struct Frame {
    children: std::vec::IntoIter<Child>,
    guides: Vec<bool>,
}

/// Walks `root` depth-first without recursion.
///
/// Only a failure to list `root` itself is an error. A subdirectory that
/// cannot be listed becomes an [`EntryKind::Unreadable`] entry and the walk
/// moves on to its next sibling. Symbolic links are reported as files and
/// never followed.
pub fn walk(root: &Path) -> Result<Vec<TreeEntry>, TreeError> {
    let mut entries = Vec::new();
    let mut stack = vec![Frame {
        children: list(root)?.into_iter(),
        guides: Vec::new(),
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(child) = frame.children.next() else {
            stack.pop();
            continue;
        };
        let last = frame.children.len() == 0;
        let guides = frame.guides.clone();

        if !child.is_dir {
            entries.push(TreeEntry {
                name: child.name,
                kind: EntryKind::File,
                last,
                guides,
            });
            continue;
        }

        match list(&child.path) {
            Ok(children) => {
                let mut nested = guides.clone();
                nested.push(!last);
                entries.push(TreeEntry {
                    name: child.name,
                    kind: EntryKind::Directory,
                    last,
                    guides,
                });
                stack.push(Frame {
                    children: children.into_iter(),
                    guides: nested,
                });
            }
            Err(error) => {
                warn!("{}", error);
                entries.push(TreeEntry {
                    name: child.name,
                    kind: EntryKind::Unreadable(error.source.to_string()),
                    last,
                    guides,
                });
            }
        }
    }

    Ok(entries)
}

/// Formats entries produced by [`walk`], one line per entry.
pub fn render(entries: &[TreeEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        for &continues in &entry.guides {
            output.push_str(if continues { GUIDE } else { BLANK });
        }
        output.push_str(if entry.last { LAST_BRANCH } else { BRANCH });
        output.push_str(&entry.name);
        if let EntryKind::Unreadable(reason) = &entry.kind {
            output.push_str(" [unreadable: ");
            output.push_str(reason);
            output.push(']');
        }
        output.push('\n');
    }
    output
}

pub fn directory_tree(root: &Path) -> Result<String, TreeError> {
    Ok(render(&walk(root)?))
}

/// Visible entries of `path`, sorted by name.
fn list(path: &Path) -> Result<Vec<Child>, TreeError> {
    let wrap = |source: std::io::Error| TreeError {
        path: path.display().to_string(),
        source,
    };
    let mut children = Vec::new();
    for entry in fs::read_dir(path).map_err(wrap)? {
        let entry = entry.map_err(wrap)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(METADATA_PREFIX) {
            continue;
        }
        children.push(Child {
            name,
            path: entry.path(),
            is_dir: entry.file_type().map_err(wrap)?.is_dir(),
        });
    }
    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".gitignore"), "target\n").unwrap();
        fs::write(root.join("README.md"), "readme").unwrap();
        fs::write(root.join("Cargo.toml"), "").unwrap();
        fs::create_dir_all(root.join("src/bin")).unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("src/bin/tool.rs"), "").unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("tests/it.rs"), "").unwrap();
        dir
    }

    #[test]
    fn renders_nested_tree() {
        let dir = fixture();
        let expected = "\
├── Cargo.toml
├── README.md
├── src
│   ├── bin
│   │   └── tool.rs
│   └── lib.rs
└── tests
    └── it.rs
";
        assert_eq!(directory_tree(dir.path()).unwrap(), expected);
    }

    #[test]
    fn output_is_stable() {
        let dir = fixture();
        assert_eq!(
            directory_tree(dir.path()).unwrap(),
            directory_tree(dir.path()).unwrap()
        );
    }

    #[test]
    fn metadata_entries_are_hidden_at_every_level() {
        let dir = fixture();
        fs::write(dir.path().join("src/.gitkeep"), "").unwrap();
        let entries = walk(dir.path()).unwrap();
        assert!(entries.iter().all(|e| !e.name.starts_with(".git")));
    }

    #[test]
    fn siblings_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b", "a", "C", "_x", "a0"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let names: Vec<String> = walk(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["C", "_x", "a", "a0", "b"]);
    }

    #[test]
    fn structured_entries() {
        let dir = fixture();
        let entries = walk(dir.path()).unwrap();
        let bin = entries.iter().find(|e| e.name == "bin").unwrap();
        assert_eq!(bin.kind, EntryKind::Directory);
        assert_eq!(bin.guides, vec![true]);
        assert!(!bin.last);
        let tool = entries.iter().find(|e| e.name == "tool.rs").unwrap();
        assert_eq!(tool.guides, vec![true, true]);
        assert!(tool.last);
    }

    #[test]
    fn empty_directory_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(directory_tree(dir.path()).unwrap(), "");
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = directory_tree(&dir.path().join("missing")).unwrap_err();
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn unreadable_entry_renders_reason() {
        let entries = vec![
            TreeEntry {
                name: "locked".to_owned(),
                kind: EntryKind::Unreadable("Permission denied".to_owned()),
                last: false,
                guides: vec![],
            },
            TreeEntry {
                name: "open".to_owned(),
                kind: EntryKind::File,
                last: true,
                guides: vec![],
            },
        ];
        assert_eq!(
            render(&entries),
            "├── locked [unreadable: Permission denied]\n└── open\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_marked() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("a_locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), "").unwrap();
        fs::create_dir(dir.path().join("b_open")).unwrap();
        fs::write(dir.path().join("b_open/seen.txt"), "").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let restore = || {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        };
        if fs::read_dir(&locked).is_ok() {
            // Permission bits do not stop this user (root), nothing to observe.
            restore();
            return;
        }

        let walked = walk(dir.path());
        let rendered = walked.as_ref().map(|entries| render(entries));
        restore();
        let entries = walked.as_ref().unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a_locked", "b_open", "seen.txt"]);
        assert!(matches!(entries[0].kind, EntryKind::Unreadable(_)));
        assert!(!entries[0].last);
        assert_eq!(entries[1].kind, EntryKind::Directory);
        assert!(entries[1].last);
        let rendered = rendered.unwrap();
        assert!(
            rendered.starts_with("├── a_locked [unreadable: "),
            "{rendered}"
        );
        assert!(
            rendered.ends_with("└── b_open\n    └── seen.txt\n"),
            "{rendered}"
        );
    }
}
