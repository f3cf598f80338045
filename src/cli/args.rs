use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cached local workspaces for remote git repositories.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub cmd: Command,
    /// Directory holding cached workspaces [default: system temp directory]
    #[arg(short, long, global = true)]
    pub cache_directory: Option<PathBuf>,
    /// Abort a clone that stalls for, or runs longer than, this many seconds
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prints the directory tree of a repository
    Tree { locator: String },
    /// Prints the contents of files as a JSON object keyed by path
    Read {
        locator: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Writes a file, reading the content from stdin unless --content is given
    Write {
        locator: String,
        path: String,
        #[arg(long)]
        content: Option<String>,
        /// First line to replace (1-based)
        #[arg(long, requires = "end")]
        start: Option<usize>,
        /// Last line to replace (inclusive)
        #[arg(long, requires = "start")]
        end: Option<usize>,
    },
    /// Prints the local workspace path of a repository
    Resolve { locator: String },
    /// Deletes all cached workspaces
    ClearCache,
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn line_range_needs_both_ends() {
        assert!(CliArgs::try_parse_from(["repofetch", "write", "repo", "f.txt", "--start", "2"])
            .is_err());
        let args = CliArgs::try_parse_from([
            "repofetch", "write", "repo", "f.txt", "--start", "2", "--end", "3",
        ])
        .unwrap();
        assert!(matches!(
            args.cmd,
            Command::Write {
                start: Some(2),
                end: Some(3),
                ..
            }
        ));
    }
}
