use std::io::Read;

use log::info;

use crate::{files::LineRange, Repofetch};

/// Handler to tree command
pub fn do_tree(repofetch: &Repofetch, locator: &str) -> anyhow::Result<()> {
    let tree = repofetch.directory_structure(locator);
    print!("{tree}");
    if tree.starts_with("Error: ") {
        anyhow::bail!("Could not render the tree of {}", locator);
    }
    Ok(())
}

/// Handler to read command
pub fn do_read(repofetch: &Repofetch, locator: &str, paths: &[String]) -> anyhow::Result<()> {
    let contents = repofetch.read_files(locator, paths);
    println!("{}", serde_json::to_string_pretty(&contents)?);
    Ok(())
}

/// Handler to write command
/// Content comes from `content` when given, otherwise from stdin
pub fn do_write(
    repofetch: &Repofetch,
    locator: &str,
    path: &str,
    content: Option<String>,
    range: Option<LineRange>,
) -> anyhow::Result<()> {
    let content = match content {
        Some(content) => content,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let report = repofetch.write_file(locator, path, &content, range);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        anyhow::bail!("{}", report.message);
    }
    Ok(())
}

/// Handler to resolve command
pub fn do_resolve(repofetch: &Repofetch, locator: &str) -> anyhow::Result<()> {
    let workspace = repofetch.resolve(locator)?;
    println!("{}", workspace.path().display());
    Ok(())
}

pub fn do_clear_cache(repofetch: &Repofetch) -> anyhow::Result<()> {
    repofetch.clear_cache()?;
    info!("Cleared workspace cache {}", repofetch.cache().root().display());
    Ok(())
}
