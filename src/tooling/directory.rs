use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DirectoryItem {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub children: Vec<DirectoryItem>,
}

/// Build a directory tree up to `max_depth`, skipping dotfiles and build
/// output directories.
pub fn structure(path: &Path, max_depth: usize) -> Result<Vec<DirectoryItem>> {
    if max_depth == 0 {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let entries = fs::read_dir(path).map_err(|e| Error::file(path, e))?;

    let mut names: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.starts_with('.') && name != "target" && name != "node_modules"
        })
        .collect();
    names.sort();

    for entry_path in names {
        let name = entry_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let metadata = fs::metadata(&entry_path).map_err(|e| Error::file(&entry_path, e))?;

        if metadata.is_dir() {
            items.push(DirectoryItem {
                name,
                is_dir: true,
                size: None,
                children: structure(&entry_path, max_depth - 1)?,
            });
        } else {
            items.push(DirectoryItem {
                name,
                is_dir: false,
                size: Some(metadata.len()),
                children: Vec::new(),
            });
        }
    }

    Ok(items)
}

/// Render a tree with box-drawing prefixes, `tree`-style.
pub fn tree(path: &Path, max_depth: usize) -> Result<String> {
    let items = structure(path, max_depth)?;
    Ok(format_tree(&items, ""))
}

fn format_tree(items: &[DirectoryItem], indent: &str) -> String {
    let mut out = String::new();
    for (index, item) in items.iter().enumerate() {
        let is_last = index == items.len() - 1;
        let prefix = if is_last { "└── " } else { "├── " };
        let next_indent = format!("{indent}{}", if is_last { "    " } else { "│   " });

        out.push_str(indent);
        out.push_str(prefix);
        out.push_str(&item.name);
        if let Some(size) = item.size {
            out.push_str(&format!(" ({size} bytes)"));
        }
        out.push('\n');

        if !item.children.is_empty() {
            out.push_str(&format_tree(&item.children, &next_indent));
        }
    }
    out
}
