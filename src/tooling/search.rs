use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub path: PathBuf,
    pub line_number: usize,
    pub line: String,
}

/// Case-sensitive substring search across files under `dir`, optionally
/// restricted by extension. Binary-looking files are skipped.
pub fn search_in_files(
    dir: &Path,
    pattern: &str,
    extension: Option<&str>,
) -> Result<Vec<SearchMatch>> {
    let mut matches = Vec::new();
    walk(dir, pattern, extension, &mut matches)?;
    Ok(matches)
}

fn walk(
    dir: &Path,
    pattern: &str,
    extension: Option<&str>,
    matches: &mut Vec<SearchMatch>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| Error::file(dir, e))?;
    let mut paths: Vec<_> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();

    for path in paths {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with('.') || name == "target" || name == "node_modules" {
            continue;
        }

        if path.is_dir() {
            walk(&path, pattern, extension, matches)?;
            continue;
        }

        if let Some(ext) = extension {
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }

        // Non-UTF-8 content is treated as binary and skipped.
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        for (index, line) in content.lines().enumerate() {
            if line.contains(pattern) {
                matches.push(SearchMatch {
                    path: path.clone(),
                    line_number: index + 1,
                    line: line.to_string(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn finds_matches_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("code.rs")).unwrap();
        writeln!(f, "fn main() {{").unwrap();
        writeln!(f, "    let needle = 42;").unwrap();
        writeln!(f, "}}").unwrap();

        let matches = search_in_files(dir.path(), "needle", Some("rs")).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].line_number, 2);
        assert!(matches[0].line.contains("needle"));
    }

    #[test]
    fn extension_filter_excludes_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "needle").unwrap();
        fs::write(dir.path().join("b.rs"), "needle").unwrap();

        let matches = search_in_files(dir.path(), "needle", Some("rs")).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].path.ends_with("b.rs"));
    }
}
