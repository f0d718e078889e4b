use std::path::Path;

use tokio::fs;

use crate::error::{Error, Result};

pub async fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| Error::file(path, e))
}

/// Write text to a file, creating parent directories as needed.
pub async fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::file(path, e))?;
        }
    }
    fs::write(path, contents)
        .await
        .map_err(|e| Error::file(path, e))
}

/// List plain files in a directory, optionally filtered by extension
/// (without the leading dot). Sorted for stable output.
pub async fn list_files(dir: &Path, extension: Option<&str>) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| Error::file(dir, e))?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::file(dir, e))? {
        let file_type = entry.file_type().await.map_err(|e| Error::file(dir, e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(ext) = extension {
            if entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("note.txt");
        let content = "line one\nline two\n";

        write_string(&path, content).await.unwrap();
        let read_back = read_to_string(&path).await.unwrap();
        assert_eq!(read_back, content);
    }

    #[tokio::test]
    async fn read_failure_names_the_path() {
        let err = read_to_string(Path::new("/no/such/file.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/no/such/file.txt"));
    }

    #[tokio::test]
    async fn list_files_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_string(&dir.path().join("a.rs"), "").await.unwrap();
        write_string(&dir.path().join("b.txt"), "").await.unwrap();
        write_string(&dir.path().join("c.rs"), "").await.unwrap();

        let rust_files = list_files(dir.path(), Some("rs")).await.unwrap();
        assert_eq!(rust_files, vec!["a.rs", "c.rs"]);

        let all = list_files(dir.path(), None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
