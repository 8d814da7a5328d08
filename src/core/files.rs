//! Local file operations used by the deploy copy.

use glob::MatchOptions;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySummary {
    pub entries: usize,
    pub files_copied: usize,
    pub dirs_created: usize,
}

/// Top-level entries of `source` matched by `source/*`, hidden entries excluded.
pub fn top_level_entries(source: &Path) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&source.to_string_lossy());
    let pattern = Path::new(&escaped).join("*").to_string_lossy().to_string();
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let entries = glob::glob_with(&pattern, options).map_err(|e| {
        Error::validation_invalid_argument(
            "source",
            format!("Invalid glob pattern '{}': {}", pattern, e),
            None,
            None,
        )
    })?;

    let mut paths: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    paths.sort();
    Ok(paths)
}

/// Copy the contents of `source` over `destination`, like `cp -rf source/* destination`.
///
/// Existing files are overwritten; files only present in `destination` are kept.
pub fn copy_contents(source: &Path, destination: &Path) -> Result<CopySummary> {
    if !source.is_dir() {
        return Err(Error::validation_invalid_argument(
            "source",
            format!("Build output not found: {}", source.display()),
            Some(source.display().to_string()),
            None,
        )
        .with_hint("Run the build phase first"));
    }

    let mut summary = CopySummary::default();
    if !destination.exists() {
        create_dir(destination)?;
        summary.dirs_created += 1;
    }

    for entry in top_level_entries(source)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        copy_entry(&entry, &destination.join(name), &mut summary)?;
        summary.entries += 1;
    }

    Ok(summary)
}

fn copy_entry(from: &Path, to: &Path, summary: &mut CopySummary) -> Result<()> {
    let metadata = fs::metadata(from).map_err(|e| io_err(e, "stat", from))?;

    if metadata.is_dir() {
        if to.is_file() {
            fs::remove_file(to).map_err(|e| io_err(e, "replace file", to))?;
        }
        if !to.exists() {
            create_dir(to)?;
            summary.dirs_created += 1;
        }
        let children = fs::read_dir(from).map_err(|e| io_err(e, "read dir", from))?;
        for child in children {
            let child = child.map_err(|e| io_err(e, "read dir", from))?;
            copy_entry(&child.path(), &to.join(child.file_name()), summary)?;
        }
        return Ok(());
    }

    if to.is_dir() {
        return Err(Error::internal_io(
            format!("cannot overwrite directory {} with a file", to.display()),
            Some("copy build output".to_string()),
        ));
    }

    fs::copy(from, to).map_err(|e| io_err(e, "copy", from))?;
    summary.files_copied += 1;
    Ok(())
}

/// Count regular files below `root`.
pub fn count_files(root: &Path) -> usize {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| io_err(e, "create", path))
}

fn io_err(e: std::io::Error, op: &str, path: &Path) -> Error {
    Error::internal_io(e.to_string(), Some(format!("{} {}", op, path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn copy_overwrites_and_keeps_stale_files() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("index.html"), "new index");
        write(&src.path().join("auto_examples/plot.html"), "plot");
        write(&dst.path().join("index.html"), "old index");
        write(&dst.path().join("removed_page.html"), "still here");

        let summary = copy_contents(src.path(), dst.path()).unwrap();

        assert_eq!(fs::read_to_string(dst.path().join("index.html")).unwrap(), "new index");
        assert_eq!(
            fs::read_to_string(dst.path().join("auto_examples/plot.html")).unwrap(),
            "plot"
        );
        assert!(dst.path().join("removed_page.html").exists());
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.files_copied, 2);
    }

    #[test]
    fn top_level_hidden_entries_are_skipped() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join(".buildinfo"), "hash");
        write(&src.path().join("index.html"), "index");
        write(&src.path().join("_static/.keep"), "");

        copy_contents(src.path(), dst.path()).unwrap();

        assert!(!dst.path().join(".buildinfo").exists());
        assert!(dst.path().join("index.html").exists());
        assert!(dst.path().join("_static/.keep").exists());
    }

    #[test]
    fn missing_destination_is_created() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        write(&src.path().join("index.html"), "index");
        let target = dst.path().join("dev");

        let summary = copy_contents(src.path(), &target).unwrap();

        assert!(target.join("index.html").exists());
        assert_eq!(summary.dirs_created, 1);
    }

    #[test]
    fn missing_source_is_an_error() {
        let dst = TempDir::new().unwrap();
        let err = copy_contents(&dst.path().join("nope"), dst.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn count_files_recurses() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("a.html"), "");
        write(&dir.path().join("x/b.html"), "");
        write(&dir.path().join("x/y/c.html"), "");
        assert_eq!(count_files(dir.path()), 3);
    }
}
