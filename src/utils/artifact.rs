//! Artifact path expansion with glob pattern support.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Expand an artifact path relative to `base`.
///
/// - Paths without glob chars (`*`, `?`, `[`, `]`) come back as-is, existing or not
/// - Glob patterns expand to their sorted matches, possibly none
pub fn expand_artifact_path(base: &Path, pattern: &Path) -> Result<Vec<PathBuf>> {
    let full = if pattern.is_absolute() {
        pattern.to_path_buf()
    } else {
        base.join(pattern)
    };
    let raw = full.to_string_lossy();

    if !contains_glob_chars(&raw) {
        return Ok(vec![full]);
    }

    let mut entries: Vec<PathBuf> = glob::glob(&raw)
        .map_err(|e| {
            Error::validation_invalid_argument(
                "artifacts",
                format!("Invalid glob pattern '{}': {}", raw, e),
                Some(raw.to_string()),
                None,
            )
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    entries.sort();
    Ok(entries)
}

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn literal_path_is_returned_even_when_missing() {
        let dir = TempDir::new().unwrap();
        let paths = expand_artifact_path(dir.path(), Path::new("doc/_build/html")).unwrap();
        assert_eq!(paths, vec![dir.path().join("doc/_build/html")]);
    }

    #[test]
    fn glob_expands_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("out/b")).unwrap();
        fs::create_dir_all(dir.path().join("out/a")).unwrap();

        let paths = expand_artifact_path(dir.path(), Path::new("out/*")).unwrap();
        assert_eq!(paths, vec![dir.path().join("out/a"), dir.path().join("out/b")]);
    }

    #[test]
    fn glob_without_matches_is_empty() {
        let dir = TempDir::new().unwrap();
        let paths = expand_artifact_path(dir.path(), Path::new("*.zip")).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = expand_artifact_path(dir.path(), Path::new("[")).unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
