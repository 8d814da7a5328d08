//! Existence reports for build artifacts and cache directories.

use serde::Serialize;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::files;
use crate::paths;
use crate::utils::artifact;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathReport {
    /// As configured.
    pub entry: String,
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
}

fn report(entry: &str, path: &Path, count: bool) -> PathReport {
    let exists = path.exists();
    PathReport {
        entry: entry.to_string(),
        path: paths::display(path),
        exists,
        files: (count && exists).then(|| files::count_files(path)),
    }
}

/// Configured artifact paths with their file counts. A glob entry
/// matching nothing is reported once as missing.
pub fn artifact_report(config: &PipelineConfig, workdir: &Path) -> Result<Vec<PathReport>> {
    let mut reports = Vec::new();
    for entry in &config.artifacts {
        let expanded = paths::expand(entry)?;
        let matches = artifact::expand_artifact_path(workdir, &expanded)?;
        if matches.is_empty() {
            reports.push(report(entry, &workdir.join(&expanded), false));
            continue;
        }
        reports.extend(matches.iter().map(|path| report(entry, path, true)));
    }
    Ok(reports)
}

/// Whether each configured cache directory exists.
pub fn cache_report(config: &PipelineConfig, workdir: &Path) -> Result<Vec<PathReport>> {
    config
        .cache_directories
        .iter()
        .map(|entry| Ok(report(entry, &paths::resolve(workdir, entry)?, false)))
        .collect()
}
