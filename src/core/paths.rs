use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "devdocs.yml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "DEVDOCS_CONFIG";

/// Expand `~` and `$VAR` references in a configured path.
pub fn expand(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|e| {
        Error::config_invalid_value("path", Some(raw.to_string()), e.to_string())
    })?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Expand a path and resolve it against `base` when it is relative.
pub fn resolve(base: &Path, raw: &str) -> Result<PathBuf> {
    let expanded = expand(raw)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

/// Config file path: explicit argument, then `DEVDOCS_CONFIG`, then `./devdocs.yml`.
pub fn config_file(explicit: Option<&str>, workdir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
        return resolve(workdir, path);
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return resolve(workdir, &path);
        }
    }

    Ok(workdir.join(CONFIG_FILE_NAME))
}

pub fn display(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_absolute_paths() {
        let resolved = resolve(Path::new("/work"), "/opt/miniconda").unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/miniconda"));
    }

    #[test]
    fn resolve_joins_relative_paths() {
        let resolved = resolve(Path::new("/work"), "doc/_build/html").unwrap();
        assert_eq!(resolved, PathBuf::from("/work/doc/_build/html"));
    }

    #[cfg(unix)]
    #[test]
    fn expand_tilde_uses_home() {
        let home = PathBuf::from(env::var("HOME").unwrap());
        assert_eq!(expand("~/mne_data").unwrap(), home.join("mne_data"));
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = config_file(Some("ci/pipeline.yml"), Path::new("/work")).unwrap();
        assert_eq!(path, PathBuf::from("/work/ci/pipeline.yml"));
    }
}
