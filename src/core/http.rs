//! Blocking HTTP download of installer scripts.

use reqwest::blocking::Client;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::io;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Download `url` to `destination`, replacing any previous file. Returns the byte count.
pub fn download_to(url: &str, destination: &Path) -> Result<u64> {
    let fail = |e: &dyn std::fmt::Display| Error::download_failed(url, destination.display().to_string(), e);

    let client = Client::builder()
        .user_agent(format!("devdocs/{}", VERSION))
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

    let mut response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| fail(&e))?;

    if let Some(parent) = destination.parent() {
        io::ensure_dir(parent)?;
    }

    let mut file = File::create(destination).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create {}", destination.display())))
    })?;

    let bytes = response.copy_to(&mut file).map_err(|e| fail(&e))?;
    tracing::debug!(url, bytes, destination = %destination.display(), "download complete");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_to("http://127.0.0.1:9/miniconda.sh", &dir.path().join("m.sh")).unwrap_err();
        assert_eq!(err.code.as_str(), "download.failed");
        assert_eq!(err.retryable, Some(true));
    }

    #[test]
    fn invalid_url_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = download_to("not a url", &dir.path().join("m.sh")).unwrap_err();
        assert_eq!(err.code.as_str(), "download.failed");
    }
}
