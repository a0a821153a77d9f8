//! Byte retrieval for named dataset files.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Storage returned status {status} for '{name}'")]
    Status { status: u16, name: String },

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// Anything that can hand back the raw bytes of a named file.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, FetchError>;
}

/// Names must be relative and must not climb out of their root.
fn validate_name(name: &str) -> Result<&Path, FetchError> {
    let path = Path::new(name);
    let plain = !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(path)
    } else {
        Err(FetchError::InvalidName(name.to_string()))
    }
}

/// Reads files from a local directory.
pub struct LocalFileSource {
    dir: PathBuf,
}

impl LocalFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.dir.join(validate_name(name)?);
        debug!(path = %path.display(), "Reading dataset file");
        Ok(tokio::fs::read(&path).await?)
    }
}

/// Fetches files from a storage bucket exposed over plain HTTP GET.
pub struct HttpFileSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFileSource {
    /// # Arguments
    /// * `base_url` - Bucket URL, files are fetched from `{base_url}/{name}`
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: impl Into<String>, timeout_sec: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl FileSource for HttpFileSource {
    async fn fetch(&self, name: &str) -> Result<Vec<u8>, FetchError> {
        validate_name(name)?;
        let url = format!("{}/{}", self.base_url, name);
        debug!(url = %url, "Fetching dataset file");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                name: name.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("100_items.csv").is_ok());
        assert!(validate_name("train/100_items.csv").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../secrets.csv").is_err());
        assert!(validate_name("train/../../x.csv").is_err());
        assert!(validate_name("/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_local_source_reads_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("data.csv"), b"a,b\n1,2\n").unwrap();

        let source = LocalFileSource::new(dir.path());
        let bytes = source.fetch("data.csv").await.unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_local_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = LocalFileSource::new(dir.path());
        let err = source.fetch("missing.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[tokio::test]
    async fn test_local_source_rejects_escaping_names() {
        let dir = TempDir::new().unwrap();
        let source = LocalFileSource::new(dir.path());
        let err = source.fetch("../outside.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_http_source_connection_failure() {
        // Nothing listens on port 9 on loopback.
        let source = HttpFileSource::new("http://127.0.0.1:9/", 2).unwrap();
        let err = source.fetch("data.csv").await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }
}
