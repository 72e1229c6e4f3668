//! Model artifact retrieval and verification
//!
//! Each trained model lives at a configured local path. When the file is
//! missing and a download URL is configured, it is fetched once at startup.
//! An optional SHA-256 checksum is verified before the file is used.

use crate::error::{Result, ScoreError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound on downloaded artifact size (256MB)
pub const MAX_ARTIFACT_BYTES: usize = 256 * 1024 * 1024;

/// Where a model artifact lives and how to obtain it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSource {
    /// Local file path
    pub path: PathBuf,
    /// Download URL used when the local file is missing
    #[serde(default)]
    pub url: Option<String>,
    /// Expected hex-encoded SHA-256 of the file
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ArtifactSource {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: None,
            sha256: None,
        }
    }
}

/// A verified artifact on local disk
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub checksum: String,
    pub size_bytes: usize,
    pub downloaded: bool,
}

/// Fetches and verifies model artifacts
pub struct ArtifactStore {
    client: Client,
    max_bytes: usize,
}

impl ArtifactStore {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoreError::model_load("artifact", format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_bytes: MAX_ARTIFACT_BYTES,
        })
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Make sure the artifact exists locally and matches its checksum
    pub async fn ensure_local(&self, name: &str, source: &ArtifactSource) -> Result<LoadedArtifact> {
        let downloaded = if source.path.exists() {
            false
        } else {
            let url = source.url.as_deref().ok_or_else(|| {
                ScoreError::model_load(
                    name,
                    format!("{} does not exist and no download URL is configured", source.path.display()),
                )
            })?;
            let bytes = self.download(name, url).await?;
            if let Some(expected) = &source.sha256 {
                verify_checksum(name, &bytes, expected)?;
            }
            save_artifact(name, &source.path, &bytes)?;
            true
        };

        let bytes = fs::read(&source.path).map_err(|e| {
            ScoreError::model_load(name, format!("cannot read {}: {}", source.path.display(), e))
        })?;
        let checksum = match &source.sha256 {
            Some(expected) => verify_checksum(name, &bytes, expected)?,
            None => compute_checksum(&bytes),
        };

        info!(
            artifact = %name,
            path = %source.path.display(),
            checksum = %checksum,
            downloaded = downloaded,
            "Model artifact ready"
        );

        Ok(LoadedArtifact {
            name: name.to_string(),
            path: source.path.clone(),
            checksum,
            size_bytes: bytes.len(),
            downloaded,
        })
    }

    async fn download(&self, name: &str, url: &str) -> Result<Vec<u8>> {
        info!(artifact = %name, url = %url, "Downloading model artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoreError::model_load(name, format!("download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ScoreError::model_load(
                name,
                format!("download returned {}", response.status()),
            ));
        }

        let too_large = |size: usize| {
            ScoreError::model_load(
                name,
                format!("artifact size {} exceeds maximum {}", size, self.max_bytes),
            )
        };

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(too_large(length as usize));
            }
        }

        let mut response = response;
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScoreError::model_load(name, format!("download interrupted: {}", e)))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large(bytes.len() + chunk.len()));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn verify_checksum(name: &str, data: &[u8], expected: &str) -> Result<String> {
    let computed = compute_checksum(data);
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        warn!(artifact = %name, expected = %expected, computed = %computed, "Checksum mismatch");
        return Err(ScoreError::model_load(
            name,
            format!("checksum mismatch: expected {}, got {}", expected, computed),
        ));
    }
    Ok(computed)
}

/// Write to a temp file first, then rename into place
fn save_artifact(name: &str, path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            ScoreError::model_load(name, format!("cannot create {}: {}", parent.display(), e))
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let write = || -> std::io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ScoreError::model_load(name, format!("cannot save {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> ArtifactStore {
        ArtifactStore::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"test model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"test model weights"));
        assert_ne!(checksum, compute_checksum(b"other weights"));
    }

    #[tokio::test]
    async fn test_existing_file_used_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classifier.onnx");
        fs::write(&path, b"weights").unwrap();

        let loaded = store()
            .ensure_local("classifier", &ArtifactSource::local(&path))
            .await
            .unwrap();
        assert!(!loaded.downloaded);
        assert_eq!(loaded.size_bytes, 7);
        assert_eq!(loaded.checksum, compute_checksum(b"weights"));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regressor.onnx");
        fs::write(&path, b"weights").unwrap();

        let source = ArtifactSource {
            path,
            url: None,
            sha256: Some(compute_checksum(b"different")),
        };
        let err = store().ensure_local("regressor", &source).await.unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[tokio::test]
    async fn test_missing_file_without_url_is_model_load_error() {
        let dir = TempDir::new().unwrap();
        let source = ArtifactSource::local(dir.path().join("missing.onnx"));
        let err = store().ensure_local("classifier", &source).await.unwrap_err();
        assert!(matches!(err, ScoreError::ModelLoad { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_downloaded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/models/classifier.onnx")
            .with_status(200)
            .with_body("remote weights")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("classifier.onnx");
        let source = ArtifactSource {
            path: path.clone(),
            url: Some(format!("{}/models/classifier.onnx", server.url())),
            sha256: Some(compute_checksum(b"remote weights")),
        };

        let loaded = store().ensure_local("classifier", &source).await.unwrap();
        mock.assert_async().await;
        assert!(loaded.downloaded);
        assert_eq!(fs::read(&path).unwrap(), b"remote weights");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_download_not_saved() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/regressor.onnx")
            .with_status(200)
            .with_body("tampered")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("regressor.onnx");
        let source = ArtifactSource {
            path: path.clone(),
            url: Some(format!("{}/regressor.onnx", server.url())),
            sha256: Some(compute_checksum(b"original")),
        };

        assert!(store().ensure_local("regressor", &source).await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_download_is_model_load_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.onnx")
            .with_status(404)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let source = ArtifactSource {
            path: dir.path().join("gone.onnx"),
            url: Some(format!("{}/gone.onnx", server.url())),
            sha256: None,
        };
        let err = store().ensure_local("classifier", &source).await.unwrap_err();
        assert!(matches!(err, ScoreError::ModelLoad { .. }));
    }

    #[tokio::test]
    async fn test_oversized_download_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/big.onnx")
            .with_status(200)
            .with_body(vec![0u8; 64])
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.onnx");
        let source = ArtifactSource {
            path: path.clone(),
            url: Some(format!("{}/big.onnx", server.url())),
            sha256: None,
        };

        let err = store()
            .with_max_bytes(16)
            .ensure_local("classifier", &source)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_save_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail
        let path = dir.path().join("classifier.onnx");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), b"x").unwrap();

        let err = save_artifact("classifier", &path, b"weights").unwrap_err();
        assert!(matches!(err, ScoreError::ModelLoad { .. }));
        assert!(!path.with_extension("tmp").exists());
    }
}
