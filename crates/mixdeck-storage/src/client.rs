//! R2 client implementation.
//!
//! Object bytes move over short-lived presigned URLs; the S3 API is used
//! directly only for metadata calls (head, delete).

use std::path::{Path, PathBuf};
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::reference::KeyResolver;
use crate::upload::{generate_key, normalize_mime, validate_upload, UploadFile, UploadOptions, UploadedObject};

/// Configured S3 API handle.
#[derive(Clone)]
struct Remote {
    client: Client,
    bucket: String,
}

/// Object storage client for Cloudflare R2 (any S3-compatible store works).
#[derive(Clone)]
pub struct ObjectStorageClient {
    remote: Option<Remote>,
    http: reqwest::Client,
    resolver: KeyResolver,
    config: StorageConfig,
}

impl ObjectStorageClient {
    /// Create a client from configuration.
    ///
    /// Incomplete credentials produce an unconfigured client rather than an
    /// error, so the host application can start without storage.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let remote = match (
            &config.endpoint_url,
            &config.access_key_id,
            &config.secret_access_key,
            &config.bucket_name,
        ) {
            (Some(endpoint), Some(access_key), Some(secret_key), Some(bucket)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "r2");

                let sdk_config = Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .endpoint_url(endpoint)
                    .region(Region::new(config.region.clone()))
                    .credentials_provider(credentials)
                    .force_path_style(true)
                    .build();

                Some(Remote {
                    client: Client::from_conf(sdk_config),
                    bucket: bucket.clone(),
                })
            }
            _ => {
                warn!(
                    missing = ?config.missing_settings(),
                    "Object storage is not configured; remote operations are disabled"
                );
                None
            }
        };

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| StorageError::not_configured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            remote,
            http,
            resolver: KeyResolver::from_config(&config),
            config,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env())
    }

    /// True only when endpoint, credentials and bucket are all present.
    pub fn is_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Public URL for a key.
    pub fn public_url(&self, key: &str) -> String {
        self.resolver.public_url(key)
    }

    /// Resolve the key a stored URL points to.
    pub fn resolve_key(&self, url: &str) -> StorageResult<String> {
        self.resolver.resolve_key(url)
    }

    fn remote(&self) -> StorageResult<&Remote> {
        self.remote.as_ref().ok_or_else(|| {
            StorageError::not_configured(format!(
                "missing {}",
                self.config.missing_settings().join(", ")
            ))
        })
    }

    /// Validate and upload a client file.
    pub async fn upload(
        &self,
        file: UploadFile,
        options: &UploadOptions,
    ) -> StorageResult<UploadedObject> {
        self.remote()?;

        let max_size = options.max_size.unwrap_or(self.config.max_upload_bytes);
        validate_upload(&file, max_size)?;

        let mime_type = normalize_mime(&file.mime_type);
        let (key, filename) = generate_key(&options.folder, &file.original_name, &mime_type);
        let size = file.size();

        debug!(key = %key, size, "Uploading object");

        let signed_url = self.presign_put(&key, &mime_type).await?;
        let response = self
            .http
            .put(&signed_url)
            .header(CONTENT_TYPE, &mime_type)
            .header(CONTENT_LENGTH, size)
            .body(file.bytes)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        check_upload_status(&key, response.status())?;

        info!(key = %key, size, "Uploaded object");

        Ok(UploadedObject {
            url: self.public_url(&key),
            filename,
            key,
            mime_type,
            size,
        })
    }

    /// Upload a local file under an explicit key. Returns the public URL.
    pub async fn upload_path(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        self.remote()?;

        let size = tokio::fs::metadata(path).await?.len();
        let file = tokio::fs::File::open(path).await?;

        debug!("Uploading {} to {}", path.display(), key);

        let signed_url = self.presign_put(key, content_type).await?;
        let response = self
            .http
            .put(&signed_url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))?;

        check_upload_status(key, response.status())?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(self.public_url(key))
    }

    /// Download the object a URL refers to into the default scratch directory.
    pub async fn download(&self, url: &str) -> StorageResult<PathBuf> {
        let scratch_dir = self.config.scratch_dir.clone();
        self.download_to(url, &scratch_dir).await
    }

    /// Download the object a URL refers to into `dest_dir`.
    ///
    /// Returns the path of the written file. A partially written file is
    /// removed on failure.
    pub async fn download_to(&self, url: &str, dest_dir: &Path) -> StorageResult<PathBuf> {
        self.remote()?;
        let key = self.resolve_key(url)?;

        let signed_url = self.presign_get(&key, self.config.signed_url_ttl).await?;

        tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
            StorageError::download_failed(format!("Failed to create directory: {}", e))
        })?;
        let dest = dest_dir.join(scratch_file_name(&key));

        debug!("Downloading {} to {}", key, dest.display());

        let response = self
            .http
            .get(&signed_url)
            .send()
            .await
            .map_err(|e| StorageError::download_failed(format!("{}: {}", key, e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(StorageError::not_found(key)),
            status => {
                return Err(StorageError::download_failed(format!(
                    "{}: HTTP {}",
                    key, status
                )))
            }
        }

        if let Err(e) = write_body(response, &dest).await {
            if let Err(cleanup) = tokio::fs::remove_file(&dest).await {
                debug!("Failed to remove partial download {}: {}", dest.display(), cleanup);
            }
            return Err(e);
        }

        info!("Downloaded {} to {}", key, dest.display());
        Ok(dest)
    }

    /// Generate a presigned URL for GET.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let remote = self.remote()?;
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = remote
            .client
            .get_object()
            .bucket(&remote.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Generate a presigned URL for PUT with a fixed content type.
    pub async fn presign_put(&self, key: &str, content_type: &str) -> StorageResult<String> {
        let remote = self.remote()?;
        let presign_config = PresigningConfig::expires_in(self.config.signed_url_ttl)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = remote
            .client
            .put_object()
            .bucket(&remote.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Delete an object. Returns false when unconfigured or on failure.
    pub async fn delete(&self, key: &str) -> bool {
        let Ok(remote) = self.remote() else {
            debug!(key, "Skipping delete: storage not configured");
            return false;
        };

        match remote
            .client
            .delete_object()
            .bucket(&remote.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {
                debug!("Deleted {}", key);
                true
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", key, StorageError::delete_failed(e.to_string()));
                false
            }
        }
    }

    /// Check if an object exists. Returns false when unconfigured or on failure.
    pub async fn exists(&self, key: &str) -> bool {
        let Ok(remote) = self.remote() else {
            return false;
        };

        match remote
            .client
            .head_object()
            .bucket(&remote.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                let message = e.to_string();
                if !(message.contains("NotFound") || message.contains("NoSuchKey")) {
                    warn!("Existence check for {} failed: {}", key, message);
                }
                false
            }
        }
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        let remote = self.remote()?;
        remote
            .client
            .head_bucket()
            .bucket(&remote.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

fn check_upload_status(key: &str, status: StatusCode) -> StorageResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(StorageError::upload_failed(format!("{}: HTTP {}", key, status)))
    }
}

/// Local file name for a downloaded key: unique prefix plus the key's basename.
fn scratch_file_name(key: &str) -> String {
    let basename = key.rsplit('/').next().unwrap_or(key);
    let safe: String = basename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}-{}", Uuid::new_v4(), safe)
}

async fn write_body(response: reqwest::Response, dest: &Path) -> StorageResult<()> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StorageError::download_failed(e.to_string()))?;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ObjectStorageClient {
        ObjectStorageClient::new(StorageConfig::r2(server.uri(), "test-key", "test-secret", "media"))
            .unwrap()
    }

    #[test]
    fn test_scratch_file_name() {
        let name = scratch_file_name("tracks/My Song (1).mp3");
        assert!(name.ends_with("-My_Song__1_.mp3"));
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_fast() {
        let client = ObjectStorageClient::new(StorageConfig::default()).unwrap();
        assert!(!client.is_configured());

        let file = UploadFile::new(vec![1, 2, 3], "a.mp3", "audio/mpeg");
        let err = client.upload(file, &UploadOptions::default()).await.unwrap_err();
        assert!(err.is_configuration());

        let err = client.download("https://cdn.example.com/a.mp3").await.unwrap_err();
        assert!(err.is_configuration());

        assert!(!client.delete("a.mp3").await);
        assert!(!client.exists("a.mp3").await);
    }

    #[tokio::test]
    async fn test_download_streams_signed_url_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/tracks/song.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fake-audio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("{}/media/tracks/song.mp3", server.uri());

        let local = client.download_to(&url, dir.path()).await.unwrap();

        assert!(local.starts_with(dir.path()));
        assert!(local.to_string_lossy().ends_with("song.mp3"));
        assert_eq!(tokio::fs::read(&local).await.unwrap(), b"ID3fake-audio");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let dir = tempfile::TempDir::new().unwrap();
        let url = format!("{}/media/tracks/gone.mp3", server.uri());

        let err = client.download_to(&url, dir.path()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_download_rejects_foreign_url() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let dir = tempfile::TempDir::new().unwrap();

        let err = client
            .download_to("https://elsewhere.example.com/a.mp3", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_upload_puts_to_generated_key() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/media/tracks/\d+-[0-9a-f-]{36}\.mp3$"))
            .and(header("content-type", "audio/mpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let file = UploadFile::new(vec![7u8; 64], "beat.mp3", "audio/mpeg");
        let uploaded = client
            .upload(file, &UploadOptions::folder("tracks"))
            .await
            .unwrap();

        assert_eq!(uploaded.size, 64);
        assert_eq!(uploaded.mime_type, "audio/mpeg");
        assert!(uploaded.key.starts_with("tracks/"));
        assert_eq!(uploaded.url, format!("{}/media/{}", server.uri(), uploaded.key));
        assert_eq!(client.resolve_key(&uploaded.url).unwrap(), uploaded.key);
    }

    #[tokio::test]
    async fn test_upload_validation_happens_before_transfer() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let file = UploadFile::new(vec![0u8; 32], "a.exe", "application/x-msdownload");
        let err = client.upload(file, &UploadOptions::default()).await.unwrap_err();
        assert!(err.is_validation());

        let file = UploadFile::new(vec![0u8; 32], "a.mp3", "audio/mpeg");
        let err = client
            .upload(file, &UploadOptions::default().with_max_size(16))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_upload_path_reports_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let dir = tempfile::TempDir::new().unwrap();
        let local = dir.path().join("audio.mp3");
        tokio::fs::write(&local, b"data").await.unwrap();

        let err = client
            .upload_path(&local, "processed/t1/audio.mp3", "audio/mpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }
}
