//! Storage configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default maximum upload size (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Default lifetime of signed transfer URLs.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(300);

/// Configuration for the object storage client.
///
/// Credential fields are optional: a client built without them reports
/// `is_configured() == false` and refuses remote operations.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: Option<String>,
    /// Access key ID
    pub access_key_id: Option<String>,
    /// Secret access key
    pub secret_access_key: Option<String>,
    /// Bucket name
    pub bucket_name: Option<String>,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Public base URL objects are served from (CDN or r2.dev domain)
    pub public_url: Option<String>,
    /// Upload size limit in bytes
    pub max_upload_bytes: u64,
    /// Lifetime of presigned GET/PUT URLs
    pub signed_url_ttl: Duration,
    /// Directory for downloads that are not given an explicit destination
    pub scratch_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            bucket_name: None,
            region: "auto".to_string(),
            public_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            signed_url_ttl: DEFAULT_SIGNED_URL_TTL,
            scratch_dir: PathBuf::from("/tmp/mixdeck/downloads"),
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: env_opt("R2_ENDPOINT_URL"),
            access_key_id: env_opt("R2_ACCESS_KEY_ID"),
            secret_access_key: env_opt("R2_SECRET_ACCESS_KEY"),
            bucket_name: env_opt("R2_BUCKET_NAME"),
            region: env_opt("R2_REGION").unwrap_or_else(|| "auto".to_string()),
            public_url: env_opt("R2_PUBLIC_URL"),
            max_upload_bytes: std::env::var("STORAGE_MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            signed_url_ttl: Duration::from_secs(
                std::env::var("STORAGE_SIGNED_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SIGNED_URL_TTL.as_secs()),
            ),
            scratch_dir: env_opt("STORAGE_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp/mixdeck/downloads")),
        }
    }

    /// Build a fully configured R2 config (used by tests and embedding apps).
    pub fn r2(
        endpoint_url: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(secret_access_key.into()),
            bucket_name: Some(bucket_name.into()),
            ..Self::default()
        }
    }

    /// Set the public base URL.
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Names of required settings that are missing.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint_url.is_none() {
            missing.push("R2_ENDPOINT_URL");
        }
        if self.access_key_id.is_none() {
            missing.push("R2_ACCESS_KEY_ID");
        }
        if self.secret_access_key.is_none() {
            missing.push("R2_SECRET_ACCESS_KEY");
        }
        if self.bucket_name.is_none() {
            missing.push("R2_BUCKET_NAME");
        }
        missing
    }

    /// True when every required credential and bucket setting is present.
    pub fn is_complete(&self) -> bool {
        self.missing_settings().is_empty()
    }
}

/// Read a non-empty environment variable.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        let config = StorageConfig::default();
        assert!(!config.is_complete());
        assert_eq!(config.missing_settings().len(), 4);
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_r2_constructor_is_complete() {
        let config = StorageConfig::r2("http://localhost:9000", "key", "secret", "media");
        assert!(config.is_complete());
        assert_eq!(config.region, "auto");
    }

    #[test]
    fn test_missing_bucket_reported() {
        let mut config = StorageConfig::r2("http://localhost:9000", "key", "secret", "media");
        config.bucket_name = None;
        assert_eq!(config.missing_settings(), vec!["R2_BUCKET_NAME"]);
    }
}
