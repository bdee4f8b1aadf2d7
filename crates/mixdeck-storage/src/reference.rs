//! Mapping between object keys and the URLs stored on records.

use url::Url;

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Builds public URLs for keys and resolves stored URLs back to keys.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    public_url: Option<String>,
    endpoint_url: Option<String>,
    bucket: Option<String>,
}

impl KeyResolver {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            public_url: config
                .public_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            endpoint_url: config
                .endpoint_url
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            bucket: config.bucket_name.clone(),
        }
    }

    /// Publicly resolvable URL for a key.
    ///
    /// Uses the public base URL when configured, otherwise the path-style
    /// endpoint URL.
    pub fn public_url(&self, key: &str) -> String {
        match (&self.public_url, &self.endpoint_url, &self.bucket) {
            (Some(base), _, _) => format!("{}/{}", base, key),
            (None, Some(endpoint), Some(bucket)) => format!("{}/{}/{}", endpoint, bucket, key),
            _ => key.to_string(),
        }
    }

    /// Resolve the object key referenced by a stored URL.
    pub fn resolve_key(&self, reference: &str) -> StorageResult<String> {
        let url = Url::parse(reference.trim())
            .map_err(|_| StorageError::invalid_reference(reference))?;

        let raw_key = self
            .key_from_public(&url)
            .or_else(|| self.key_from_endpoint(&url))
            .ok_or_else(|| StorageError::invalid_reference(reference))?;

        let key = urlencoding::decode(raw_key.trim_start_matches('/'))
            .map_err(|_| StorageError::invalid_reference(reference))?
            .into_owned();

        if key.is_empty() || key.ends_with('/') {
            return Err(StorageError::invalid_reference(reference));
        }
        Ok(key)
    }

    fn key_from_public(&self, url: &Url) -> Option<String> {
        let base = Url::parse(self.public_url.as_deref()?).ok()?;
        if !same_origin(&base, url) {
            return None;
        }
        let prefix = format!("{}/", base.path().trim_end_matches('/'));
        url.path().strip_prefix(&prefix).map(str::to_string)
    }

    fn key_from_endpoint(&self, url: &Url) -> Option<String> {
        let endpoint = Url::parse(self.endpoint_url.as_deref()?).ok()?;
        let bucket = self.bucket.as_deref()?;

        // Path style: <endpoint>/<bucket>/<key>
        if same_origin(&endpoint, url) {
            let prefix = format!("/{}/", bucket);
            return url.path().strip_prefix(&prefix).map(str::to_string);
        }

        // Virtual-hosted style: <bucket>.<endpoint-host>/<key>
        let virtual_host = format!("{}.{}", bucket, endpoint.host_str()?);
        if url.host_str() == Some(virtual_host.as_str()) {
            return Some(url.path().to_string());
        }

        None
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}
