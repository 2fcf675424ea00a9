//! Object-store construction for local and S3 package locations.

use iggy_error::{PackageError, Result};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ClientOptions, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for package storage access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// AWS region for S3 access
    pub region: String,

    /// Optional S3 endpoint URL (for LocalStack)
    pub endpoint: Option<String>,

    /// Optional AWS access key ID
    pub access_key: Option<String>,

    /// Optional AWS secret access key
    pub secret_key: Option<String>,

    /// Optional AWS session token (for temporary credentials)
    pub session_token: Option<String>,

    /// Batch size for Parquet reads (number of rows per batch)
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            session_token: None,
            batch_size: 8192,
        }
    }
}

impl StoreConfig {
    /// Create a configuration for the given region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Set the S3 endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set AWS credentials.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self.session_token = session_token;
        self
    }

    /// Set the Parquet read batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}

/// HTTP client options for S3 connection pooling.
///
/// Package loads issue many concurrent byte-range requests against a handful
/// of objects, so idle connections are kept warm and sized generously.
fn s3_client_options() -> ClientOptions {
    ClientOptions::new()
        .with_pool_max_idle_per_host(100)
        .with_pool_idle_timeout(Duration::from_secs(90))
        .with_timeout(Duration::from_secs(300))
        .with_connect_timeout(Duration::from_secs(10))
        .with_http2_keep_alive_interval(Duration::from_secs(30))
        .with_http2_keep_alive_timeout(Duration::from_secs(20))
        .with_http2_keep_alive_while_idle()
}

/// Create an object store for the given base location.
///
/// Returns the store and the base prefix within it. `s3://bucket[/prefix]`
/// URIs get an S3 store; anything else is treated as a local directory
/// (`file://` prefixes are accepted). Local paths are canonicalized, so the
/// base must exist.
pub(crate) fn build_store(
    base: &str,
    config: &StoreConfig,
) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    if base.starts_with("s3://") {
        let (bucket, key) = parse_s3_uri(base)?;
        debug!(bucket = %bucket, prefix = %key, "Creating S3 object store");

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&bucket)
            .with_region(&config.region)
            .with_client_options(s3_client_options());

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);

            if let Some(token) = &config.session_token {
                builder = builder.with_token(token);
            }
        } else {
            // No credentials provided - use anonymous access for public buckets
            builder = builder.with_skip_signature(true);
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(true)
                .with_virtual_hosted_style_request(false);
        }

        let store = builder.build().map_err(|e| {
            PackageError::Storage(format!("Failed to create S3 object store: {}", e))
        })?;

        let path = if key.is_empty() {
            ObjectPath::default()
        } else {
            ObjectPath::from(key)
        };
        Ok((Arc::new(store), path))
    } else {
        let raw = base.strip_prefix("file://").unwrap_or(base);
        let canonical = std::fs::canonicalize(raw)
            .map_err(|e| PackageError::NotFound(format!("{}: {}", raw, e)))?;
        let path = ObjectPath::from_absolute_path(&canonical).map_err(|e| {
            PackageError::InvalidUri(format!("Invalid local path '{}': {}", raw, e))
        })?;

        debug!(path = %path, "Creating local filesystem object store");
        Ok((Arc::new(LocalFileSystem::new()), path))
    }
}

/// Parse an S3 URI into (bucket, key prefix). The key may be empty when the
/// package base is a bucket root.
pub(crate) fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let url = url::Url::parse(uri)
        .map_err(|e| PackageError::InvalidUri(format!("Invalid S3 URI '{}': {}", uri, e)))?;

    if url.scheme() != "s3" {
        return Err(PackageError::InvalidUri(format!("Expected s3:// URI, got: {}", uri)).into());
    }

    let bucket = url
        .host_str()
        .ok_or_else(|| PackageError::InvalidUri(format!("Missing bucket in S3 URI: {}", uri)))?;

    let key = url.path().trim_matches('/');
    Ok((bucket.to_string(), key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iggy_error::IggyError;

    #[test]
    fn test_parse_s3_uri() {
        let (bucket, key) = parse_s3_uri("s3://my-bucket/path/to/packages").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "path/to/packages");

        let (bucket, key) = parse_s3_uri("s3://my-bucket/prefix/").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "prefix");
    }

    #[test]
    fn test_parse_s3_uri_bucket_root() {
        let (bucket, key) = parse_s3_uri("s3://bucket-only").unwrap();
        assert_eq!(bucket, "bucket-only");
        assert_eq!(key, "");
    }

    #[test]
    fn test_parse_s3_uri_invalid() {
        assert!(parse_s3_uri("https://example.com/file").is_err());
        assert!(parse_s3_uri("s3://").is_err());
        assert!(parse_s3_uri("s3:///key-without-bucket").is_err());
    }

    #[test]
    fn test_parse_s3_uri_rejects_malformed_authority() {
        // A bucket name the URL grammar rejects must not reach the S3 builder.
        match parse_s3_uri("s3://bu cket/prefix") {
            Err(IggyError::Package(PackageError::InvalidUri(_))) => {}
            other => panic!("Expected InvalidUri error, got: {:?}", other),
        }
    }

    #[test]
    fn test_build_store_local_missing() {
        let config = StoreConfig::default();
        let result = build_store("/nonexistent/package/base", &config);

        match result {
            Err(IggyError::Package(PackageError::NotFound(_))) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_build_store_local() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::default();
        let (_store, path) = build_store(dir.path().to_str().unwrap(), &config).unwrap();

        assert!(path.as_ref().ends_with(
            dir.path()
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
        ));
    }

    #[test]
    fn test_store_config_builders() {
        let config = StoreConfig::new("eu-west-1")
            .with_endpoint("http://localhost:4566")
            .with_credentials("key", "secret", Some("token".to_string()))
            .with_batch_size(1024);

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.endpoint, Some("http://localhost:4566".to_string()));
        assert_eq!(config.access_key, Some("key".to_string()));
        assert_eq!(config.session_token, Some("token".to_string()));
        assert_eq!(config.batch_size, 1024);
    }
}
