use std::time::Duration;

use actix_web::web::Bytes;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::ConfigLoader;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;
use url::Url;

use super::{decode_key, ObjectStore, StorageError, StorageResult};

pub async fn create_s3_client(region: Option<String>, endpoint: Option<&Url>) -> S3Client {
    let mut loader = ConfigLoader::default()
        .region(region.map(Region::new))
        .behavior_version(BehaviorVersion::latest());
    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint.as_str().trim_end_matches('/'));
    }
    let aws_config = loader.load().await;

    // S3-compatible servers rarely resolve bucket subdomains
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(endpoint.is_some())
        .build();
    S3Client::from_conf(s3_config)
}

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    endpoint: Option<Url>,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: impl Into<String>, endpoint: Option<Url>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            endpoint,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body.to_vec().into())
            .send()
            .await
            .map_err(|err| StorageError::Request(DisplayErrorContext(&err).to_string()))?;
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| StorageError::Presign(err.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::Request(DisplayErrorContext(&err).to_string()))?;

        Ok(request.uri().to_string())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| StorageError::Request(DisplayErrorContext(&err).to_string()))?;
        Ok(())
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        key_in_bucket(&self.bucket, self.endpoint.as_ref(), url)
    }
}

/// Resolves virtual-hosted (`bucket.<endpoint>/key`) and path-style
/// (`<endpoint>/bucket/key`) URLs. Only the configured endpoint counts, or
/// AWS S3 hosts when none is configured.
fn key_in_bucket(bucket: &str, endpoint: Option<&Url>, url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let host = url.host_str()?;
    let path = url.path().trim_start_matches('/');

    let is_endpoint = |candidate: &str| match endpoint {
        Some(endpoint) => {
            endpoint.host_str() == Some(candidate)
                && endpoint.port_or_known_default() == url.port_or_known_default()
        }
        None => is_aws_s3_host(candidate),
    };

    if let Some(service) = host.strip_prefix(bucket).and_then(|rest| rest.strip_prefix('.')) {
        if is_endpoint(service) {
            return decode_key(path);
        }
    }
    if is_endpoint(host) {
        return path
            .strip_prefix(bucket)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(decode_key);
    }
    None
}

/// `s3.amazonaws.com`, `s3.<region>.amazonaws.com` and the legacy `s3-<region>` form.
fn is_aws_s3_host(host: &str) -> bool {
    host.strip_suffix(".amazonaws.com").map_or(false, |service| {
        service == "s3" || service.starts_with("s3.") || service.starts_with("s3-")
    })
}
