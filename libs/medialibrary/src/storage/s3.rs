//! S3 and S3-compatible disk

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::Region,
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::ObjectCannedAcl,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use super::{ObjectReader, SaveOptions, Storage, StorageError, StorageResult, Visibility};

/// Connection settings for an S3 disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    /// Region, taken from the AWS environment when unset
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint: Option<String>,
    /// Prefix for public URLs, e.g. a CDN
    pub base_url: Option<String>,
    pub force_path_style: bool,
    /// Build virtual-hosted bucket URLs when no base URL is set
    pub public_urls: bool,
}

/// Stores objects in one bucket
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    region: Option<String>,
    base_url: Option<String>,
    public_urls: bool,
}

impl S3Storage {
    /// Wrap an existing client
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: None,
            base_url: None,
            public_urls: false,
        }
    }

    /// Build a client from the AWS environment and `config`
    pub async fn from_config(config: &S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidConfig(
                "s3 disk requires a bucket".to_string(),
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let region = config
            .region
            .clone()
            .or_else(|| shared.region().map(|r| r.to_string()));

        info!("Initialized S3 disk for bucket: {}", config.bucket);

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            region,
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            public_urls: config.public_urls,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_public_urls(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self.public_urls = true;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn backend_error<E>(operation: &str, path: &str, err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend(format!(
        "{} {}: {}",
        operation,
        path,
        DisplayErrorContext(&err)
    ))
}

#[async_trait]
impl Storage for S3Storage {
    async fn save(
        &self,
        path: &str,
        mut contents: ObjectReader,
        options: &SaveOptions,
    ) -> StorageResult<()> {
        // PutObject needs the content length up front.
        let mut body = Vec::new();
        contents.read_to_end(&mut body).await?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(body))
            .set_content_type(options.content_type.clone())
            .set_content_disposition(options.content_disposition.clone())
            .set_cache_control(options.cache_control.clone());

        for (key, value) in &options.metadata {
            request = request.metadata(key, value);
        }

        if options.visibility == Visibility::Public {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request
            .send()
            .await
            .map_err(|e| backend_error("put_object", path, e))?;

        debug!("Stored S3 object: s3://{}/{}", self.bucket, path);
        Ok(())
    }

    async fn get(&self, path: &str) -> StorageResult<ObjectReader> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(path.to_string())
                } else {
                    backend_error("get_object", path, e)
                }
            })?;

        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(backend_error("head_object", path, e)),
        }
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| backend_error("delete_object", path, e))?;

        Ok(())
    }

    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');

        if let Some(base) = &self.base_url {
            return format!("{}/{}", base, path);
        }

        match (&self.region, self.public_urls) {
            (Some(region), true) => {
                format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, region, path)
            }
            _ => String::new(),
        }
    }

    async fn temporary_url(&self, path: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::InvalidConfig(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| backend_error("presign get_object", path, e))?;

        Ok(request.uri().to_string())
    }
}
