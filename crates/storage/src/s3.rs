use std::time::Duration;

use {
    async_trait::async_trait,
    aws_credential_types::Credentials,
    aws_sdk_s3::{
        Client,
        config::{BehaviorVersion, Region, RequestChecksumCalculation, ResponseChecksumValidation},
        presigning::PresigningConfig,
        primitives::ByteStream,
        types::{BucketLocationConstraint, CreateBucketConfiguration},
    },
    bytes::Bytes,
    futures::stream::BoxStream,
    tracing::{debug, info},
};

use crate::{
    error::{Result, StorageError},
    gateway::StorageGateway,
};

/// Region S3 treats as the default; bucket creation there must not send a
/// location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for [`S3Gateway`].
#[derive(Clone)]
pub struct S3Options {
    /// Full endpoint URL, e.g. `http://minio:9000`.
    pub endpoint_url: String,
    pub region: String,
    pub bucket: String,
    /// Static `(access_key, secret_key)`. When `None` the default AWS
    /// credential chain (env, profile, IMDS) is used.
    pub credentials: Option<(String, String)>,
}

impl std::fmt::Debug for S3Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Options")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|(access, _)| (access, "[REDACTED]")),
            )
            .finish()
    }
}

/// S3 / MinIO gateway.
///
/// The underlying `aws_sdk_s3::Client` is cheap to clone and safe to share
/// across tasks; it owns connection pooling and request timeouts.
#[derive(Clone)]
pub struct S3Gateway {
    client: Client,
    bucket: String,
    region: String,
}

impl S3Gateway {
    /// Build a client for `options`. No request is sent.
    pub async fn connect(options: S3Options) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(options.region.clone()));
        if let Some((access_key, secret_key)) = &options.credentials {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "teledrive-config",
            ));
        }
        let shared = loader.load().await;

        // MinIO serves buckets under the path, not as virtual hosts.
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(&options.endpoint_url)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        debug!(
            endpoint = %options.endpoint_url,
            bucket = %options.bucket,
            region = %options.region,
            "s3 client configured"
        );

        Self {
            client: Client::from_conf(config),
            bucket: options.bucket,
            region: options.region,
        }
    }

    async fn create_bucket(&self) -> Result<()> {
        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %self.bucket, "bucket created");
                Ok(())
            },
            // Lost a creation race with another instance.
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            },
            Err(err) => Err(StorageError::backend(
                format!("create bucket {}", self.bucket),
                err,
            )),
        }
    }

    async fn head_object(&self, name: &str) -> Result<()> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                Err(StorageError::not_found(name))
            },
            Err(err) => Err(StorageError::backend(format!("head object {name}"), err)),
        }
    }
}

#[async_trait]
impl StorageGateway for S3Gateway {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                debug!(bucket = %self.bucket, "bucket exists");
                Ok(())
            },
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                info!(bucket = %self.bucket, "bucket missing, creating");
                self.create_bucket().await
            },
            Err(err) => Err(StorageError::backend(
                format!("check bucket {}", self.bucket),
                err,
            )),
        }
    }

    async fn put_object(&self, name: &str, data: Bytes) -> Result<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .content_length(len as i64)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::backend(format!("put object {name}"), err))?;
        debug!(bucket = %self.bucket, object = name, bytes = len, "object stored");
        Ok(())
    }

    fn list_objects(&self) -> BoxStream<'_, Result<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();
        let bucket = self.bucket.clone();

        Box::pin(async_stream::stream! {
            while let Some(page) = pages.next().await {
                match page {
                    Ok(page) => {
                        for object in page.contents() {
                            if let Some(key) = object.key() {
                                yield Ok(key.to_string());
                            }
                        }
                    },
                    Err(err) => {
                        yield Err(StorageError::backend(format!("list objects in {bucket}"), err));
                        break;
                    },
                }
            }
        })
    }

    async fn get_object(&self, name: &str) -> Result<Bytes> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(StorageError::not_found(name));
            },
            Err(err) => return Err(StorageError::backend(format!("get object {name}"), err)),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| StorageError::backend(format!("read object {name}"), err))?
            .into_bytes();
        debug!(bucket = %self.bucket, object = name, bytes = data.len(), "object fetched");
        Ok(data)
    }

    async fn presigned_url(&self, name: &str, ttl: Duration) -> Result<String> {
        self.head_object(name).await?;

        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|err| StorageError::InvalidConfig(format!("presign ttl: {err}")))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .presigned(presigning)
            .await
            .map_err(|err| StorageError::backend(format!("presign object {name}"), err))?;
        Ok(request.uri().to_string())
    }
}
