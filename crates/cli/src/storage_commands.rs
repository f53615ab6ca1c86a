use std::sync::Arc;

use {
    anyhow::{Context, Result},
    futures::TryStreamExt,
    tracing::{info, warn},
};

use {
    teledrive_config::{StorageConfig, TeledriveConfig},
    teledrive_storage::{MemoryGateway, S3Gateway, S3Options, StorageGateway},
};

use crate::config_commands;

pub fn s3_options(storage: &StorageConfig) -> S3Options {
    S3Options {
        endpoint_url: storage.endpoint_url(),
        region: storage.region.clone(),
        bucket: storage.bucket.clone(),
        credentials: storage
            .credentials()
            .map(|(access, secret)| (access.to_string(), secret.to_string())),
    }
}

/// The configured gateway; in-memory when `memory` is set.
pub async fn open_gateway(storage: &StorageConfig, memory: bool) -> Arc<dyn StorageGateway> {
    if memory {
        warn!("using in-memory storage, files are lost on exit");
        Arc::new(MemoryGateway::new(
            storage.endpoint_url(),
            storage.bucket.clone(),
        ))
    } else {
        let options = s3_options(storage);
        info!(endpoint = %options.endpoint_url, bucket = %options.bucket, "connecting to object storage");
        Arc::new(S3Gateway::connect(options).await)
    }
}

/// Make sure the bucket exists, creating it when missing.
pub async fn ensure_bucket(gateway: &dyn StorageGateway) -> Result<()> {
    gateway
        .ensure_bucket()
        .await
        .with_context(|| format!("bucket {} is not available", gateway.bucket()))?;
    info!(bucket = gateway.bucket(), "bucket ready");
    Ok(())
}

pub async fn check(config: TeledriveConfig) -> Result<()> {
    config_commands::validate(&config, false)?;
    let gateway = open_gateway(&config.storage, false).await;
    ensure_bucket(gateway.as_ref()).await?;
    eprintln!("Bucket {} is reachable.", gateway.bucket());
    Ok(())
}

pub async fn ls(config: TeledriveConfig) -> Result<()> {
    config_commands::validate(&config, false)?;
    let gateway = open_gateway(&config.storage, false).await;

    let mut objects = gateway.list_objects();
    while let Some(name) = objects
        .try_next()
        .await
        .with_context(|| format!("failed to list bucket {}", gateway.bucket()))?
    {
        println!("{name}");
    }
    Ok(())
}
