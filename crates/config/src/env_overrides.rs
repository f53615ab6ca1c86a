use {secrecy::Secret, tracing::debug};

use crate::schema::TeledriveConfig;

/// Apply environment-variable overrides on top of a loaded config.
///
/// | Variable | Field |
/// |---|---|
/// | `TELEGRAM_TOKEN` | `telegram.token` |
/// | `TELEGRAM_API_URL` | `telegram.api_url` |
/// | `MINIO_ENDPOINT` | `storage.endpoint` |
/// | `MINIO_ACCESS_KEY` | `storage.access_key` |
/// | `MINIO_SECRET_KEY` | `storage.secret_key` |
/// | `MINIO_BUCKET` | `storage.bucket` |
/// | `MINIO_REGION` | `storage.region` |
/// | `MINIO_SECURE` | `storage.secure` |
pub fn apply_env_overrides(config: TeledriveConfig) -> TeledriveConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    mut config: TeledriveConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> TeledriveConfig {
    let var = |name: &str| {
        let value = lookup(name).filter(|v| !v.trim().is_empty());
        if value.is_some() {
            debug!(var = name, "config overridden from environment");
        }
        value
    };

    if let Some(token) = var("TELEGRAM_TOKEN") {
        config.telegram.token = Secret::new(token);
    }
    if let Some(url) = var("TELEGRAM_API_URL") {
        config.telegram.api_url = Some(url);
    }
    if let Some(endpoint) = var("MINIO_ENDPOINT") {
        config.storage.endpoint = endpoint;
    }
    if let Some(access_key) = var("MINIO_ACCESS_KEY") {
        config.storage.access_key = Some(access_key);
    }
    if let Some(secret_key) = var("MINIO_SECRET_KEY") {
        config.storage.secret_key = Some(Secret::new(secret_key));
    }
    if let Some(bucket) = var("MINIO_BUCKET") {
        config.storage.bucket = bucket;
    }
    if let Some(region) = var("MINIO_REGION") {
        config.storage.region = region;
    }
    if let Some(secure) = var("MINIO_SECURE") {
        config.storage.secure = parse_bool(&secure);
    }

    config
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
