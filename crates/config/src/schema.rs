//! Config schema types (telegram, storage, bot).
use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeledriveConfig {
    pub telegram: TelegramConfig,
    pub storage: StorageConfig,
    pub bot: BotConfig,
}

/// Telegram transport settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Bot API base URL override (self-hosted Bot API servers, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            api_url: None,
        }
    }
}

impl TelegramConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

/// S3-compatible object storage settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `host:port`, or a full URL with scheme.
    pub endpoint: String,

    /// Use `https` when `endpoint` carries no scheme.
    pub secure: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    #[serde(
        serialize_with = "serialize_opt_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub secret_key: Option<Secret<String>>,

    pub bucket: String,

    pub region: String,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("secure", &self.secure)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "minio:9000".into(),
            secure: false,
            access_key: None,
            secret_key: None,
            bucket: "drive".into(),
            region: "us-east-1".into(),
        }
    }
}

impl StorageConfig {
    /// Endpoint as a URL. A bare `host:port` gets `http://` or `https://`
    /// depending on `secure`.
    pub fn endpoint_url(&self) -> String {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else if self.secure {
            format!("https://{endpoint}")
        } else {
            format!("http://{endpoint}")
        }
    }

    /// Static credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.expose_secret().as_str())),
            _ => None,
        }
    }
}

/// Router behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Maximum number of names shown by `/list`.
    pub list_limit: usize,

    /// Lifetime of links produced by `/share`.
    pub share_ttl_secs: u64,

    /// Attachments larger than this are rejected before download.
    pub max_upload_bytes: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            list_limit: 50,
            share_ttl_secs: 3600,
            // Bot API getFile limit.
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl BotConfig {
    pub fn share_ttl(&self) -> Duration {
        Duration::from_secs(self.share_ttl_secs)
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_opt_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = TeledriveConfig::default();
        assert_eq!(cfg.storage.endpoint, "minio:9000");
        assert_eq!(cfg.storage.bucket, "drive");
        assert!(!cfg.storage.secure);
        assert_eq!(cfg.bot.list_limit, 50);
        assert_eq!(cfg.bot.share_ttl(), Duration::from_secs(3600));
        assert!(!cfg.telegram.has_token());
    }

    #[test]
    fn endpoint_url_adds_scheme() {
        let mut storage = StorageConfig::default();
        assert_eq!(storage.endpoint_url(), "http://minio:9000");
        storage.secure = true;
        assert_eq!(storage.endpoint_url(), "https://minio:9000");
        storage.endpoint = "http://localhost:9000/".into();
        assert_eq!(storage.endpoint_url(), "http://localhost:9000");
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut storage = StorageConfig {
            access_key: Some("minio".into()),
            ..Default::default()
        };
        assert!(storage.credentials().is_none());
        storage.secret_key = Some(Secret::new("minio123".into()));
        assert_eq!(storage.credentials(), Some(("minio", "minio123")));
    }

    #[test]
    fn deserialize_from_toml() {
        let raw = r#"
            [telegram]
            token = "123:ABC"

            [storage]
            endpoint = "localhost:9000"
            bucket = "files"
            secret_key = "s3cr3t"

            [bot]
            list_limit = 10
        "#;
        let cfg: TeledriveConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.storage.endpoint, "localhost:9000");
        assert_eq!(cfg.storage.bucket, "files");
        assert_eq!(
            cfg.storage.secret_key.as_ref().map(|s| s.expose_secret().as_str()),
            Some("s3cr3t")
        );
        assert_eq!(cfg.bot.list_limit, 10);
        // defaults for unspecified fields
        assert_eq!(cfg.bot.share_ttl_secs, 3600);
        assert_eq!(cfg.storage.region, "us-east-1");
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = TeledriveConfig {
            telegram: TelegramConfig {
                token: Secret::new("123:ABC".into()),
                api_url: None,
            },
            storage: StorageConfig {
                secret_key: Some(Secret::new("s3cr3t".into())),
                ..Default::default()
            },
            bot: BotConfig::default(),
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("123:ABC"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn serialize_roundtrip_keeps_secrets() {
        let cfg = TeledriveConfig {
            telegram: TelegramConfig {
                token: Secret::new("tok".into()),
                api_url: None,
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TeledriveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.telegram.token.expose_secret(), "tok");
        assert!(back.storage.secret_key.is_none());
    }
}
