use std::time::Duration;

use secrecy::Secret;

/// Router parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// `/list` shows at most this many names. A presentation cap, not
    /// pagination: further objects stay in the bucket, unlisted.
    pub list_limit: usize,

    /// Lifetime of links returned by `/share`.
    pub share_ttl: Duration,

    /// Attachments declared larger than this are refused before download.
    pub max_upload_bytes: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            list_limit: 50,
            share_ttl: Duration::from_secs(3600),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Everything needed to start the bot.
#[derive(Clone)]
pub struct TelegramBotConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// Bot API base URL override.
    pub api_url: Option<String>,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,

    pub router: RouterConfig,
}

impl std::fmt::Debug for TelegramBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBotConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("router", &self.router)
            .finish()
    }
}

impl TelegramBotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
            api_url: None,
            poll_timeout_secs: 30,
            router: RouterConfig::default(),
        }
    }
}
