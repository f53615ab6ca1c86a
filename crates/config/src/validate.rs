//! Semantic validation of a loaded configuration.

use crate::schema::TeledriveConfig;

/// Longest lifetime S3 accepts for a presigned URL (7 days).
const MAX_PRESIGN_TTL_SECS: u64 = 7 * 24 * 3600;

/// Largest file the Bot API lets a bot download.
const BOT_API_DOWNLOAD_LIMIT: u64 = 20 * 1024 * 1024;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "storage.bucket"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

impl TeledriveConfig {
    /// Check the settings the bot needs before it can start.
    ///
    /// `require_token` is false for commands that only talk to storage.
    pub fn validate(&self, require_token: bool) -> ValidationResult {
        let mut result = ValidationResult::default();

        if require_token && !self.telegram.has_token() {
            result.push(
                Severity::Error,
                "telegram.token",
                "bot token is required (set TELEGRAM_TOKEN)",
            );
        }

        if let Some(url) = &self.telegram.api_url
            && url::Url::parse(url).is_err()
        {
            result.push(
                Severity::Error,
                "telegram.api_url",
                format!("not a valid URL: {url}"),
            );
        }

        check_bucket_name(&self.storage.bucket, &mut result);

        if self.storage.endpoint.trim().is_empty() {
            result.push(Severity::Error, "storage.endpoint", "endpoint is empty");
        } else if url::Url::parse(&self.storage.endpoint_url()).is_err() {
            result.push(
                Severity::Error,
                "storage.endpoint",
                format!("not a valid endpoint: {}", self.storage.endpoint),
            );
        }

        match (&self.storage.access_key, &self.storage.secret_key) {
            (Some(_), None) => result.push(
                Severity::Error,
                "storage.secret_key",
                "access key set without a secret key",
            ),
            (None, Some(_)) => result.push(
                Severity::Error,
                "storage.access_key",
                "secret key set without an access key",
            ),
            _ => {},
        }

        if self.bot.list_limit == 0 {
            result.push(Severity::Error, "bot.list_limit", "must be at least 1");
        }

        if self.bot.share_ttl_secs == 0 || self.bot.share_ttl_secs > MAX_PRESIGN_TTL_SECS {
            result.push(
                Severity::Error,
                "bot.share_ttl_secs",
                format!("must be between 1 and {MAX_PRESIGN_TTL_SECS} seconds"),
            );
        }

        if self.bot.max_upload_bytes > BOT_API_DOWNLOAD_LIMIT {
            result.push(
                Severity::Warning,
                "bot.max_upload_bytes",
                format!(
                    "the Bot API cannot download files above {BOT_API_DOWNLOAD_LIMIT} bytes; larger uploads will fail"
                ),
            );
        }

        result
    }
}

/// S3 bucket naming rules: 3-63 chars of lowercase letters, digits, `.` and
/// `-`, starting and ending with a letter or digit.
fn check_bucket_name(bucket: &str, result: &mut ValidationResult) {
    let valid_chars = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    let valid_edges = bucket
        .chars()
        .next()
        .zip(bucket.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if bucket.is_empty() {
        result.push(Severity::Error, "storage.bucket", "bucket name is empty");
    } else if !(3..=63).contains(&bucket.len()) || !valid_chars || !valid_edges {
        result.push(
            Severity::Error,
            "storage.bucket",
            format!("invalid bucket name: {bucket}"),
        );
    }
}
