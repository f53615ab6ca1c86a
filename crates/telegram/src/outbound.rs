use std::{future::Future, time::Duration};

use {
    teloxide::{
        RequestError,
        payloads::{SendDocumentSetters, SendMessageSetters},
        prelude::*,
        types::{ChatAction, InputFile, MessageId, ReplyParameters},
    },
    tracing::{debug, info, warn},
};

use teledrive_common::types::OutboundReply;

use crate::Result;

/// Telegram rejects messages longer than this many UTF-16 code units; byte
/// length is a safe upper bound.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Sends router replies back to a chat.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Deliver one reply, threaded under `reply_to` when given.
    pub async fn send_reply(
        &self,
        chat_id: ChatId,
        reply: &OutboundReply,
        reply_to: Option<MessageId>,
    ) -> Result<()> {
        let reply_params =
            reply_to.map(|id| ReplyParameters::new(id).allow_sending_without_reply());

        match reply {
            OutboundReply::Text(text) => {
                let chunks = chunk_message(text, TELEGRAM_MAX_MESSAGE_LEN);
                debug!(
                    chat_id = chat_id.0,
                    text_len = text.len(),
                    chunk_count = chunks.len(),
                    "telegram outbound text send start"
                );
                for chunk in &chunks {
                    self.run_telegram_request_with_retry(chat_id, "send message", || {
                        let mut req = self.bot.send_message(chat_id, chunk);
                        if let Some(rp) = &reply_params {
                            req = req.reply_parameters(rp.clone());
                        }
                        async move { req.await }
                    })
                    .await?;
                }
            },
            OutboundReply::Document { filename, data } => {
                let _ = self
                    .bot
                    .send_chat_action(chat_id, ChatAction::UploadDocument)
                    .await;
                self.run_telegram_request_with_retry(chat_id, "send document", || {
                    let input = InputFile::memory(data.to_vec()).file_name(filename.clone());
                    let mut req = self.bot.send_document(chat_id, input);
                    if let Some(rp) = &reply_params {
                        req = req.reply_parameters(rp.clone());
                    }
                    async move { req.await }
                })
                .await?;
                info!(
                    chat_id = chat_id.0,
                    filename = %filename,
                    bytes = data.len(),
                    "telegram outbound document sent"
                );
            },
        }

        Ok(())
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        chat_id: ChatId,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = chat_id.0,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = chat_id.0,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Split text into chunks of at most `max_len` bytes, preferring line
/// breaks, then spaces. Never splits inside a UTF-8 character.
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut window_end = remaining.floor_char_boundary(max_len);
        if window_end == 0 {
            window_end = remaining
                .chars()
                .next()
                .map_or(remaining.len(), char::len_utf8);
        }

        let window = &remaining[..window_end];
        let split_at = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(0) | None => window_end,
            Some(at) => at,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches('\n');
        if let Some(rest) = remaining.strip_prefix(' ') {
            remaining = rest;
        }
    }

    chunks
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_message("hello", 100), vec!["hello"]);
    }

    #[test]
    fn splits_at_newlines() {
        let chunks = chunk_message("line1\nline2\nline3", 10);
        assert_eq!(chunks, vec!["line1", "line2", "line3"]);
    }

    #[test]
    fn falls_back_to_spaces() {
        let chunks = chunk_message("hello world foo bar", 10);
        assert_eq!(chunks, vec!["hello", "world foo", "bar"]);
    }

    #[test]
    fn long_listing_stays_under_limit() {
        let names: Vec<String> = (0..50).map(|i| format!("{}-{i}.bin", "x".repeat(120))).collect();
        let text = format!("Files:\n{}", names.join("\n"));
        assert!(text.len() > TELEGRAM_MAX_MESSAGE_LEN);

        let chunks = chunk_message(&text, TELEGRAM_MAX_MESSAGE_LEN);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= TELEGRAM_MAX_MESSAGE_LEN));
        // No name is cut in half.
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.lines()).collect();
        assert_eq!(rejoined.len(), names.len() + 1);
    }

    #[test]
    fn respects_utf8_boundaries() {
        let text = format!("{}лz", "a".repeat(4095));
        let chunks = chunk_message(&text, 4096);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 4095);
        assert_eq!(chunks[1], "лz");
    }

    #[test]
    fn zero_limit_yields_nothing() {
        assert!(chunk_message("abc", 0).is_empty());
    }

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }
}
