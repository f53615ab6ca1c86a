//! Transport-neutral events exchanged between a chat transport and the
//! command router.

use {async_trait::async_trait, bytes::Bytes};

use crate::Result;

/// Lazily fetches the bytes of an inbound attachment.
///
/// The chat transport hands one of these to the router instead of the raw
/// bytes so that validation (missing filename, size limit) can reject an
/// attachment before anything is downloaded.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn fetch(&self) -> Result<Bytes>;
}

/// In-memory bytes are already fetched.
#[async_trait]
impl AttachmentSource for Bytes {
    async fn fetch(&self) -> Result<Bytes> {
        Ok(self.clone())
    }
}

/// A file sent to the bot.
pub struct Attachment {
    /// File name as declared by the sender, if any.
    pub filename: Option<String>,
    /// Size declared by the platform before download.
    pub size: Option<u64>,
    pub source: Box<dyn AttachmentSource>,
}

impl Attachment {
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            filename: Some(filename.into()),
            size: Some(data.len() as u64),
            source: Box::new(data),
        }
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// One inbound chat event. Exists for the duration of a single dispatch.
#[derive(Debug)]
pub enum InboundEvent {
    /// `/name arg1 arg2`. `name` carries neither the slash nor any
    /// `@botname` suffix. `arg_text` is everything after the command token
    /// with surrounding whitespace trimmed and inner whitespace kept.
    Command {
        name: String,
        args: Vec<String>,
        arg_text: String,
    },
    Attachment(Attachment),
    /// Anything else: plain text, photos, stickers.
    Other,
}

impl InboundEvent {
    /// Parse a text message into a command event.
    ///
    /// Commands addressed to a different bot (`/get@other_bot`) are not ours
    /// and yield [`InboundEvent::Other`], as does text that does not start
    /// with `/`.
    pub fn from_text(text: &str, bot_username: Option<&str>) -> Self {
        let text = text.trim_start();
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        let Some(command) = head.strip_prefix('/') else {
            return Self::Other;
        };

        let name = match command.split_once('@') {
            Some((name, target)) => match bot_username {
                Some(me) if target.eq_ignore_ascii_case(me) => name,
                _ => return Self::Other,
            },
            None => command,
        };
        if name.is_empty() {
            return Self::Other;
        }

        Self::Command {
            name: name.to_string(),
            args: rest.split_whitespace().map(str::to_string).collect(),
            arg_text: rest.trim().to_string(),
        }
    }
}

/// The single reply produced for an [`InboundEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundReply {
    Text(String),
    Document { filename: String, data: Bytes },
}

impl OutboundReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// The text body, if this is a text reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Document { .. } => None,
        }
    }
}
