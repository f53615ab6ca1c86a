use {
    async_trait::async_trait,
    bytes::Bytes,
    teloxide::{
        net::Download,
        prelude::*,
        types::{MediaKind, MessageKind},
    },
    tracing::{debug, info, warn},
};

use teledrive_common::types::{Attachment, AttachmentSource, InboundEvent, OutboundReply};

use crate::{Result, state::BotState};

/// Handle a single inbound Telegram message (called from the polling loop).
///
/// Every message gets exactly one reply. When Telegram refuses a document
/// (too large for the Bot API, for instance) a short error text is sent in
/// its place.
pub async fn handle_message_direct(msg: Message, state: &BotState) -> Result<()> {
    let chat_id = msg.chat.id;
    let event = inbound_event(&msg, &state.bot, state.bot_username.as_deref());
    debug!(
        chat_id = chat_id.0,
        kind = event_kind(&event),
        "dispatching telegram message"
    );

    let reply = state.router.dispatch(event).await;
    if let Err(e) = state
        .outbound
        .send_reply(chat_id, &reply, Some(msg.id))
        .await
    {
        let OutboundReply::Document { filename, .. } = &reply else {
            return Err(e);
        };
        warn!(chat_id = chat_id.0, object = %filename, error = %e, "telegram refused document");
        let notice = OutboundReply::Text(format!("Error: could not send {filename}."));
        state
            .outbound
            .send_reply(chat_id, &notice, Some(msg.id))
            .await?;
    }

    info!(chat_id = chat_id.0, "telegram reply sent");
    Ok(())
}

/// Convert a Telegram message into a transport-neutral event.
///
/// A document attachment wins over any caption. Text is parsed as a
/// command. Everything else (photos, stickers, service messages) is
/// [`InboundEvent::Other`].
pub fn inbound_event(msg: &Message, bot: &Bot, bot_username: Option<&str>) -> InboundEvent {
    let MessageKind::Common(common) = &msg.kind else {
        return InboundEvent::Other;
    };

    match &common.media_kind {
        MediaKind::Document(d) => InboundEvent::Attachment(Attachment {
            filename: d.document.file_name.clone(),
            size: Some(u64::from(d.document.file.size)),
            source: Box::new(TelegramFile {
                bot: bot.clone(),
                file_id: d.document.file.id.clone(),
            }),
        }),
        MediaKind::Text(t) => InboundEvent::from_text(&t.text, bot_username),
        _ => InboundEvent::Other,
    }
}

fn event_kind(event: &InboundEvent) -> &'static str {
    match event {
        InboundEvent::Command { .. } => "command",
        InboundEvent::Attachment(_) => "attachment",
        InboundEvent::Other => "other",
    }
}

/// A file held by Telegram, downloaded on demand.
struct TelegramFile {
    bot: Bot,
    file_id: String,
}

#[async_trait]
impl AttachmentSource for TelegramFile {
    async fn fetch(&self) -> teledrive_common::Result<Bytes> {
        let file = self
            .bot
            .get_file(self.file_id.as_str())
            .await
            .map_err(|e| teledrive_common::Error::transport("telegram getFile", e))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| teledrive_common::Error::transport("telegram file download", e))?;

        debug!(file_id = %self.file_id, bytes = data.len(), "downloaded telegram file");
        Ok(Bytes::from(data))
    }
}
