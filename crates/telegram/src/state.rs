use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{outbound::TelegramOutbound, router::Router};

/// Runtime state shared by the polling loop and message handlers.
#[derive(Clone)]
pub struct BotState {
    pub bot: teloxide::Bot,
    /// Without the `@`. Used to recognise `/cmd@username`.
    pub bot_username: Option<String>,
    pub router: Arc<Router>,
    pub outbound: TelegramOutbound,
    pub cancel: CancellationToken,
}
