use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    Error, Result,
    config::TelegramBotConfig,
    handlers,
    outbound::TelegramOutbound,
    router::{Command, Router},
    state::BotState,
};

/// HTTP timeout for Bot API calls. Must exceed the long-polling timeout so
/// the client does not abort `getUpdates` before Telegram answers.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(45);

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot client, honouring an API URL override.
pub fn build_bot(config: &TelegramBotConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .map_err(|e| Error::message(format!("telegram http client: {e}")))?;
    let mut bot = Bot::with_client(config.token.expose_secret(), client);

    if let Some(api_url) = &config.api_url {
        let url = url::Url::parse(api_url)
            .map_err(|e| Error::message(format!("invalid telegram api url {api_url}: {e}")))?;
        bot = bot.set_api_url(url);
    }

    Ok(bot)
}

/// Connect to Telegram and start polling.
///
/// Verifies the token, clears any webhook, registers the command list and
/// spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(
    config: TelegramBotConfig,
    router: Arc<Router>,
) -> Result<(CancellationToken, JoinHandle<()>)> {
    let bot = build_bot(&config)?;

    // Verify credentials and get bot username.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    let commands: Vec<BotCommand> = Command::ALL
        .iter()
        .map(|c| BotCommand::new(c.name(), c.description()))
        .collect();
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    let cancel = CancellationToken::new();
    let state = BotState {
        outbound: TelegramOutbound::new(bot.clone()),
        bot,
        bot_username,
        router,
        cancel: cancel.clone(),
    };

    let handle = tokio::spawn(poll_updates(state, config.poll_timeout_secs));
    Ok((cancel, handle))
}

async fn poll_updates(state: BotState, poll_timeout_secs: u32) {
    info!("starting telegram manual polling loop");
    let cancel = state.cancel.clone();
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = state
                .bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            debug!(chat_id = msg.chat.id.0, "received telegram message");
                            if let Err(e) = handlers::handle_message_direct(msg, &state).await {
                                error!(error = %e, "error handling telegram message");
                            }
                        },
                        other => {
                            debug!("ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(e) => {
                // Another process is polling with the same token.
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!("telegram polling disabled: another instance is already running with this token");
                    cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                }
            },
        }
    }
}
