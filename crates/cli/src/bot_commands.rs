use std::sync::Arc;

use {
    anyhow::Result,
    secrecy::ExposeSecret,
    tracing::{info, warn},
};

use {
    teledrive_config::{BotConfig, TeledriveConfig},
    teledrive_telegram::{Router, RouterConfig, TelegramBotConfig, bot::start_polling},
};

use crate::{config_commands, storage_commands};

pub fn router_config(bot: &BotConfig) -> RouterConfig {
    RouterConfig {
        list_limit: bot.list_limit,
        share_ttl: bot.share_ttl(),
        max_upload_bytes: bot.max_upload_bytes,
    }
}

pub fn telegram_config(config: &TeledriveConfig) -> TelegramBotConfig {
    TelegramBotConfig {
        api_url: config.telegram.api_url.clone(),
        router: router_config(&config.bot),
        ..TelegramBotConfig::new(config.telegram.token.expose_secret().as_str())
    }
}

/// Check the bucket, then serve Telegram until Ctrl-C or until polling
/// stops on its own.
pub async fn run(config: TeledriveConfig, memory: bool) -> Result<()> {
    config_commands::validate(&config, true)?;

    let storage = storage_commands::open_gateway(&config.storage, memory).await;
    storage_commands::ensure_bucket(storage.as_ref()).await?;

    let router = Arc::new(Router::new(storage, router_config(&config.bot)));
    let (cancel, polling) = start_polling(telegram_config(&config), router).await?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("shutdown requested");
            cancel.cancel();
        },
        () = cancel.cancelled() => {
            warn!("telegram polling stopped");
        },
    }

    polling.await?;
    info!("teledrive stopped");
    Ok(())
}
