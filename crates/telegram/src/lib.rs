//! Telegram front end for teledrive.
//!
//! Receives updates with teloxide long polling, turns each message into an
//! [`InboundEvent`](teledrive_common::types::InboundEvent), dispatches it
//! through the [`router::Router`] and sends the single reply back.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod router;
pub mod state;

pub use {
    config::{RouterConfig, TelegramBotConfig},
    error::{Error, Result},
    router::Router,
};
