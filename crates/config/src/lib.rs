//! Configuration loading, validation, env substitution, and env overrides.
//!
//! Config files: `teledrive.toml`, `teledrive.yaml`, or `teledrive.json`
//! Searched in `./` then `~/.config/teledrive/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values. The variables
//! of the container deployment (`TELEGRAM_TOKEN`,
//! `MINIO_ENDPOINT`, ...) override file values.

pub mod env_overrides;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    env_overrides::apply_env_overrides,
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{BotConfig, StorageConfig, TelegramConfig, TeledriveConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
