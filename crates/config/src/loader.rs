use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_overrides::apply_env_overrides,
    env_subst::substitute_env,
    error::{Error, Result},
    schema::TeledriveConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "teledrive.toml",
    "teledrive.yaml",
    "teledrive.yml",
    "teledrive.json",
];

/// Load config from the given path (any supported format).
///
/// Environment overrides are not applied here; see [`discover_and_load`].
pub fn load_config(path: &Path) -> Result<TeledriveConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the effective configuration.
///
/// With an explicit `path` the file must exist and parse. Otherwise the
/// search order is:
/// 1. `./teledrive.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/teledrive/teledrive.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to defaults when no file is found or the discovered file is
/// unreadable. Environment overrides are applied last in every case.
pub fn discover_and_load(path: Option<&Path>) -> Result<TeledriveConfig> {
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => match find_config_file() {
            Some(path) => {
                debug!(path = %path.display(), "loading config");
                load_config(&path).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    TeledriveConfig::default()
                })
            },
            None => {
                debug!("no config file found, using defaults");
                TeledriveConfig::default()
            },
        },
    };
    Ok(apply_env_overrides(config))
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .chain(
            config_dir()
                .into_iter()
                .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name))),
        )
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/teledrive/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "teledrive").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<TeledriveConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_error = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_error(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_error(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_error(e.to_string())),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
