use anyhow::{Result, bail};

use teledrive_config::{Severity, TeledriveConfig};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print validation diagnostics to stderr and fail on errors.
///
/// `require_token` is false for commands that never talk to Telegram.
pub fn validate(config: &TeledriveConfig, require_token: bool) -> Result<()> {
    let result = config.validate(require_token);

    for d in &result.diagnostics {
        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
        };
        eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
    }

    let errors = result.errors().count();
    if errors > 0 {
        let warnings = result.warnings().count();
        bail!("invalid configuration: {errors} error(s), {warnings} warning(s)");
    }

    Ok(())
}
