//! # Output Configuration
//!
//! Controls how the CLI decorates its summary lines. Tool output is streamed
//! through untouched; only `boost-ci`'s own lines use colors and emoji.
//!
//! The following flags and environment variables are respected:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! CI logs are usually not a TTY, so `auto` produces plain `[PASS]`/`[SKIP]`
//! markers there unless `CLICOLOR_FORCE` is set.

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: `always` forces colors on
    /// (overriding `NO_COLOR`), `never` forces them off, anything else
    /// detects support from the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// `text` in green when colors are enabled.
    pub fn good(&self, text: &str) -> String {
        if self.use_color {
            style(text).green().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }

    /// `text` in bold red when colors are enabled.
    pub fn bad(&self, text: &str) -> String {
        if self.use_color {
            style(text).red().bold().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }

    /// `text` dimmed when colors are enabled.
    pub fn muted(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
