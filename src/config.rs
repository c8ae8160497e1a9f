//! Engine settings with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Environment variables: `CMDTREE_*` prefix

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment prefix read by [`Settings::load`].
pub const ENV_PREFIX: &str = "CMDTREE";

/// Behaviour switches of the invocation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Required options mapped to env vars are satisfied only if one is set.
    pub strict_required_env: bool,
    /// Warn on stderr when a deprecated command is run.
    pub deprecation_warnings: bool,
    /// ANSI colours in help and listings.
    pub color: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_required_env: false,
            deprecation_warnings: true,
            color: true,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `CMDTREE_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix(ENV_PREFIX)
    }

    /// Defaults overlaid with `<prefix>_*` environment variables.
    ///
    /// Env vars replace values; unset ones keep the default.
    pub fn load_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let config = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        if let Ok(val) = config.get_bool("strict_required_env") {
            settings.strict_required_env = val;
        }
        if let Ok(val) = config.get_bool("deprecation_warnings") {
            settings.deprecation_warnings = val;
        }
        if let Ok(val) = config.get_bool("color") {
            settings.color = val;
        }
        debug!(?settings, prefix, "settings loaded");
        Ok(settings)
    }
}
