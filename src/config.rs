use config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::graphics::Color;

/// Prefix for settings read from the environment, e.g. `FOCUS_OVERLAY_ACTIVE_COLOR`.
pub const ENV_PREFIX: &str = "FOCUS_OVERLAY";

pub fn def_active_color() -> Color {
    Color {
        red: 1.0,
        green: 0.0,
        blue: 0.0,
        alpha: 0.5,
    }
}

pub fn def_inactive_color() -> Color {
    Color {
        red: 0.0,
        green: 0.4,
        blue: 1.0,
        alpha: 0.25,
    }
}

pub fn def_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "def_active_color")]
    pub active_color: Color,

    #[serde(default = "def_inactive_color")]
    pub inactive_color: Color,

    /// Also highlight every other open window, not just the focused one.
    #[serde(default = "def_true")]
    pub track_inactive: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            active_color: def_active_color(),
            inactive_color: def_inactive_color(),
            track_inactive: def_true(),
        }
    }
}

impl GeneralConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(env: Environment) -> anyhow::Result<Self> {
        let settings = Config::builder().add_source(env).build()?;
        let config = settings.try_deserialize::<Self>()?;

        log::debug!(
            "Config: active {}, inactive {}, track_inactive {}",
            config.active_color,
            config.inactive_color,
            config.track_inactive
        );
        Ok(config)
    }
}
