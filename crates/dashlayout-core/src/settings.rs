//! Engine configuration.
//!
//! Every tunable constant of the engine lives here so a dashboard can ship a
//! JSON settings file instead of patching code.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Environment variable overriding [`RemoteConfig::base_url`].
pub const STORE_URL_ENV: &str = "DASHLAYOUT_STORE_URL";

/// Default remote store address.
pub const DEFAULT_STORE_URL: &str = "http://localhost:1337";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid remote store URL {url:?}: {reason}")]
    Url { url: String, reason: String },
}

/// Remote store connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the store, without the `/api` path.
    pub base_url: String,
    /// Collection holding layout records.
    pub collection: String,
    /// Request timeout in milliseconds (native only).
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORE_URL.to_string(),
            collection: "component-layouts".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl RemoteConfig {
    /// Defaults, with the base URL taken from `DASHLAYOUT_STORE_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(STORE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Tunables for interaction, stacking, loading and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distance kept between a widget and the viewport edges.
    pub viewport_margin: f64,
    /// Arrow-key nudge distance in pixels.
    pub nudge_step: f64,
    /// Nudge multiplier while Shift is held.
    pub nudge_shift_multiplier: f64,
    /// Nudge multiplier while Ctrl or Cmd is held.
    pub nudge_ctrl_multiplier: f64,
    /// Alt+arrow resize step.
    pub resize_key_step: f64,
    /// Alt+Shift+arrow resize step.
    pub resize_key_shift_step: f64,
    /// Smallest width/height reachable by dragging a resize handle.
    pub min_resize_extent: f64,
    /// Rotation step for `r`.
    pub rotate_step: f64,
    /// Rotation step for Shift+`r`.
    pub rotate_shift_step: f64,
    /// Minimum stacking order of the selected widget in edit mode.
    pub edit_selected_z_floor: i32,
    /// Upper bound for keyboard z-index stepping.
    pub max_z_index: i32,
    /// Minimum hit-area extent for selection.
    pub min_selection_size: f64,
    /// Safety timeout forcing the loading coordinator to `Ready`.
    pub phase_timeout_ms: u64,
    /// Prefix of local cache keys.
    pub cache_key_prefix: String,
    /// Remote store settings.
    pub remote: RemoteConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport_margin: 20.0,
            nudge_step: 1.0,
            nudge_shift_multiplier: 10.0,
            nudge_ctrl_multiplier: 5.0,
            resize_key_step: 5.0,
            resize_key_shift_step: 20.0,
            min_resize_extent: 10.0,
            rotate_step: 15.0,
            rotate_shift_step: 45.0,
            edit_selected_z_floor: 9998,
            max_z_index: 999,
            min_selection_size: 60.0,
            phase_timeout_ms: 5000,
            cache_key_prefix: "component-".to_string(),
            remote: RemoteConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON settings document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        url::Url::parse(&config.remote.base_url).map_err(|e| ConfigError::Url {
            url: config.remote.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    pub fn phase_timeout(&self) -> Duration {
        Duration::from_millis(self.phase_timeout_ms)
    }
}
