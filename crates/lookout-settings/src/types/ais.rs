//! Vessel position feed settings.

use std::time::Duration;

use lookout_core::retry::{BackoffPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default feed endpoint.
pub const DEFAULT_AIS_ENDPOINT: &str = "wss://stream.aisstream.io/v0/stream";

/// A geographic rectangle as two `[latitude, longitude]` corners.
///
/// Serialized exactly as the feed expects: `[[lat1, lon1], [lat2, lon2]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox(pub [[f64; 2]; 2]);

impl BoundingBox {
    /// Build from two corners.
    pub fn new(corner_a: (f64, f64), corner_b: (f64, f64)) -> Self {
        Self([[corner_a.0, corner_a.1], [corner_b.0, corner_b.1]])
    }

    /// Whether both corners are valid WGS84 coordinates.
    pub fn is_valid(&self) -> bool {
        self.0
            .iter()
            .all(|[lat, lon]| (-90.0..=90.0).contains(lat) && (-180.0..=180.0).contains(lon))
    }
}

/// Settings for the AIS stream ingester.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AisSettings {
    /// When false the ingester never opens a connection.
    pub enabled: bool,
    /// Feed API key sent in the subscribe frame.
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Feed WebSocket URL.
    pub endpoint: String,
    /// Areas to subscribe to.
    pub bounding_boxes: Vec<BoundingBox>,
    /// Delay after the first consecutive failure, in milliseconds.
    pub base_delay_ms: u64,
    /// Consecutive failures before the ingester gives up.
    pub max_retries: u32,
}

impl Default for AisSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            endpoint: DEFAULT_AIS_ENDPOINT.to_string(),
            bounding_boxes: Vec::new(),
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl AisSettings {
    /// Backoff policy derived from these settings.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(self.base_delay_ms), self.max_retries)
    }

    /// Validate an enabled feed configuration. A disabled feed is always valid.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.api_key.trim().is_empty() {
            return Err(SettingsError::InvalidValue("ais.apiKey is empty".into()));
        }
        if self.bounding_boxes.is_empty() {
            return Err(SettingsError::InvalidValue(
                "ais.boundingBoxes must contain at least one box".into(),
            ));
        }
        if let Some(bad) = self.bounding_boxes.iter().find(|b| !b.is_valid()) {
            return Err(SettingsError::InvalidValue(format!(
                "ais.boundingBoxes has out-of-range corner: {:?}",
                bad.0
            )));
        }
        if self.max_retries == 0 {
            return Err(SettingsError::InvalidValue(
                "ais.maxRetries must be at least 1".into(),
            ));
        }
        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(SettingsError::InvalidValue(format!(
                "ais.endpoint is not a WebSocket URL: {}",
                self.endpoint
            )));
        }
        Ok(())
    }
}
