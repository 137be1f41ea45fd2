//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may specify any subset of fields.

mod ais;
mod server;

pub use ais::*;
pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9090 },
///   "ais": { "enabled": true, "apiKey": "…", "boundingBoxes": [[[35.0, 19.0], [41.0, 29.0]]] }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookoutSettings {
    /// HTTP/WebSocket server settings.
    pub server: ServerSettings,
    /// Token verification settings.
    pub auth: AuthSettings,
    /// Vessel position feed settings.
    pub ais: AisSettings,
}

impl LookoutSettings {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.client_channel_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.clientChannelCapacity must be at least 1".into(),
            ));
        }
        if self.server.ping_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "server.pingIntervalMs must be at least 1".into(),
            ));
        }
        self.ais.validate()
    }
}
