//! Server and auth settings.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` auto-assigns).
    pub port: u16,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue length before events are dropped.
    pub client_channel_capacity: usize,
    /// Interval between server pings, in milliseconds.
    pub ping_interval_ms: u64,
    /// Seconds to wait for background tasks on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_message_size: 64 * 1024,
            client_channel_capacity: 256,
            ping_interval_ms: 30_000,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Token verification settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HMAC secret for HS256 access tokens. Empty rejects every token.
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Expected `iss` claim, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}
