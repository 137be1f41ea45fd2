//! Metric names shared across crates.
//!
//! Recording happens through the `metrics` facade in each crate; the
//! Prometheus recorder is installed by the server binary.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection lifetime (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Events published to a group (counter, labels: event).
pub const HUB_PUBLISHES_TOTAL: &str = "hub_publishes_total";
/// Event deliveries dropped because a client queue was full or closed (counter).
pub const HUB_DELIVERY_DROPS_TOTAL: &str = "hub_delivery_drops_total";
/// Position reports written to the store (counter).
pub const AIS_REPORTS_INGESTED_TOTAL: &str = "ais_reports_ingested_total";
/// Feed frames skipped as malformed (counter).
pub const AIS_FRAMES_SKIPPED_TOTAL: &str = "ais_frames_skipped_total";
/// Feed reconnect attempts scheduled (counter).
pub const AIS_RECONNECTS_TOTAL: &str = "ais_reconnects_total";
/// Vessels currently held in the position store (gauge).
pub const AIS_VESSELS_TRACKED: &str = "ais_vessels_tracked";
