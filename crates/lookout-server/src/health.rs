//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live WebSocket connections.
    pub connections: usize,
    /// Vessels with a known position.
    pub vessels: usize,
    /// Feed ingester state, when one is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed: Option<&'static str>,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    connections: usize,
    vessels: usize,
    feed: Option<&'static str>,
) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        vessels,
        feed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_and_uptime() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, 5, 3, Some("receiving"));
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs >= 59);
        assert_eq!(resp.connections, 5);
        assert_eq!(resp.vessels, 3);
    }

    #[test]
    fn serialization() {
        let json = serde_json::to_value(health_check(Instant::now(), 2, 1, None)).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["connections"], 2);
        assert_eq!(json["vessels"], 1);
        assert!(json["uptimeSecs"].is_number());
        assert!(json.get("feed").is_none());
    }
}
