//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use lookout_core::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use lookout_core::{Claims, ConnectionId, Group};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::handle_message;
use crate::hub::BroadcastHub;

/// Per-session knobs taken from the server settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Outbound queue length.
    pub channel_capacity: usize,
    /// Interval between server pings.
    pub ping_interval: Duration,
}

impl SessionConfig {
    /// Silence after which a client is considered dead.
    fn pong_timeout(&self) -> Duration {
        self.ping_interval * 2
    }
}

/// Build the greeting sent before anything else.
pub fn established_message(conn_id: &ConnectionId, groups: &[Group]) -> serde_json::Value {
    serde_json::json!({
        "type": "connection.established",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "data": {
            "connectionId": conn_id,
            "groups": groups,
        },
    })
}

/// Run a WebSocket session for an authenticated client.
///
/// 1. Registers with the hub, joining claim-derived groups
/// 2. Sends `connection.established` with the connection ID and groups
/// 3. Forwards hub events through the outbound queue, pinging periodically
/// 4. Applies inbound join/leave commands and replies to each
/// 5. Deregisters on disconnect or server shutdown
#[instrument(skip_all, fields(conn_id = %conn_id, user_id = claims.user_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    claims: Claims,
    hub: Arc<BroadcastHub>,
    config: SessionConfig,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(config.channel_capacity);
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), send_tx));

    let started = Instant::now();
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    let groups = hub.on_connect(connection.clone(), claims);
    info!(groups = groups.len(), "client connected");

    if let Ok(json) = serde_json::to_string(&established_message(&conn_id, &groups)) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    let outbound_conn = connection.clone();
    let outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(config.ping_interval);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > config.pong_timeout()
                    {
                        warn!(timeout = ?config.pong_timeout(), "client unresponsive, disconnecting");
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        let msg = tokio::select! {
            () = shutdown.cancelled() => {
                debug!("server shutting down, closing session");
                break;
            }
            msg = ws_rx.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    Some(s.to_owned())
                } else {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            }
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => None,
        };
        connection.mark_alive();

        let Some(text) = text else { continue };
        let reply = handle_message(&text, &conn_id, &hub);
        if !connection.send_json(&reply) {
            info!("failed to enqueue reply (channel full or closed)");
        }
    }

    let _ = hub.on_disconnect(&conn_id);
    outbound.abort();

    info!(dropped = connection.drop_count(), "client disconnected");
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}
