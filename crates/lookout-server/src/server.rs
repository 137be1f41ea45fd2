//! `LookoutServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use lookout_ais::{IngesterState, PositionStore, ShipRecord};
use lookout_core::ConnectionId;
use lookout_settings::ServerSettings;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{Authenticated, SharedResolver};
use crate::health::{self, HealthResponse};
use crate::hub::{BroadcastHub, ConnectionInfo, PresenceFilter};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{SessionConfig, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Group fan-out hub.
    pub hub: Arc<BroadcastHub>,
    /// Latest vessel positions.
    pub store: Arc<PositionStore>,
    /// Token verification.
    pub resolver: SharedResolver,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
    /// Feed ingester state, when one runs alongside the server.
    pub feed_state: Option<watch::Receiver<IngesterState>>,
    /// Per-session settings.
    pub session: SessionConfig,
    /// Maximum inbound WebSocket message size.
    pub max_message_size: usize,
    /// When the server started.
    pub start_time: Instant,
}

/// The Lookout server.
pub struct LookoutServer {
    settings: ServerSettings,
    state: AppState,
}

impl LookoutServer {
    /// Create a server over an existing position store.
    pub fn new(
        settings: ServerSettings,
        resolver: SharedResolver,
        store: Arc<PositionStore>,
        metrics: PrometheusHandle,
    ) -> Self {
        let state = AppState {
            hub: Arc::new(BroadcastHub::new()),
            store,
            resolver,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics,
            feed_state: None,
            session: SessionConfig {
                channel_capacity: settings.client_channel_capacity,
                ping_interval: Duration::from_millis(settings.ping_interval_ms),
            },
            max_message_size: settings.max_message_size,
            start_time: Instant::now(),
        };
        Self { settings, state }
    }

    /// Report the ingester's state on `/health`.
    #[must_use]
    pub fn with_feed_state(mut self, feed_state: watch::Receiver<IngesterState>) -> Self {
        self.state.feed_state = Some(feed_state);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .route("/api/presence", get(presence_handler))
            .route("/api/ships", get(ships_handler))
            .route("/api/ships/{id}", get(ship_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind and serve in a background task until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.settings.host.as_str(), self.settings.port)).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "lookout server listening");

        let app = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
            info!("lookout server stopped");
        });
        Ok((addr, handle))
    }

    /// Group fan-out hub, for producers.
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.state.hub
    }

    /// Position store.
    pub fn store(&self) -> &Arc<PositionStore> {
        &self.state.store
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Server settings.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let feed = state.feed_state.as_ref().map(|rx| rx.borrow().name());
    Json(health::health_check(
        state.start_time,
        state.hub.connection_count(),
        state.store.len(),
        feed,
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// GET /ws
async fn ws_handler(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    ws: WebSocketUpgrade,
) -> Response {
    let conn_id = ConnectionId::generate();
    let hub = state.hub.clone();
    let token = state.shutdown.token();
    let session = state.session;
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| run_ws_session(socket, conn_id, claims, hub, session, token))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresenceQuery {
    agency_id: Option<i64>,
    station_id: Option<i64>,
    user_id: Option<i64>,
}

impl PresenceQuery {
    fn filter(&self) -> Option<PresenceFilter> {
        match (self.agency_id, self.station_id, self.user_id) {
            (None, None, None) => Some(PresenceFilter::All),
            (Some(agency), None, None) => Some(PresenceFilter::Agency(agency)),
            (None, Some(station), None) => Some(PresenceFilter::Station(station)),
            (None, None, Some(user)) => Some(PresenceFilter::User(user)),
            _ => None,
        }
    }
}

/// GET /api/presence
async fn presence_handler(
    State(state): State<AppState>,
    _caller: Authenticated,
    Query(query): Query<PresenceQuery>,
) -> Response {
    match query.filter() {
        Some(filter) => Json::<Vec<ConnectionInfo>>(state.hub.query_presence(&filter)).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "use at most one of agencyId, stationId, userId"
            })),
        )
            .into_response(),
    }
}

/// GET /api/ships
async fn ships_handler(State(state): State<AppState>, _caller: Authenticated) -> Json<Vec<ShipRecord>> {
    Json(state.store.all())
}

/// GET /api/ships/{id}
async fn ship_handler(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ShipRecord>, StatusCode> {
    state.store.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}
