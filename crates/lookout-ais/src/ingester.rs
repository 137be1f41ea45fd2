//! Long-lived AIS feed subscription.
//!
//! ```text
//! Idle → Connecting → Subscribed → Receiving ─┬─ remote close / failure → Backoff → Connecting …
//!                                             ├─ retry budget exhausted → Failed
//!                                             └─ cancelled              → Closed
//! ```
//!
//! The retry counter counts consecutive failed sessions. It is reset when a
//! session reaches `Subscribed`, so backoff only compounds across an unbroken
//! run of failures. Every suspension point (connect, subscribe, read,
//! backoff sleep) races the cancellation token.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lookout_core::BackoffPolicy;
use lookout_core::metrics::{
    AIS_FRAMES_SKIPPED_TOTAL, AIS_RECONNECTS_TOTAL, AIS_REPORTS_INGESTED_TOTAL,
    AIS_VESSELS_TRACKED,
};
use lookout_settings::AisSettings;
use metrics::{counter, gauge};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::errors::IngestError;
use crate::frames::{decode_position, subscribe_frame};
use crate::store::PositionStore;
use crate::transport::{FeedFrame, FeedSession, FeedTransport, WebSocketTransport};

/// Upper bound on opening a connection before it counts as a failure.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Observable ingester state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngesterState {
    /// Not started yet.
    Idle,
    /// Opening a connection.
    Connecting {
        /// 1-based attempt number within the current failure run.
        attempt: u32,
    },
    /// Subscribe frame sent; retry counter reset.
    Subscribed,
    /// Reading position reports.
    Receiving,
    /// Waiting before the next connection attempt.
    Backoff {
        /// Consecutive failures so far.
        retry_count: u32,
        /// Sleep before reconnecting.
        delay: Duration,
    },
    /// Terminal: stopped by cancellation.
    Closed,
    /// Terminal: gave up after exhausting the retry budget.
    Failed {
        /// Consecutive failures that exhausted the budget.
        retry_count: u32,
    },
    /// Terminal: disabled by configuration, never connected.
    Disabled,
}

impl IngesterState {
    /// Short lowercase label for health output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting { .. } => "connecting",
            Self::Subscribed => "subscribed",
            Self::Receiving => "receiving",
            Self::Backoff { .. } => "backoff",
            Self::Closed => "closed",
            Self::Failed { .. } => "failed",
            Self::Disabled => "disabled",
        }
    }

    /// Whether the ingester will make no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed { .. } | Self::Disabled)
    }
}

/// How a single connection session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    RemoteClosed(Option<String>),
    Failed(IngestError),
}

/// Keeps the [`PositionStore`] current from the AIS feed.
pub struct StreamIngester {
    settings: AisSettings,
    policy: BackoffPolicy,
    transport: Arc<dyn FeedTransport>,
    store: Arc<PositionStore>,
    state_tx: watch::Sender<IngesterState>,
}

impl StreamIngester {
    /// Create an ingester using the WebSocket transport.
    pub fn new(settings: AisSettings, store: Arc<PositionStore>) -> Self {
        Self::with_transport(settings, store, Arc::new(WebSocketTransport))
    }

    /// Create an ingester over a custom transport.
    pub fn with_transport(
        settings: AisSettings,
        store: Arc<PositionStore>,
        transport: Arc<dyn FeedTransport>,
    ) -> Self {
        let (state_tx, _) = watch::channel(IngesterState::Idle);
        Self {
            policy: settings.backoff(),
            settings,
            transport,
            store,
            state_tx,
        }
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<IngesterState> {
        self.state_tx.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> IngesterState {
        self.state_tx.borrow().clone()
    }

    /// Run until cancelled, disabled, or out of retries. Returns the terminal state.
    #[instrument(skip_all, fields(endpoint = %self.settings.endpoint))]
    pub async fn run(self, cancel: CancellationToken) -> IngesterState {
        if !self.settings.enabled {
            info!("AIS feed disabled, ingester not started");
            return self.finish(IngesterState::Disabled);
        }

        let mut retry_count: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return self.finish(IngesterState::Closed);
            }

            match self.run_session(&mut retry_count, &cancel).await {
                SessionEnd::Cancelled => return self.finish(IngesterState::Closed),
                SessionEnd::RemoteClosed(reason) => {
                    info!(?reason, "feed closed by remote");
                }
                SessionEnd::Failed(e) => {
                    warn!(error = %e, attempt = retry_count + 1, "feed session failed");
                }
            }

            retry_count += 1;
            if self.policy.is_exhausted(retry_count) {
                error!(
                    retry_count,
                    max_retries = self.policy.max_retries,
                    "AIS feed unreachable, giving up; vessel positions will go stale"
                );
                return self.finish(IngesterState::Failed { retry_count });
            }

            let delay = self.policy.delay(retry_count);
            info!(
                retry_count,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting to AIS feed after backoff"
            );
            counter!(AIS_RECONNECTS_TOTAL).increment(1);
            self.set_state(IngesterState::Backoff { retry_count, delay });

            tokio::select! {
                biased;
                () = cancel.cancelled() => return self.finish(IngesterState::Closed),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Connect, subscribe, and read until the session ends.
    async fn run_session(&self, retry_count: &mut u32, cancel: &CancellationToken) -> SessionEnd {
        self.set_state(IngesterState::Connecting {
            attempt: *retry_count + 1,
        });

        let connect = tokio::time::timeout(
            CONNECT_TIMEOUT,
            self.transport.connect(&self.settings.endpoint),
        );
        let mut session = tokio::select! {
            biased;
            () = cancel.cancelled() => return SessionEnd::Cancelled,
            result = connect => match result {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => return SessionEnd::Failed(e),
                Err(_) => {
                    return SessionEnd::Failed(IngestError::Connect(format!(
                        "timed out after {CONNECT_TIMEOUT:?}"
                    )));
                }
            },
        };

        let frame = match subscribe_frame(&self.settings.api_key, &self.settings.bounding_boxes) {
            Ok(frame) => frame,
            Err(e) => return SessionEnd::Failed(IngestError::Subscribe(e.to_string())),
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => return SessionEnd::Cancelled,
            result = session.send_text(frame) => {
                if let Err(e) = result {
                    return SessionEnd::Failed(e);
                }
            }
        }

        *retry_count = 0;
        self.set_state(IngesterState::Subscribed);
        info!(
            boxes = self.settings.bounding_boxes.len(),
            "subscribed to AIS feed"
        );

        self.set_state(IngesterState::Receiving);
        self.receive(&mut *session, cancel).await
    }

    async fn receive(&self, session: &mut dyn FeedSession, cancel: &CancellationToken) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return SessionEnd::Cancelled,
                frame = session.next_frame() => frame,
            };

            match frame {
                None => return SessionEnd::Failed(IngestError::StreamEnded),
                Some(Err(e)) => return SessionEnd::Failed(e),
                Some(Ok(FeedFrame::Close(reason))) => return SessionEnd::RemoteClosed(reason),
                Some(Ok(FeedFrame::Text(text))) => self.handle_text(&text),
                Some(Ok(FeedFrame::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => self.handle_text(&text),
                    Err(e) => {
                        counter!(AIS_FRAMES_SKIPPED_TOTAL).increment(1);
                        warn!(error = %e, "skipping non-UTF-8 feed frame");
                    }
                },
                Some(Ok(FeedFrame::Malformed(reason))) => {
                    counter!(AIS_FRAMES_SKIPPED_TOTAL).increment(1);
                    warn!(%reason, "skipping undecodable feed frame");
                }
                Some(Ok(FeedFrame::Control)) => {}
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match decode_position(text) {
            Ok(Some(update)) => {
                trace!(vessel = %update.id, "position report");
                let _ = self.store.upsert(update.into_record(Utc::now()));
                counter!(AIS_REPORTS_INGESTED_TOTAL).increment(1);
                #[allow(clippy::cast_precision_loss)]
                gauge!(AIS_VESSELS_TRACKED).set(self.store.len() as f64);
            }
            Ok(None) => debug!("ignoring non-position feed message"),
            Err(e) => {
                counter!(AIS_FRAMES_SKIPPED_TOTAL).increment(1);
                warn!(error = %e, len = text.len(), "skipping malformed feed frame");
            }
        }
    }

    fn set_state(&self, state: IngesterState) {
        debug!(?state, "ingester state");
        let _ = self.state_tx.send_replace(state);
    }

    fn finish(&self, state: IngesterState) -> IngesterState {
        if state == IngesterState::Closed {
            info!("AIS ingester stopped");
        }
        self.set_state(state.clone());
        state
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
