//! Group-scoped event fan-out.
//!
//! [`BroadcastHub`] owns three indexes: the [`ConnectionRegistry`] (who is
//! connected), the [`GroupMembership`] index (who is in which group), and the
//! per-connection delivery handles. `publish` snapshots recipients under the
//! read locks and delivers after releasing them, so one slow client cannot
//! stall the producer or any other client.

pub mod membership;
pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lookout_core::metrics::{HUB_DELIVERY_DROPS_TOTAL, HUB_PUBLISHES_TOTAL};
use lookout_core::{Claims, ConnectionId, Group};
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::websocket::connection::ClientConnection;

pub use membership::GroupMembership;
pub use registry::{ConnectionInfo, ConnectionRegistry, PresenceFilter};

/// Outbound event envelope.
#[derive(Clone, Debug, Serialize)]
pub struct HubEvent<'a> {
    /// Event name (e.g. `IncidentUpdated`).
    pub event: &'a str,
    /// Group the event was published to.
    pub group: &'a Group,
    /// Event body, passed through untouched.
    pub payload: &'a Value,
    /// Publish time.
    pub timestamp: DateTime<Utc>,
}

/// Fan-out hub for connected clients.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    registry: ConnectionRegistry,
    membership: GroupMembership,
    clients: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and join its claim-derived groups.
    ///
    /// A connection already registered under the same ID is replaced and its
    /// previous memberships dropped. Returns the groups joined.
    pub fn on_connect(&self, connection: Arc<ClientConnection>, claims: Claims) -> Vec<Group> {
        let id = connection.id.clone();
        let dropped = self.membership.remove_connection(&id);
        if !dropped.is_empty() {
            debug!(conn_id = %id, dropped = dropped.len(), "replacing prior connection state");
        }

        let groups = Group::for_claims(&claims);
        let _ = self.registry.put(ConnectionInfo::new(id.clone(), claims));
        let _ = self.clients.write().insert(id.clone(), connection);
        for group in &groups {
            let _ = self.membership.join(&id, group.clone());
        }

        info!(conn_id = %id, groups = groups.len(), "connection registered");
        groups
    }

    /// Forget a connection and every membership it held. Unknown IDs are a no-op.
    pub fn on_disconnect(&self, id: &ConnectionId) -> Option<ConnectionInfo> {
        let _ = self.clients.write().remove(id);
        let groups = self.membership.remove_connection(id);
        let info = self.registry.remove(id);
        if info.is_some() {
            info!(conn_id = %id, groups = groups.len(), "connection removed");
        }
        info
    }

    /// Add a live connection to `group`. Returns `false` for unknown
    /// connections and for repeat joins.
    pub fn join_group(&self, id: &ConnectionId, group: Group) -> bool {
        if self.registry.get(id).is_none() {
            debug!(conn_id = %id, %group, "join for unknown connection ignored");
            return false;
        }
        let joined = self.membership.join(id, group.clone());
        if joined {
            debug!(conn_id = %id, %group, "joined group");
        }
        joined
    }

    /// Remove a connection from `group`. Returns `false` if it was not a member.
    pub fn leave_group(&self, id: &ConnectionId, group: &Group) -> bool {
        let left = self.membership.leave(id, group);
        if left {
            debug!(conn_id = %id, %group, "left group");
        }
        left
    }

    /// Re-join only the roster groups derived from the connection's claims.
    pub fn join_roster_groups(&self, id: &ConnectionId) -> Vec<Group> {
        let Some(info) = self.registry.get(id) else {
            return Vec::new();
        };
        let groups = Group::roster_for_claims(&info.claims);
        for group in &groups {
            let _ = self.membership.join(id, group.clone());
        }
        debug!(conn_id = %id, groups = groups.len(), "joined roster groups");
        groups
    }

    /// Deliver an event to every current member of `group`.
    ///
    /// Returns the number of recipients the event was queued for. Clients
    /// whose queue is full or closed are skipped.
    pub fn publish(&self, group: &Group, event: &str, payload: &Value) -> usize {
        let envelope = HubEvent {
            event,
            group,
            payload,
            timestamp: Utc::now(),
        };
        let json = match serde_json::to_string(&envelope) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!(event, %group, error = %e, "failed to serialize event");
                return 0;
            }
        };

        let members = self.membership.members(group);
        let recipients: Vec<Arc<ClientConnection>> = {
            let clients = self.clients.read();
            members.iter().filter_map(|id| clients.get(id).cloned()).collect()
        };

        counter!(HUB_PUBLISHES_TOTAL).increment(1);
        let mut delivered = 0;
        for conn in &recipients {
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                counter!(HUB_DELIVERY_DROPS_TOTAL).increment(1);
                warn!(conn_id = %conn.id, event, %group, "dropped event for client");
            }
        }
        debug!(event, %group, recipients = recipients.len(), delivered, "published event");
        delivered
    }

    /// Snapshot presence query.
    pub fn query_presence(&self, filter: &PresenceFilter) -> Vec<ConnectionInfo> {
        self.registry.query(filter)
    }

    /// Registry entry for one connection.
    pub fn connection(&self, id: &str) -> Option<ConnectionInfo> {
        self.registry.get(id)
    }

    /// Groups a connection is currently in.
    pub fn groups_of(&self, id: &ConnectionId) -> Vec<Group> {
        self.membership.groups_of(id)
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}
