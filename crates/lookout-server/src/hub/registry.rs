//! Live connection registry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lookout_core::{Claims, ConnectionId};
use parking_lot::RwLock;
use serde::Serialize;

/// Who is behind one live connection.
///
/// Created on connect and never mutated; a reconnect under the same ID
/// replaces the entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Transport-assigned connection ID.
    pub connection_id: ConnectionId,
    /// Authenticated claims.
    #[serde(flatten)]
    pub claims: Claims,
    /// When the connection was registered.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Stamp a new entry with the current time.
    pub fn new(connection_id: ConnectionId, claims: Claims) -> Self {
        Self {
            connection_id,
            claims,
            connected_at: Utc::now(),
        }
    }
}

/// Presence query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenceFilter {
    /// Every live connection.
    All,
    /// Connections whose claims name this agency.
    Agency(i64),
    /// Connections whose claims name this station.
    Station(i64),
    /// Every device of one user.
    User(i64),
}

impl PresenceFilter {
    fn matches(&self, info: &ConnectionInfo) -> bool {
        match *self {
            Self::All => true,
            Self::Agency(agency) => info.claims.agency_id == Some(agency),
            Self::Station(station) => info.claims.station_id == Some(station),
            Self::User(user) => info.claims.user_id == user,
        }
    }
}

/// Map of connection ID to [`ConnectionInfo`]. Every read returns a snapshot.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, ConnectionInfo>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the replaced entry.
    pub fn put(&self, info: ConnectionInfo) -> Option<ConnectionInfo> {
        self.entries.write().insert(info.connection_id.clone(), info)
    }

    /// Remove and return an entry.
    pub fn remove(&self, id: &str) -> Option<ConnectionInfo> {
        self.entries.write().remove(id)
    }

    /// Look up one entry.
    pub fn get(&self, id: &str) -> Option<ConnectionInfo> {
        self.entries.read().get(id).cloned()
    }

    /// Entries matching `filter`, oldest connection first.
    pub fn query(&self, filter: &PresenceFilter) -> Vec<ConnectionInfo> {
        let mut found: Vec<ConnectionInfo> = self
            .entries
            .read()
            .values()
            .filter(|info| filter.matches(info))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        found
    }

    /// Every live connection.
    pub fn all(&self) -> Vec<ConnectionInfo> {
        self.query(&PresenceFilter::All)
    }

    /// Connections in an agency.
    pub fn by_agency(&self, agency_id: i64) -> Vec<ConnectionInfo> {
        self.query(&PresenceFilter::Agency(agency_id))
    }

    /// Connections in a station.
    pub fn by_station(&self, station_id: i64) -> Vec<ConnectionInfo> {
        self.query(&PresenceFilter::Station(station_id))
    }

    /// Connections of a user.
    pub fn by_user(&self, user_id: i64) -> Vec<ConnectionInfo> {
        self.query(&PresenceFilter::User(user_id))
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nobody is connected.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
