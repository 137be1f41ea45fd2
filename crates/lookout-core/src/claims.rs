//! Authenticated attributes of a connection.
//!
//! Claims are produced by the authentication layer and consumed verbatim by
//! the hub. Any field other than the user ID may be absent; a partial claim
//! set is valid and simply yields fewer broadcast groups.

use serde::{Deserialize, Serialize};

/// The role that additionally joins the global dispatcher group.
pub const DISPATCHER_ROLE: &str = "Dispatcher";

/// Identity and organizational scope of an authenticated user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Numeric user ID.
    pub user_id: i64,
    /// Role name (e.g. `"Dispatcher"`, `"Viewer"`).
    #[serde(default)]
    pub role: Option<String>,
    /// Agency the user belongs to.
    #[serde(default)]
    pub agency_id: Option<i64>,
    /// Station the user belongs to.
    #[serde(default)]
    pub station_id: Option<i64>,
}

impl Claims {
    /// Claims carrying only a user ID.
    #[must_use]
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    /// Set the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the agency.
    #[must_use]
    pub fn with_agency(mut self, agency_id: i64) -> Self {
        self.agency_id = Some(agency_id);
        self
    }

    /// Set the station.
    #[must_use]
    pub fn with_station(mut self, station_id: i64) -> Self {
        self.station_id = Some(station_id);
        self
    }

    /// The role, or `None` when absent or blank.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }

    /// Whether this user holds the dispatcher role.
    pub fn is_dispatcher(&self) -> bool {
        self.role() == Some(DISPATCHER_ROLE)
    }
}
