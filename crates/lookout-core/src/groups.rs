//! Broadcast groups.
//!
//! A [`Group`] is a typed topic. It is formatted to its wire name
//! (`Agency_5`, `Incident_42`, `GlobalDispatchers`, …) only when it crosses
//! the hub boundary, and parsed back from that name at client ingress.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::claims::Claims;
use crate::errors::GroupParseError;

/// A broadcast topic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Group {
    /// General notifications for an agency.
    Agency(i64),
    /// Roster view of an agency.
    RosterAgency(i64),
    /// General notifications for a station.
    Station(i64),
    /// Roster view of a station.
    RosterStation(i64),
    /// Everyone holding a role.
    Role(String),
    /// Every dispatcher, regardless of agency.
    GlobalDispatchers,
    /// Viewers of a single incident.
    Incident(i64),
    /// Viewers of a single vehicle.
    Vehicle(i64),
}

const GLOBAL_DISPATCHERS: &str = "GlobalDispatchers";

impl Group {
    /// Groups a connection joins on connect, derived only from its claims.
    ///
    /// Absent or blank claims are skipped; the result for a partial claim set
    /// is a subset of the result for the full one.
    pub fn for_claims(claims: &Claims) -> Vec<Self> {
        let mut groups = Vec::with_capacity(6);
        if let Some(agency) = claims.agency_id {
            groups.push(Self::Agency(agency));
            groups.push(Self::RosterAgency(agency));
        }
        if let Some(station) = claims.station_id {
            groups.push(Self::Station(station));
            groups.push(Self::RosterStation(station));
        }
        if let Some(role) = claims.role() {
            groups.push(Self::Role(role.to_owned()));
        }
        if claims.is_dispatcher() {
            groups.push(Self::GlobalDispatchers);
        }
        groups
    }

    /// Roster-only groups (no general agency/station notifications).
    pub fn roster_for_claims(claims: &Claims) -> Vec<Self> {
        claims
            .agency_id
            .map(Self::RosterAgency)
            .into_iter()
            .chain(claims.station_id.map(Self::RosterStation))
            .collect()
    }

    /// Whether clients may join or leave this group on demand.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(self, Self::Incident(_) | Self::Vehicle(_))
    }

    /// The wire name of this group.
    pub fn wire_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agency(id) => write!(f, "Agency_{id}"),
            Self::RosterAgency(id) => write!(f, "RosterAgency_{id}"),
            Self::Station(id) => write!(f, "Station_{id}"),
            Self::RosterStation(id) => write!(f, "RosterStation_{id}"),
            Self::Role(role) => write!(f, "Role_{role}"),
            Self::GlobalDispatchers => f.write_str(GLOBAL_DISPATCHERS),
            Self::Incident(id) => write!(f, "Incident_{id}"),
            Self::Vehicle(id) => write!(f, "Vehicle_{id}"),
        }
    }
}

impl FromStr for Group {
    type Err = GroupParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(GroupParseError::Empty);
        }
        if s == GLOBAL_DISPATCHERS {
            return Ok(Self::GlobalDispatchers);
        }
        let (prefix, key) = s
            .split_once('_')
            .ok_or_else(|| GroupParseError::UnknownPrefix(s.to_owned()))?;

        let numeric = |ctor: fn(i64) -> Self| {
            key.parse::<i64>()
                .map(ctor)
                .map_err(|_| GroupParseError::InvalidKey {
                    group: s.to_owned(),
                    key: key.to_owned(),
                })
        };

        match prefix {
            "Agency" => numeric(Self::Agency),
            "RosterAgency" => numeric(Self::RosterAgency),
            "Station" => numeric(Self::Station),
            "RosterStation" => numeric(Self::RosterStation),
            "Incident" => numeric(Self::Incident),
            "Vehicle" => numeric(Self::Vehicle),
            "Role" if !key.is_empty() => Ok(Self::Role(key.to_owned())),
            "Role" => Err(GroupParseError::InvalidKey {
                group: s.to_owned(),
                key: String::new(),
            }),
            _ => Err(GroupParseError::UnknownPrefix(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Group {
    type Error = GroupParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Group> for String {
    fn from(group: Group) -> Self {
        group.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
