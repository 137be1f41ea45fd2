//! Inbound client commands.
//!
//! ```json
//! {"type": "joinGroup", "group": "Incident_7"}
//! {"type": "leaveGroup", "group": "Vehicle_3"}
//! {"type": "joinRosterGroups"}
//! ```
//!
//! Clients may only join or leave entity-scoped groups. Claim-derived
//! groups are fixed for the life of the connection.

use lookout_core::{ConnectionId, Group};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::hub::BroadcastHub;

/// A command sent by a client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Subscribe to an incident or vehicle group.
    JoinGroup {
        /// Wire group name.
        group: String,
    },
    /// Unsubscribe from an incident or vehicle group.
    LeaveGroup {
        /// Wire group name.
        group: String,
    },
    /// Re-join the roster groups derived from the connection's claims.
    JoinRosterGroups,
}

/// Reply codes for rejected commands.
pub mod codes {
    /// Not JSON, or not a known command.
    pub const INVALID_MESSAGE: &str = "INVALID_MESSAGE";
    /// The group name does not parse.
    pub const INVALID_GROUP: &str = "INVALID_GROUP";
    /// The group exists but clients may not join or leave it.
    pub const FORBIDDEN_GROUP: &str = "FORBIDDEN_GROUP";
}

/// Reply to a client command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerReply {
    /// The connection is now in `group`.
    GroupJoined {
        /// Wire group name.
        group: Group,
    },
    /// The connection is no longer in `group`.
    GroupLeft {
        /// Wire group name.
        group: Group,
    },
    /// Roster groups re-joined.
    RosterGroupsJoined {
        /// Wire group names.
        groups: Vec<Group>,
    },
    /// The command was rejected.
    Error {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable detail.
        message: String,
    },
}

impl ServerReply {
    fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

fn parse_entity_group(name: &str) -> Result<Group, ServerReply> {
    let group: Group = name
        .parse()
        .map_err(|e| ServerReply::error(codes::INVALID_GROUP, format!("{e}")))?;
    if group.is_entity_scoped() {
        Ok(group)
    } else {
        Err(ServerReply::error(
            codes::FORBIDDEN_GROUP,
            format!("clients may not join or leave {group}"),
        ))
    }
}

/// Apply one inbound text frame and build the reply.
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub fn handle_message(text: &str, conn_id: &ConnectionId, hub: &BroadcastHub) -> ServerReply {
    let command: ClientCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(error = %e, "invalid client message");
            return ServerReply::error(codes::INVALID_MESSAGE, format!("invalid message: {e}"));
        }
    };
    debug!(?command, "client command");

    match command {
        ClientCommand::JoinGroup { group } => match parse_entity_group(&group) {
            Ok(group) => {
                let _ = hub.join_group(conn_id, group.clone());
                ServerReply::GroupJoined { group }
            }
            Err(reply) => reply,
        },
        ClientCommand::LeaveGroup { group } => match parse_entity_group(&group) {
            Ok(group) => {
                let _ = hub.leave_group(conn_id, &group);
                ServerReply::GroupLeft { group }
            }
            Err(reply) => reply,
        },
        ClientCommand::JoinRosterGroups => ServerReply::RosterGroupsJoined {
            groups: hub.join_roster_groups(conn_id),
        },
    }
}
