//! Group membership index.
//!
//! Two maps kept in lockstep under one lock: group → members for fan-out,
//! connection → groups for disconnect cleanup. Empty sets are pruned so the
//! index never grows with groups nobody is in.

use std::collections::{BTreeSet, HashMap, HashSet};

use lookout_core::{ConnectionId, Group};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Index {
    by_group: HashMap<Group, HashSet<ConnectionId>>,
    by_conn: HashMap<ConnectionId, BTreeSet<Group>>,
}

/// Set-semantics membership of connections in groups.
#[derive(Debug, Default)]
pub struct GroupMembership {
    index: RwLock<Index>,
}

impl GroupMembership {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `group`. Returns `false` if it was already a member.
    pub fn join(&self, conn: &ConnectionId, group: Group) -> bool {
        let mut index = self.index.write();
        let added = index
            .by_group
            .entry(group.clone())
            .or_default()
            .insert(conn.clone());
        let _ = index.by_conn.entry(conn.clone()).or_default().insert(group);
        added
    }

    /// Remove `conn` from `group`. Returns `false` if it was not a member.
    pub fn leave(&self, conn: &ConnectionId, group: &Group) -> bool {
        let mut index = self.index.write();
        let removed = match index.by_group.get_mut(group) {
            Some(members) => {
                let removed = members.remove(conn);
                if members.is_empty() {
                    let _ = index.by_group.remove(group);
                }
                removed
            }
            None => false,
        };
        if let Some(groups) = index.by_conn.get_mut(conn) {
            let _ = groups.remove(group);
            if groups.is_empty() {
                let _ = index.by_conn.remove(conn);
            }
        }
        removed
    }

    /// Drop `conn` from every group, returning the groups it was in.
    pub fn remove_connection(&self, conn: &ConnectionId) -> Vec<Group> {
        let mut index = self.index.write();
        let Some(groups) = index.by_conn.remove(conn) else {
            return Vec::new();
        };
        for group in &groups {
            if let Some(members) = index.by_group.get_mut(group) {
                let _ = members.remove(conn);
                if members.is_empty() {
                    let _ = index.by_group.remove(group);
                }
            }
        }
        groups.into_iter().collect()
    }

    /// Current members of `group`.
    pub fn members(&self, group: &Group) -> Vec<ConnectionId> {
        self.index
            .read()
            .by_group
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Groups `conn` is in, in sorted order.
    pub fn groups_of(&self, conn: &ConnectionId) -> Vec<Group> {
        self.index
            .read()
            .by_conn
            .get(conn)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.index.read().by_group.len()
    }
}
