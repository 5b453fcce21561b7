use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::raft::types::{NodeId, NIL_NODE};
use crate::util::errors::{RaftError, Result};

/// Static description of the cluster a replica participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// This replica's id
    pub node_id: NodeId,

    /// Ids of every cluster member, including this replica.
    /// Must have at least 3 distinct entries.
    pub members: Vec<NodeId>,

    /// Capacity of the inbound event queue
    pub inbox_capacity: usize,

    /// Base timeout in milliseconds. Heartbeats fire every base; election
    /// timeouts are sampled from [2*base, 4*base) for followers and
    /// [3*base, 5*base) for candidates.
    pub timeout_base_ms: u64,
}

impl ClusterConfig {
    pub fn new(node_id: NodeId, members: Vec<NodeId>) -> Self {
        Self {
            node_id,
            members,
            ..Self::default()
        }
    }

    pub fn timeout_base(&self) -> Duration {
        Duration::from_millis(self.timeout_base_ms)
    }

    /// Every member id except our own, deduplicated order preserved.
    pub fn peer_ids(&self) -> Vec<NodeId> {
        self.members
            .iter()
            .copied()
            .filter(|&id| id != self.node_id)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.members.len() < 3 {
            return Err(RaftError::InvalidConfig(
                "cluster needs at least 3 members".to_string(),
            ));
        }
        if self.members.contains(&NIL_NODE) {
            return Err(RaftError::InvalidConfig(format!(
                "{} is a reserved node id",
                NIL_NODE
            )));
        }
        if !self.members.contains(&self.node_id) {
            return Err(RaftError::InvalidConfig(
                "members must contain this node's id".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        if !self.members.iter().all(|id| seen.insert(id)) {
            return Err(RaftError::InvalidConfig(
                "members must not have duplicates".to_string(),
            ));
        }
        if self.inbox_capacity == 0 {
            return Err(RaftError::InvalidConfig(
                "inbox_capacity must be non-zero".to_string(),
            ));
        }
        if self.timeout_base_ms == 0 {
            return Err(RaftError::InvalidConfig(
                "timeout_base_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_id: 0,
            members: Vec::new(),
            inbox_capacity: 64,
            timeout_base_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_minimal_cluster() {
        let config = ClusterConfig::new(1, vec![1, 2, 3]);
        assert!(config.validate().is_ok());
        assert_eq!(config.peer_ids(), vec![2, 3]);
    }

    #[test]
    fn rejects_small_clusters() {
        let config = ClusterConfig::new(1, vec![1, 2]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_self() {
        let config = ClusterConfig::new(9, vec![1, 2, 3]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicates_and_reserved_ids() {
        assert!(ClusterConfig::new(1, vec![1, 2, 2, 3]).validate().is_err());
        assert!(ClusterConfig::new(1, vec![1, 2, NIL_NODE]).validate().is_err());
    }
}
