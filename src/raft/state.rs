use std::collections::{HashMap, HashSet};

use super::types::{LogIndex, NodeId, Term, Uid};

/// The three roles a replica can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Follower - receives updates from the leader
    Follower,
    /// Candidate - requesting votes for leadership
    Candidate,
    /// Leader - manages log replication
    Leader,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Follower => write!(f, "Follower"),
            Role::Candidate => write!(f, "Candidate"),
            Role::Leader => write!(f, "Leader"),
        }
    }
}

/// Complete in-memory state of a replica. `term` and `voted_for` mirror the
/// persistent store; the rest is volatile and reset on restart.
#[derive(Debug, Clone)]
pub struct RaftState {
    /// Latest term this replica has seen
    pub term: Term,
    /// Node that received our vote in the current term, if any.
    /// Doubles as the best-effort leader hint for client redirects.
    pub voted_for: Option<NodeId>,

    /// Index of the highest log entry known to be committed
    pub commit_idx: LogIndex,
    /// Index of the highest log entry applied to the state machine
    pub last_applied: LogIndex,
    /// Current role of this replica
    pub role: Role,
    /// This replica's id
    pub node_id: NodeId,

    /// Candidate only: nodes (including self) that granted a vote this term
    pub vote_set: HashSet<NodeId>,

    /// Leader only: for each peer, the next log index to send
    pub next_idx: HashMap<NodeId, LogIndex>,
    /// Leader only: for each peer, the highest index known replicated there
    pub match_idx: HashMap<NodeId, LogIndex>,
    /// Leader only: uid -> index for in-flight commands not yet applied
    pub idx_of_uid: HashMap<Uid, LogIndex>,
}

impl RaftState {
    pub fn new(node_id: NodeId, term: Term, voted_for: Option<NodeId>) -> Self {
        Self {
            term,
            voted_for,
            commit_idx: 0,
            last_applied: 0,
            role: Role::Follower,
            node_id,
            vote_set: HashSet::new(),
            next_idx: HashMap::new(),
            match_idx: HashMap::new(),
            idx_of_uid: HashMap::new(),
        }
    }

    /// Transition to follower. Does not touch the persistent mirror; callers
    /// persist term/vote changes before sending anything that depends on them.
    pub fn become_follower(&mut self) {
        if self.role != Role::Follower {
            tracing::info!(
                "Node {} transitioning to Follower (term: {})",
                self.node_id,
                self.term
            );
        }
        self.role = Role::Follower;
        self.vote_set.clear();
        self.next_idx.clear();
        self.match_idx.clear();
        self.idx_of_uid.clear();
    }

    /// Transition to candidate, seeding the vote set with our own vote.
    /// The term bump is persisted by the caller.
    pub fn become_candidate(&mut self) {
        self.role = Role::Candidate;
        self.vote_set.clear();
        self.vote_set.insert(self.node_id);
        tracing::info!("Node {} transitioning to Candidate", self.node_id);
    }

    /// Transition to leader, reinitializing the per-peer replication tables.
    pub fn become_leader(&mut self, last_log_idx: LogIndex, peer_ids: &[NodeId]) {
        tracing::info!(
            "Node {} transitioning to Leader (term: {})",
            self.node_id,
            self.term
        );
        self.role = Role::Leader;
        self.next_idx.clear();
        self.match_idx.clear();
        self.idx_of_uid.clear();
        for &peer_id in peer_ids {
            self.next_idx.insert(peer_id, last_log_idx + 1);
            self.match_idx.insert(peer_id, 0);
        }
        self.vote_set.clear();
    }

    /// Record a granted vote. Returns true once the set reaches a strict
    /// majority of the cluster.
    pub fn add_vote(&mut self, from: NodeId, cluster_size: usize) -> bool {
        self.vote_set.insert(from);
        self.vote_set.len() > cluster_size / 2
    }

    pub fn is_leader(&self) -> bool {
        self.role == Role::Leader
    }

    pub fn is_candidate(&self) -> bool {
        self.role == Role::Candidate
    }
}
