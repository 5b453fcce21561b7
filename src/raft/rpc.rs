use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::state::Role;
use super::types::{ClientEntry, LogEntry, LogIndex, NodeId, Term};

/// AppendEntries RPC - invoked by the leader to replicate log entries and as
/// heartbeat. Field order is fixed for stable serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppendEntries {
    /// Leader's term
    pub term: Term,
    /// So followers can redirect clients
    pub leader_id: NodeId,
    /// Index of log entry immediately preceding new ones
    pub prev_log_idx: LogIndex,
    /// Term of the entry at prev_log_idx
    pub prev_log_term: Term,
    /// Entries to store (empty for heartbeat)
    pub entries: Vec<LogEntry>,
    /// Leader's commit index
    pub commit_idx: LogIndex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppendReply {
    /// Current term, for the leader to update itself
    pub term: Term,
    /// True if the follower matched prev_log_idx / prev_log_term
    pub success: bool,
    /// The responding node
    pub node_id: NodeId,
    /// New last index after a non-heartbeat append; 0 otherwise
    pub last_mod_idx: LogIndex,
}

/// RequestVote RPC - invoked by candidates to gather votes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteRequest {
    /// Candidate's term
    pub term: Term,
    /// Candidate requesting the vote
    pub candid_id: NodeId,
    /// Index of the candidate's last log entry
    pub last_log_idx: LogIndex,
    /// Term of the candidate's last log entry
    pub last_log_term: Term,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteReply {
    /// Current term, for the candidate to update itself
    pub term: Term,
    /// True means the vote was granted
    pub granted: bool,
    /// The responding node
    pub node_id: NodeId,
}

/// Wrapper for all outbound wire messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Message {
    Append(AppendEntries),
    AppendReply(AppendReply),
    Vote(VoteRequest),
    VoteReply(VoteReply),
    Client(ClientEntry),
    /// Loopback probe; re-emitted to self by the event loop (transport test hook)
    Echo,
}

/// Snapshot of a node's externally observable state.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub node_id: NodeId,
    pub role: Role,
    pub term: Term,
    pub commit_idx: LogIndex,
    pub last_log_idx: LogIndex,
}

/// Everything the event loop consumes from its inbound queue: protocol
/// messages, timer firings and control signals.
#[derive(Debug)]
pub enum Event {
    Append(AppendEntries),
    AppendReply(AppendReply),
    Vote(VoteRequest),
    VoteReply(VoteReply),
    Client(ClientEntry),
    /// Versioned timer firing; stale versions are dropped at the loop entry
    Timeout { version: u64 },
    /// Loopback probe (see [`Message::Echo`])
    Echo,
    /// Report current status through the supplied channel
    Status(oneshot::Sender<StatusReport>),
    /// Terminate the event loop
    Exit,
}

impl From<Message> for Event {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Append(m) => Event::Append(m),
            Message::AppendReply(m) => Event::AppendReply(m),
            Message::Vote(m) => Event::Vote(m),
            Message::VoteReply(m) => Event::VoteReply(m),
            Message::Client(m) => Event::Client(m),
            Message::Echo => Event::Echo,
        }
    }
}
