use serde::{Deserialize, Serialize};

/// Node identifier, drawn from a 32-bit space.
pub type NodeId = u32;

/// Reserved identifier meaning "no vote / no leader known". Never a valid
/// member id; in-memory state uses `Option<NodeId>` instead.
pub const NIL_NODE: NodeId = u32::MAX;

/// Type alias for term numbers
pub type Term = u64;

/// Type alias for log indices
pub type LogIndex = u64;

/// Client-chosen unique id per command; the deduplication key.
pub type Uid = u64;

/// A client command awaiting (or having completed) replication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientEntry {
    pub uid: Uid,
    /// Opaque bytes; never interpreted by the consensus core.
    pub payload: Vec<u8>,
}

impl ClientEntry {
    pub fn new(uid: Uid, payload: Vec<u8>) -> Self {
        Self { uid, payload }
    }
}

/// A single entry in the replicated log.
///
/// Entries with no command are internal: the index-0 sentinel today, no-op
/// entries if they are ever needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    /// The term when this entry was created
    pub term: Term,
    /// The command payload, absent for internal entries
    pub command: Option<ClientEntry>,
}

impl LogEntry {
    pub fn new(term: Term, command: Option<ClientEntry>) -> Self {
        Self { term, command }
    }
}

/// The immutable entry at index 0, simplifying prev-index lookups.
pub fn sentinel() -> LogEntry {
    LogEntry::new(0, None)
}
