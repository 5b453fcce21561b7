use serde::{Deserialize, Serialize};

use crate::raft::types::{LogEntry, LogIndex, NodeId, Term};
use crate::util::errors::Result;

/// The stable fields that must survive crashes alongside the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaftFields {
    pub term: Term,
    pub voted_for: Option<NodeId>,
}

/// Durable store owned by a replica for its lifetime.
///
/// The core persists through this trait before sending any message whose
/// correctness depends on the written value. Write failures are reported as
/// `Err`; the core logs them as fatal-class and continues (a best-effort
/// posture - implementations wanting strict safety can halt instead).
pub trait Persister: Send {
    /// Stable fields as of the last `set_fields`, or `None` on a fresh store.
    fn get_fields(&self) -> Option<RaftFields>;

    /// Durably replace the stable fields.
    fn set_fields(&mut self, fields: RaftFields) -> Result<()>;

    /// Random read; `None` past the tail.
    fn entry(&self, idx: LogIndex) -> Option<LogEntry>;

    /// Tail lookup; `(0, None)` on a fresh store.
    fn last_entry(&self) -> (LogIndex, Option<LogEntry>);

    /// Half-open range read `[from, to)`.
    fn log_slice(&self, from: LogIndex, to: LogIndex) -> Result<Vec<LogEntry>>;

    /// Durable append/overwrite starting at `start`, truncating any existing
    /// tail beyond the written range.
    fn log_update(&mut self, start: LogIndex, entries: Vec<LogEntry>) -> Result<()>;
}
