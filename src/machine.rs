use crate::raft::types::{ClientEntry, Uid};

/// The deterministic application state machine that committed commands are
/// handed to.
///
/// Commands arrive in log order, possibly re-delivered after a restart; the
/// machine owns the uid -> response cache that makes execution idempotent and
/// lets `try_respond` short-circuit duplicate client requests at the leader.
pub trait Machine: Send {
    /// Apply a batch of committed commands in order.
    fn execute(&mut self, batch: Vec<ClientEntry>);

    /// True iff a response for `uid` is already known and has been emitted to
    /// the client.
    fn try_respond(&mut self, uid: Uid) -> bool;
}
