use crate::raft::node::EventSender;
use crate::raft::rpc::{Message, VoteRequest};
use crate::raft::types::{NodeId, Uid};

/// Outbound side of the transport.
///
/// Implementations deliver wire messages to peers (and to self, for the echo
/// probe) and responses to clients, and feed everything inbound back through
/// the `EventSender` handed over at registration. Calls are made from the
/// event-loop thread and must not block; delivery is best-effort.
pub trait Messenger: Send {
    /// Called once at construction to wire inbound deliveries.
    fn register(&mut self, inbox: EventSender);

    /// Unicast to a peer, or to self.
    fn send(&mut self, to: NodeId, msg: Message);

    /// Send a vote request to every peer.
    fn broadcast_vote_request(&mut self, req: VoteRequest);

    /// Redirect a client to the given leader hint.
    fn client_301(&mut self, uid: Uid, leader_hint: NodeId);

    /// Tell a client no leader is available.
    fn client_503(&mut self, uid: Uid);
}
