pub mod candidate;
pub mod follower;
pub mod leader;
pub mod node;
pub mod replication;
pub mod rpc;
pub mod state;
pub(crate) mod timer;
pub mod types;

pub use node::{EventSender, RaftNode};
pub use rpc::{
    AppendEntries, AppendReply, Event, Message, StatusReport, VoteReply, VoteRequest,
};
pub use state::Role;
pub use types::{ClientEntry, LogEntry, LogIndex, NodeId, Term, Uid, NIL_NODE};

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use crate::config::ClusterConfig;
    use crate::machine::Machine;
    use crate::messenger::Messenger;
    use crate::storage::{MemPersister, Persister};
    use crate::util::errors::Result;

    use super::node::{EventSender, RaftNode};
    use super::rpc::{Event, Message, VoteReply, VoteRequest};
    use super::types::{ClientEntry, NodeId, Uid};

    /// Shared view of everything a node handed to its messenger.
    #[derive(Clone, Default)]
    pub(crate) struct Outbox {
        sent: Arc<Mutex<Vec<(NodeId, Message)>>>,
        broadcasts: Arc<Mutex<Vec<VoteRequest>>>,
        redirects: Arc<Mutex<Vec<(Uid, NodeId)>>>,
        unavailable: Arc<Mutex<Vec<Uid>>>,
    }

    impl Outbox {
        pub fn sent(&self) -> Vec<(NodeId, Message)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn take_sent(&self) -> Vec<(NodeId, Message)> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }

        pub fn broadcasts(&self) -> Vec<VoteRequest> {
            self.broadcasts.lock().unwrap().clone()
        }

        pub fn redirects(&self) -> Vec<(Uid, NodeId)> {
            self.redirects.lock().unwrap().clone()
        }

        pub fn unavailable(&self) -> Vec<Uid> {
            self.unavailable.lock().unwrap().clone()
        }
    }

    pub(crate) struct RecordingMessenger {
        outbox: Outbox,
    }

    impl Messenger for RecordingMessenger {
        fn register(&mut self, _inbox: EventSender) {}

        fn send(&mut self, to: NodeId, msg: Message) {
            self.outbox.sent.lock().unwrap().push((to, msg));
        }

        fn broadcast_vote_request(&mut self, req: VoteRequest) {
            self.outbox.broadcasts.lock().unwrap().push(req);
        }

        fn client_301(&mut self, uid: Uid, leader_hint: NodeId) {
            self.outbox.redirects.lock().unwrap().push((uid, leader_hint));
        }

        fn client_503(&mut self, uid: Uid) {
            self.outbox.unavailable.lock().unwrap().push(uid);
        }
    }

    /// Records executed batches; `try_respond` answers from a scripted uid
    /// cache, standing in for the machine's response cache.
    #[derive(Clone, Default)]
    pub(crate) struct MachineProbe {
        executed: Arc<Mutex<Vec<ClientEntry>>>,
        cached: Arc<Mutex<HashSet<Uid>>>,
    }

    impl MachineProbe {
        pub fn executed(&self) -> Vec<ClientEntry> {
            self.executed.lock().unwrap().clone()
        }

        pub fn cache(&self, uid: Uid) {
            self.cached.lock().unwrap().insert(uid);
        }
    }

    pub(crate) struct ScriptedMachine {
        probe: MachineProbe,
    }

    impl Machine for ScriptedMachine {
        fn execute(&mut self, batch: Vec<ClientEntry>) {
            let mut executed = self.probe.executed.lock().unwrap();
            let mut cached = self.probe.cached.lock().unwrap();
            for command in batch {
                cached.insert(command.uid);
                executed.push(command);
            }
        }

        fn try_respond(&mut self, uid: Uid) -> bool {
            self.probe.cached.lock().unwrap().contains(&uid)
        }
    }

    pub(crate) fn test_node_with_persister(
        config: ClusterConfig,
        persister: Box<dyn Persister>,
    ) -> Result<RaftNode> {
        RaftNode::new(
            config,
            Box::new(RecordingMessenger {
                outbox: Outbox::default(),
            }),
            persister,
            Box::new(ScriptedMachine {
                probe: MachineProbe::default(),
            }),
        )
    }

    pub(crate) fn test_node(
        id: NodeId,
        members: Vec<NodeId>,
    ) -> (RaftNode, Outbox, MachineProbe) {
        let outbox = Outbox::default();
        let probe = MachineProbe::default();
        let config = ClusterConfig {
            node_id: id,
            members,
            inbox_capacity: 64,
            timeout_base_ms: 50,
        };
        let node = RaftNode::new(
            config,
            Box::new(RecordingMessenger {
                outbox: outbox.clone(),
            }),
            Box::new(MemPersister::new()),
            Box::new(ScriptedMachine {
                probe: probe.clone(),
            }),
        )
        .unwrap();
        (node, outbox, probe)
    }

    /// Drive a node through a full election so leader-side tests start from
    /// fresh leadership in the next term. Discards the election traffic.
    pub(crate) fn elect(node: &mut RaftNode, outbox: &Outbox) {
        node.dispatch(Event::Timeout { version: 1 });
        let term = node.state.term;
        for peer in node.peer_ids.clone() {
            if node.state.is_leader() {
                break;
            }
            node.dispatch(Event::VoteReply(VoteReply {
                term,
                granted: true,
                node_id: peer,
            }));
        }
        assert!(node.state.is_leader());
        outbox.take_sent();
    }
}
