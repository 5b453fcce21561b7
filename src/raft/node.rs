use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::ClusterConfig;
use crate::machine::Machine;
use crate::messenger::Messenger;
use crate::storage::{Persister, RaftFields};
use crate::util::errors::{RaftError, Result};

use super::rpc::{Event, Message, StatusReport, VoteRequest};
use super::state::{RaftState, Role};
use super::timer::RaftTimer;
use super::types::{sentinel, LogEntry, LogIndex, NodeId, Term};

/// Handle for pushing events into a replica's inbound queue. Cloneable;
/// handed to the messenger at registration and available to embedders via
/// [`RaftNode::handle`].
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    /// Deliver an event, waiting for queue space. False if the replica is
    /// gone.
    pub async fn send(&self, event: Event) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Deliver an event without waiting. False if the queue is full or the
    /// replica is gone.
    pub fn try_send(&self, event: Event) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

/// A single replica of the replicated log: the role state machine, the
/// election and replication protocols, and client routing, driven by one
/// serialized stream of events.
///
/// All state lives on the event-loop task; collaborators are called
/// synchronously from it and must not block.
pub struct RaftNode {
    pub(crate) state: RaftState,
    pub(crate) peer_ids: Vec<NodeId>,
    pub(crate) timer: RaftTimer,
    inbox: mpsc::Receiver<Event>,
    handle: EventSender,
    pub(crate) messenger: Box<dyn Messenger>,
    pub(crate) persister: Box<dyn Persister>,
    pub(crate) machine: Box<dyn Machine>,
}

impl RaftNode {
    /// Build a replica from its persisted state.
    ///
    /// Validates the membership, loads the stable fields, installs the
    /// index-0 sentinel on a fresh store, and registers the inbound queue
    /// with the messenger.
    pub fn new(
        config: ClusterConfig,
        mut messenger: Box<dyn Messenger>,
        mut persister: Box<dyn Persister>,
        machine: Box<dyn Machine>,
    ) -> Result<RaftNode> {
        config.validate()?;

        let fields = persister.get_fields().unwrap_or(RaftFields {
            term: 0,
            voted_for: None,
        });
        if let (0, None) = persister.last_entry() {
            persister.log_update(0, vec![sentinel()]).map_err(|err| {
                RaftError::StorageError(format!("initial log update failed: {}", err))
            })?;
        }

        let (tx, inbox) = mpsc::channel(config.inbox_capacity);
        let handle = EventSender { tx };
        messenger.register(handle.clone());

        let timer = RaftTimer::new(
            handle.clone(),
            RaftTimer::default_sampler(config.timeout_base()),
        );

        Ok(RaftNode {
            state: RaftState::new(config.node_id, fields.term, fields.voted_for),
            peer_ids: config.peer_ids(),
            timer,
            inbox,
            handle,
            messenger,
            persister,
            machine,
        })
    }

    /// Handle for delivering events to this replica.
    pub fn handle(&self) -> EventSender {
        self.handle.clone()
    }

    /// Run the event loop with the default timeout sampling until an
    /// [`Event::Exit`] arrives or every sender is dropped.
    pub async fn run(&mut self) {
        self.timer_reset();
        while let Some(event) = self.inbox.recv().await {
            match event {
                Event::Timeout { version } if !self.timer.matches(version) => continue,
                Event::Exit => break,
                Event::Echo => {
                    self.messenger.send(self.state.node_id, Message::Echo);
                    continue;
                }
                Event::Status(reply) => {
                    let _ = reply.send(self.status());
                    continue;
                }
                _ => {}
            }
            self.dispatch(event);
        }
        tracing::info!("Node {} event loop stopped", self.state.node_id);
    }

    /// Run the event loop with custom timeout sampling.
    pub async fn run_with(&mut self, sampler: impl Fn(Role) -> Duration + Send + 'static) {
        self.timer.set_sampler(Box::new(sampler));
        self.run().await;
    }

    pub(crate) fn dispatch(&mut self, event: Event) {
        match self.state.role {
            Role::Follower => self.follower_handle(event),
            Role::Candidate => self.candidate_handle(event),
            Role::Leader => self.leader_handle(event),
        }
    }

    fn status(&self) -> StatusReport {
        StatusReport {
            node_id: self.state.node_id,
            role: self.state.role,
            term: self.state.term,
            commit_idx: self.state.commit_idx,
            last_log_idx: self.log_tail().0,
        }
    }

    // ---- log view helpers

    pub(crate) fn entry_at(&self, idx: LogIndex) -> Option<LogEntry> {
        self.persister.entry(idx)
    }

    pub(crate) fn term_at(&self, idx: LogIndex) -> Option<Term> {
        self.persister.entry(idx).map(|entry| entry.term)
    }

    /// Last index and entry of the log. The log always holds at least the
    /// sentinel; an empty store here means the persister lost it.
    pub(crate) fn log_tail(&self) -> (LogIndex, LogEntry) {
        match self.persister.last_entry() {
            (idx, Some(entry)) => (idx, entry),
            (_, None) => {
                tracing::error!("fatal: log is empty, sentinel missing");
                (0, sentinel())
            }
        }
    }

    /// The up-to-date comparison gating vote grants: lexicographic on
    /// (last log term, last log index).
    pub(crate) fn is_up_to_date(&self, req: &VoteRequest) -> bool {
        let (last_idx, last_entry) = self.log_tail();
        req.last_log_term > last_entry.term
            || (req.last_log_term == last_entry.term && req.last_log_idx >= last_idx)
    }

    // ---- durable mutation helpers

    /// Durable append/overwrite. A store failure is fatal-class but the loop
    /// continues (see [`Persister`] on the posture).
    pub(crate) fn log_update(&mut self, start: LogIndex, entries: Vec<LogEntry>) {
        if let Err(err) = self.persister.log_update(start, entries) {
            tracing::error!("fatal: unable to update log: {}", err);
        }
    }

    /// Durably adopt a term and vote, mirroring them in memory. Completes
    /// before any message depending on the new values is sent.
    pub(crate) fn set_term_and_vote(&mut self, term: Term, voted_for: Option<NodeId>) {
        self.state.term = term;
        self.state.voted_for = voted_for;
        if let Err(err) = self.persister.set_fields(RaftFields { term, voted_for }) {
            tracing::error!("fatal: could not persist term and vote: {}", err);
        }
    }

    pub(crate) fn set_vote(&mut self, voted_for: Option<NodeId>) {
        self.set_term_and_vote(self.state.term, voted_for);
    }

    pub(crate) fn timer_reset(&mut self) {
        self.timer.reset(self.state.role);
    }

    /// Apply every newly committed command to the state machine, in index
    /// order, as one batch. Applied uids leave the in-flight map.
    pub(crate) fn apply_committed(&mut self) {
        if self.state.last_applied >= self.state.commit_idx {
            return;
        }
        let mut batch = Vec::new();
        for idx in self.state.last_applied + 1..=self.state.commit_idx {
            match self.entry_at(idx) {
                Some(entry) => {
                    if let Some(command) = entry.command {
                        self.state.idx_of_uid.remove(&command.uid);
                        batch.push(command);
                    }
                }
                None => tracing::error!("fatal: committed entry {} missing from log", idx),
            }
        }
        if !batch.is_empty() {
            tracing::debug!(
                "Node {} applying {} committed commands",
                self.state.node_id,
                batch.len()
            );
            self.machine.execute(batch);
        }
        self.state.last_applied = self.state.commit_idx;
    }
}
