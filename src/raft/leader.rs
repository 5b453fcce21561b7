use std::collections::HashMap;

use super::node::RaftNode;
use super::replication::APPEND_WINDOW;
use super::rpc::{AppendReply, Event};
use super::types::{ClientEntry, LogEntry};

impl RaftNode {
    /// Leader: replicate the log through heartbeats and reply-driven batches,
    /// advance the commit index over quorum acknowledgements, and absorb
    /// client commands with at-most-once log admission per uid.
    pub(crate) fn leader_handle(&mut self, event: Event) {
        match event {
            Event::Append(req) => {
                if req.term == self.state.term {
                    // two leaders in one term cannot happen under the vote rules
                    tracing::error!(
                        "fatal: AppendEntries from {} in our own term {}; dropping",
                        req.leader_id,
                        req.term
                    );
                } else {
                    self.candidate_handle(Event::Append(req));
                }
            }
            Event::Vote(req) => self.candidate_handle(Event::Vote(req)),
            Event::AppendReply(reply) => self.leader_append_reply(reply),
            Event::VoteReply(_) => {}
            Event::Client(entry) => self.leader_client_entry(entry),
            Event::Timeout { .. } => {
                for peer in self.peer_ids.clone() {
                    self.send_append_entries(peer, 0);
                }
                self.timer_reset();
            }
            other => tracing::error!("bad event type for leader: {:?}", other),
        }
    }

    /// Entry action on winning an election: rebuild the in-flight uid map
    /// from the unapplied log suffix, reset the replication tables, and get
    /// a heartbeat round out immediately.
    ///
    /// The commit index is volatile, so after a full-cluster outage the scan
    /// starts from the log head; the cost is accepted absent snapshots.
    pub(crate) fn promote_to_leader(&mut self) {
        let (last_idx, _) = self.log_tail();
        let mut idx_of_uid = HashMap::new();
        for idx in self.state.last_applied + 1..=last_idx {
            match self.entry_at(idx) {
                Some(entry) => {
                    if let Some(command) = entry.command {
                        idx_of_uid.insert(command.uid, idx);
                    }
                }
                None => tracing::error!("fatal: log entry {} unreadable during promotion", idx),
            }
        }
        let peer_ids = self.peer_ids.clone();
        self.state.become_leader(last_idx, &peer_ids);
        self.state.idx_of_uid = idx_of_uid;
        self.leader_handle(Event::Timeout { version: 0 });
    }

    fn leader_append_reply(&mut self, reply: AppendReply) {
        if reply.term > self.state.term {
            self.set_term_and_vote(reply.term, None);
            self.state.become_follower();
            self.timer_reset();
            return;
        }
        if reply.term < self.state.term {
            return;
        }

        let node_id = reply.node_id;
        if !self.state.match_idx.contains_key(&node_id) {
            tracing::error!("fatal: AppendReply from unknown node {}", node_id);
            return;
        }
        if reply.success {
            if reply.last_mod_idx > 0 {
                // out-of-order duplicates carry a lower index
                let matched = self.state.match_idx[&node_id];
                if reply.last_mod_idx > matched {
                    self.state.match_idx.insert(node_id, reply.last_mod_idx);
                    self.advance_commit_idx();
                    self.apply_committed();
                }
            }
            let (last_idx, _) = self.log_tail();
            if self.state.next_idx[&node_id] <= last_idx {
                self.send_append_entries(node_id, APPEND_WINDOW);
            }
        } else {
            // log mismatch: back up one step (never past the matched prefix)
            // and re-probe with an empty append
            let matched = self.state.match_idx[&node_id];
            if let Some(next) = self.state.next_idx.get_mut(&node_id) {
                if *next > matched + 1 {
                    *next -= 1;
                }
            }
            self.send_append_entries(node_id, 0);
        }
    }

    fn leader_client_entry(&mut self, entry: ClientEntry) {
        if self.machine.try_respond(entry.uid) {
            // already executed; the machine re-emitted its cached response
            return;
        }
        if let Some(&idx) = self.state.idx_of_uid.get(&entry.uid) {
            let logged_uid = self
                .entry_at(idx)
                .and_then(|logged| logged.command)
                .map(|command| command.uid);
            if logged_uid != Some(entry.uid) {
                // only possible if a log entry was rewritten under us, which
                // promotion resets rule out
                tracing::error!("fatal: uid map points at {} but the entry disagrees", idx);
            }
            // in flight; the commit path will respond
            return;
        }
        let term = self.state.term;
        self.leader_log_append(LogEntry::new(term, Some(entry)));
    }
}
