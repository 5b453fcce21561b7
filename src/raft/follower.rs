use super::node::RaftNode;
use super::rpc::{AppendEntries, AppendReply, Event, Message, VoteReply, VoteRequest};
use super::state::Role;
use super::types::{LogIndex, NodeId};

impl RaftNode {
    /// Follower: answer leader traffic and vote requests, redirect clients,
    /// and promote to candidate on election timeout.
    pub(crate) fn follower_handle(&mut self, event: Event) {
        match event {
            Event::Append(req) => self.follower_append_entries(req),
            Event::Vote(req) => self.follower_vote_request(req),
            // replies can linger from an earlier candidacy or leadership
            Event::AppendReply(_) | Event::VoteReply(_) => {}
            Event::Client(entry) => match self.state.voted_for {
                Some(leader_hint) => self.messenger.client_301(entry.uid, leader_hint),
                None => self.messenger.client_503(entry.uid),
            },
            Event::Timeout { version } => {
                self.state.role = Role::Candidate;
                self.candidate_handle(Event::Timeout { version });
            }
            other => tracing::error!("bad event type for follower: {:?}", other),
        }
    }

    fn follower_append_entries(&mut self, req: AppendEntries) {
        if req.term < self.state.term {
            tracing::debug!(
                "Node {} rejected AppendEntries from {} - stale term ({} < {})",
                self.state.node_id,
                req.leader_id,
                req.term,
                self.state.term
            );
            self.append_reply(req.leader_id, false, 0);
            return;
        }
        if req.term > self.state.term {
            // adopt the new term, recording the sender as leader
            self.set_term_and_vote(req.term, Some(req.leader_id));
        }

        let (last_idx, _) = self.log_tail();
        let prev_matches =
            req.prev_log_idx <= last_idx && self.term_at(req.prev_log_idx) == Some(req.prev_log_term);
        if !prev_matches {
            tracing::debug!(
                "Node {} rejected AppendEntries - no match at index {} for term {}",
                self.state.node_id,
                req.prev_log_idx,
                req.prev_log_term
            );
            // a rejection leaves the log untouched and the timer running
            self.append_reply(req.leader_id, false, 0);
            return;
        }

        let mut last_mod_idx = 0;
        if !req.entries.is_empty() {
            self.log_update(req.prev_log_idx + 1, req.entries);
            last_mod_idx = self.log_tail().0;
            tracing::debug!(
                "Node {} log now ends at {} after entries from leader {}",
                self.state.node_id,
                last_mod_idx,
                req.leader_id
            );
        }
        self.append_reply(req.leader_id, true, last_mod_idx);

        if self.state.commit_idx < req.commit_idx {
            let (last_idx, _) = self.log_tail();
            self.state.commit_idx = req.commit_idx.min(last_idx);
            self.apply_committed();
        }
        self.timer_reset();
    }

    fn follower_vote_request(&mut self, req: VoteRequest) {
        if req.term < self.state.term {
            tracing::debug!(
                "Node {} denied vote to {} - stale term ({} < {})",
                self.state.node_id,
                req.candid_id,
                req.term,
                self.state.term
            );
            self.vote_reply(req.candid_id, false);
            return;
        }
        if req.term > self.state.term {
            self.set_term_and_vote(req.term, None);
        }

        let free_to_vote = match self.state.voted_for {
            None => true,
            Some(id) => id == req.candid_id,
        };
        if free_to_vote && self.is_up_to_date(&req) {
            self.set_vote(Some(req.candid_id));
            tracing::info!(
                "Node {} granted vote to {} in term {}",
                self.state.node_id,
                req.candid_id,
                self.state.term
            );
            self.vote_reply(req.candid_id, true);
            self.timer_reset();
        } else {
            tracing::debug!(
                "Node {} denied vote to {} (voted_for: {:?})",
                self.state.node_id,
                req.candid_id,
                self.state.voted_for
            );
            self.vote_reply(req.candid_id, false);
        }
    }

    pub(crate) fn append_reply(&mut self, to: NodeId, success: bool, last_mod_idx: LogIndex) {
        let reply = AppendReply {
            term: self.state.term,
            success,
            node_id: self.state.node_id,
            last_mod_idx,
        };
        self.messenger.send(to, Message::AppendReply(reply));
    }

    pub(crate) fn vote_reply(&mut self, to: NodeId, granted: bool) {
        let reply = VoteReply {
            term: self.state.term,
            granted,
            node_id: self.state.node_id,
        };
        self.messenger.send(to, Message::VoteReply(reply));
    }
}
