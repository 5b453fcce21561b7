use super::node::RaftNode;
use super::rpc::{Event, VoteReply, VoteRequest};

impl RaftNode {
    /// Candidate: collect votes for the current term, fall back to follower
    /// when a legitimate leader or a newer term shows up, and retry the
    /// election when the (longer) candidate timeout fires.
    pub(crate) fn candidate_handle(&mut self, event: Event) {
        match event {
            Event::Append(req) => {
                if req.term < self.state.term {
                    self.append_reply(req.leader_id, false, 0);
                } else {
                    // a leader exists for this term (or a newer one);
                    // record it and replay the message as follower
                    self.set_vote(Some(req.leader_id));
                    self.state.become_follower();
                    self.follower_handle(Event::Append(req));
                }
            }
            Event::Vote(req) => {
                if req.term <= self.state.term {
                    // we already voted for ourself this term
                    self.vote_reply(req.candid_id, false);
                } else {
                    self.state.become_follower();
                    self.follower_handle(Event::Vote(req));
                }
            }
            Event::VoteReply(reply) => self.candidate_vote_reply(reply),
            Event::AppendReply(_) => {}
            Event::Client(entry) => self.messenger.client_503(entry.uid),
            Event::Timeout { .. } => self.start_election(),
            other => tracing::error!("bad event type for candidate: {:?}", other),
        }
    }

    /// Start (or restart) an election: bump the term, vote for ourselves,
    /// and ask every peer for theirs.
    fn start_election(&mut self) {
        self.state.become_candidate();
        let id = self.state.node_id;
        self.set_term_and_vote(self.state.term + 1, Some(id));
        let (last_log_idx, last_entry) = self.log_tail();
        tracing::info!(
            "Node {} starting election for term {}",
            id,
            self.state.term
        );
        self.messenger.broadcast_vote_request(VoteRequest {
            term: self.state.term,
            candid_id: id,
            last_log_idx,
            last_log_term: last_entry.term,
        });
        self.timer_reset();
    }

    fn candidate_vote_reply(&mut self, reply: VoteReply) {
        if reply.term == self.state.term && reply.granted {
            let cluster_size = self.peer_ids.len() + 1;
            if self.state.add_vote(reply.node_id, cluster_size) {
                tracing::info!(
                    "Node {} won the election for term {} with {} votes",
                    self.state.node_id,
                    self.state.term,
                    self.state.vote_set.len()
                );
                self.promote_to_leader();
            }
        } else if reply.term > self.state.term {
            self.set_term_and_vote(reply.term, None);
            self.state.become_follower();
        }
        // stale or denied replies carry no information we can use
    }
}
