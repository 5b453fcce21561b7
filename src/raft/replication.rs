use super::node::RaftNode;
use super::rpc::{AppendEntries, Message};
use super::types::{LogEntry, LogIndex, NodeId};

/// Upper bound on entries shipped in one reply-driven batch.
pub(crate) const APPEND_WINDOW: u64 = 8;

impl RaftNode {
    /// Ship up to `window` entries starting at the peer's next index, or an
    /// empty probe/heartbeat for `window == 0`. Advances `next_idx`
    /// optimistically by the number of entries sent; `match_idx` moves only
    /// on acknowledgement.
    pub(crate) fn send_append_entries(&mut self, node_id: NodeId, window: u64) {
        let next_idx = match self.state.next_idx.get(&node_id) {
            Some(&next) => next,
            None => {
                tracing::error!("fatal: no next index for node {}; send skipped", node_id);
                return;
            }
        };
        let (last_idx, _) = self.log_tail();
        let to = (next_idx + window).min(last_idx + 1).max(next_idx);
        let entries = match self.persister.log_slice(next_idx, to) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!("fatal: log read failed: {}; send skipped", err);
                return;
            }
        };
        let prev_log_idx = next_idx - 1;
        let prev_log_term = match self.term_at(prev_log_idx) {
            Some(term) => term,
            None => {
                tracing::error!(
                    "fatal: log index {} out of bounds; send skipped",
                    prev_log_idx
                );
                return;
            }
        };

        let sent = entries.len() as u64;
        self.messenger.send(
            node_id,
            Message::Append(AppendEntries {
                term: self.state.term,
                leader_id: self.state.node_id,
                prev_log_idx,
                prev_log_term,
                entries,
                commit_idx: self.state.commit_idx,
            }),
        );
        if sent > 0 {
            if let Some(next) = self.state.next_idx.get_mut(&node_id) {
                *next += sent;
            }
        }
    }

    /// Append an entry at the leader's tail, track its uid if it carries a
    /// command, and push it directly to every peer that is exactly caught up.
    /// Peers further behind keep catching up through reply-driven batches.
    pub(crate) fn leader_log_append(&mut self, entry: LogEntry) {
        let (last_idx, _) = self.log_tail();
        let new_idx = last_idx + 1;
        self.log_update(new_idx, vec![entry.clone()]);
        if let Some(command) = entry.command {
            self.state.idx_of_uid.insert(command.uid, new_idx);
        }
        tracing::info!(
            "Leader {} appended entry at index {}",
            self.state.node_id,
            new_idx
        );

        let caught_up: Vec<NodeId> = self
            .state
            .next_idx
            .iter()
            .filter(|&(_, &next)| next == new_idx)
            .map(|(&node_id, _)| node_id)
            .collect();
        for node_id in caught_up {
            self.send_append_entries(node_id, 1);
        }
    }

    /// Move the commit index to the highest entry stored on a strict
    /// majority, if that entry is from the current term.
    ///
    /// Sorting the peer match indices ascending puts our own (implicit,
    /// maximal) copy at the top; the value at the peer-majority rank is then
    /// held by a majority of the whole cluster.
    pub(crate) fn advance_commit_idx(&mut self) {
        let mut match_idxs: Vec<LogIndex> = self.state.match_idx.values().copied().collect();
        match_idxs.sort_unstable();
        let candidate = match_idxs[self.peer_ids.len() / 2];
        if candidate <= self.state.commit_idx {
            return;
        }
        match self.term_at(candidate) {
            Some(term) if term == self.state.term => {
                tracing::info!(
                    "Leader {} advanced commit index to {}",
                    self.state.node_id,
                    candidate
                );
                self.state.commit_idx = candidate;
            }
            // an entry from an earlier term commits only once a current-term
            // entry above it does
            Some(_) => {}
            None => tracing::error!("fatal: match index {} beyond the local log", candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::rpc::Event;
    use super::super::testutil::{elect, test_node};
    use super::super::types::ClientEntry;
    use super::*;

    #[tokio::test]
    async fn batches_are_capped_at_the_window() {
        let (mut node, outbox, _machine) = test_node(1, vec![1, 2, 3]);
        elect(&mut node, &outbox);
        for uid in 0..12 {
            node.dispatch(Event::Client(ClientEntry::new(uid, b"x".to_vec())));
        }
        // rewind one peer to the log head, as after repeated mismatches
        node.state.next_idx.insert(2, 1);
        outbox.take_sent();

        node.send_append_entries(2, APPEND_WINDOW);

        let sent = outbox.take_sent();
        assert_eq!(sent.len(), 1);
        match &sent[0].1 {
            Message::Append(req) => {
                assert_eq!(req.entries.len(), 8);
                assert_eq!(req.prev_log_idx, 0);
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(node.state.next_idx[&2], 9);

        // the next batch is clamped at the tail
        node.send_append_entries(2, APPEND_WINDOW);
        let sent = outbox.take_sent();
        match &sent[0].1 {
            Message::Append(req) => assert_eq!(req.entries.len(), 4),
            other => panic!("unexpected message {:?}", other),
        }
        assert_eq!(node.state.next_idx[&2], 13);
    }

    #[tokio::test]
    async fn appends_push_only_to_exactly_caught_up_peers() {
        let (mut node, outbox, _machine) = test_node(1, vec![1, 2, 3]);
        elect(&mut node, &outbox);
        node.dispatch(Event::Client(ClientEntry::new(1, b"x".to_vec())));
        // peer 2 consumed the push (next_idx 2), peer 3 is behind after a
        // mismatch rewind
        node.state.next_idx.insert(3, 1);
        outbox.take_sent();

        node.dispatch(Event::Client(ClientEntry::new(2, b"y".to_vec())));

        let pushes: Vec<NodeId> = outbox
            .take_sent()
            .into_iter()
            .filter_map(|(to, msg)| match msg {
                Message::Append(_) => Some(to),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![2]);
    }

    #[tokio::test]
    async fn commit_index_never_regresses() {
        let (mut node, outbox, _machine) = test_node(1, vec![1, 2, 3]);
        elect(&mut node, &outbox);
        for uid in [7, 8] {
            node.dispatch(Event::Client(ClientEntry::new(uid, b"x".to_vec())));
        }
        node.state.match_idx.insert(2, 2);
        node.state.match_idx.insert(3, 2);
        node.advance_commit_idx();
        assert_eq!(node.state.commit_idx, 2);

        // a slower quorum view must not pull the index back
        node.state.match_idx.insert(2, 1);
        node.state.match_idx.insert(3, 1);
        node.advance_commit_idx();
        assert_eq!(node.state.commit_idx, 2);
    }
}
