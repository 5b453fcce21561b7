use crate::raft::types::{LogEntry, LogIndex};
use crate::util::errors::{RaftError, Result};

use super::persister::{Persister, RaftFields};

/// Volatile persister for tests and single-process embedding. Same contract
/// as the file-backed store, minus the durability.
#[derive(Debug, Default)]
pub struct MemPersister {
    fields: Option<RaftFields>,
    log: Vec<LogEntry>,
}

impl MemPersister {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persister for MemPersister {
    fn get_fields(&self) -> Option<RaftFields> {
        self.fields.clone()
    }

    fn set_fields(&mut self, fields: RaftFields) -> Result<()> {
        self.fields = Some(fields);
        Ok(())
    }

    fn entry(&self, idx: LogIndex) -> Option<LogEntry> {
        self.log.get(idx as usize).cloned()
    }

    fn last_entry(&self) -> (LogIndex, Option<LogEntry>) {
        match self.log.last() {
            Some(entry) => (self.log.len() as LogIndex - 1, Some(entry.clone())),
            None => (0, None),
        }
    }

    fn log_slice(&self, from: LogIndex, to: LogIndex) -> Result<Vec<LogEntry>> {
        let (from_us, to_us) = (from as usize, to as usize);
        if from_us > to_us || to_us > self.log.len() {
            return Err(RaftError::LogOutOfBounds { from, to });
        }
        Ok(self.log[from_us..to_us].to_vec())
    }

    fn log_update(&mut self, start: LogIndex, entries: Vec<LogEntry>) -> Result<()> {
        let start_us = start as usize;
        if start_us > self.log.len() {
            return Err(RaftError::LogOutOfBounds {
                from: start,
                to: start + entries.len() as LogIndex,
            });
        }
        self.log.truncate(start_us);
        self.log.extend(entries);
        Ok(())
    }
}
