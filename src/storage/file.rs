use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::raft::types::{LogEntry, LogIndex};
use crate::util::errors::{RaftError, Result};

use super::persister::{Persister, RaftFields};

/// File-backed persister: stable fields and log in two bincode files under a
/// data directory, loaded on open and rewritten (with fsync) on every durable
/// mutation.
pub struct FilePersister {
    data_dir: PathBuf,
    fields: Option<RaftFields>,
    log: Vec<LogEntry>,
}

impl FilePersister {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;

        let mut store = Self {
            data_dir,
            fields: None,
            log: Vec::new(),
        };
        store.fields = store.load_fields()?;
        store.log = store.load_log()?;
        Ok(store)
    }

    fn fields_path(&self) -> PathBuf {
        self.data_dir.join("raft_fields.bin")
    }

    fn log_path(&self) -> PathBuf {
        self.data_dir.join("raft_log.bin")
    }

    fn load_fields(&self) -> Result<Option<RaftFields>> {
        let path = self.fields_path();
        if !path.exists() {
            return Ok(None);
        }

        let buffer = read_all(path)?;
        if buffer.is_empty() {
            return Ok(None);
        }

        let fields: Option<RaftFields> = bincode::deserialize(&buffer)?;
        if let Some(ref fields) = fields {
            tracing::info!(
                "Loaded persistent fields: term={}, voted_for={:?}",
                fields.term,
                fields.voted_for
            );
        }
        Ok(fields)
    }

    fn load_log(&self) -> Result<Vec<LogEntry>> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let buffer = read_all(path)?;
        if buffer.is_empty() {
            return Ok(Vec::new());
        }

        let log: Vec<LogEntry> = bincode::deserialize(&buffer)?;
        tracing::info!("Loaded {} log entries from disk", log.len());
        Ok(log)
    }

    fn save_fields(&self) -> Result<()> {
        let encoded = bincode::serialize(&self.fields)?;
        write_all(self.fields_path(), &encoded)
    }

    fn save_log(&self) -> Result<()> {
        let encoded = bincode::serialize(&self.log)?;
        write_all(self.log_path(), &encoded)
    }
}

fn read_all(path: PathBuf) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn write_all(path: PathBuf, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

impl Persister for FilePersister {
    fn get_fields(&self) -> Option<RaftFields> {
        self.fields.clone()
    }

    fn set_fields(&mut self, fields: RaftFields) -> Result<()> {
        self.fields = Some(fields);
        self.save_fields()
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
        self.save_log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raft::types::{sentinel, ClientEntry, LogEntry};
    use tempfile::TempDir;

    #[test]
    fn fields_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut store = FilePersister::new(path.clone()).unwrap();
            store
                .set_fields(RaftFields {
                    term: 20,
                    voted_for: Some(9),
                })
                .unwrap();
        }

        let store = FilePersister::new(path).unwrap();
        assert_eq!(
            store.get_fields(),
            Some(RaftFields {
                term: 20,
                voted_for: Some(9),
            })
        );
    }

    #[test]
    fn log_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        let entries = vec![
            sentinel(),
            LogEntry::new(1, None),
            LogEntry::new(1, Some(ClientEntry::new(1234, b"Yo!".to_vec()))),
        ];
        {
            let mut store = FilePersister::new(path.clone()).unwrap();
            store.log_update(0, entries.clone()).unwrap();
        }

        let store = FilePersister::new(path).unwrap();
        assert_eq!(store.last_entry(), (2, Some(entries[2].clone())));
        assert_eq!(store.log_slice(0, 3).unwrap(), entries);
    }

    #[test]
    fn overwrite_replaces_the_tail_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();

        {
            let mut store = FilePersister::new(path.clone()).unwrap();
            store
                .log_update(0, vec![sentinel(), LogEntry::new(1, None), LogEntry::new(1, None)])
                .unwrap();
            store.log_update(1, vec![LogEntry::new(2, None)]).unwrap();
        }

        let store = FilePersister::new(path).unwrap();
        assert_eq!(store.last_entry(), (1, Some(LogEntry::new(2, None))));
    }
}
