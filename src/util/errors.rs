use std::io;

use crate::raft::types::LogIndex;

#[derive(Debug)]
pub enum RaftError {
    InvalidConfig(String),
    StorageError(String),
    LogOutOfBounds { from: LogIndex, to: LogIndex },
    IoError(io::Error),
    SerializationError(String),
}

impl std::fmt::Display for RaftError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaftError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            RaftError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            RaftError::LogOutOfBounds { from, to } => {
                write!(f, "Log range [{}, {}) out of bounds", from, to)
            }
            RaftError::IoError(err) => write!(f, "IO error: {}", err),
            RaftError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for RaftError {}

impl From<io::Error> for RaftError {
    fn from(err: io::Error) -> Self {
        RaftError::IoError(err)
    }
}

impl From<bincode::Error> for RaftError {
    fn from(err: bincode::Error) -> Self {
        RaftError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RaftError>;
