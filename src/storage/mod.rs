pub mod file;
pub mod memory;
pub mod persister;

pub use file::FilePersister;
pub use memory::MemPersister;
pub use persister::{Persister, RaftFields};
