//! Versioned binary save/load
//!
//! Features:
//! - Little-endian primitive codec with a leading version header
//! - Version-gated record evolution (older saves stay loadable)
//! - Atomic save (tmp → save)
//! - Suspendable game load across a level switch

pub mod error;
pub mod random;
pub mod reader;
pub mod record;
pub mod storage;
pub mod writer;

pub use error::{PersistError, Result};
pub use random::{RANDOM_STATE_SIZE, RandomState};
pub use reader::GameDataReader;
pub use record::Persistable;
pub use storage::{LoadOperation, LoadPhase, LoadProgress, PersistentStorage, SAVE_FILE_NAME};
pub use writer::GameDataWriter;
