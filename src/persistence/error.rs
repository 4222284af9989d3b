//! Error type for save/load

use std::io;

use thiserror::Error;

/// Everything that can go wrong while writing or reading a save stream.
#[derive(Error, Debug)]
pub enum PersistError {
    /// The file could not be opened, written or renamed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a value.
    #[error("save stream ended unexpectedly")]
    Truncated,

    /// The stream was written by a newer build.
    #[error("unsupported future save version {found} (newest known is {max})")]
    UnsupportedVersion { found: i32, max: i32 },

    /// A collection count prefix decoded to a negative number.
    #[error("negative element count {0} in save stream")]
    NegativeCount(i32),

    /// A collection is too long for its `i32` count prefix.
    #[error("collection of {0} elements does not fit a count prefix")]
    CountTooLarge(usize),

    /// A decoded number is outside the range the field allows.
    #[error("invalid {field} {value} in save stream")]
    InvalidValue { field: &'static str, value: f32 },

    /// No shape prefab is registered under this identifier.
    #[error("no shape registered under id {0}")]
    UnknownShape(i32),

    /// No material is registered under this identifier.
    #[error("no material registered under id {0}")]
    UnknownMaterial(i32),

    /// A shape identifier may only be assigned once.
    #[error("shape id already set to {current}, refusing to change it to {attempted}")]
    ShapeIdAlreadySet { current: u32, attempted: u32 },

    /// The random generator state could not be captured or restored.
    #[error("random state blob: {0}")]
    RandomState(#[from] bincode::Error),

    /// The level host has no level with this index.
    #[error("level {0} does not exist")]
    MissingLevel(i32),

    /// Another save/load or level switch is still in flight.
    #[error("a save, load or level switch is already in progress")]
    Busy,

    /// The load was abandoned before it finished.
    #[error("load cancelled")]
    Cancelled,

    /// The settings file could not be encoded or decoded.
    #[error("settings: {0}")]
    Settings(#[from] serde_json::Error),
}

impl PersistError {
    /// Maps a read error, treating an early end of stream as truncation.
    pub fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            PersistError::Truncated
        } else {
            PersistError::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
