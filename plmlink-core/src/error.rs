//! Error types for plmlink-core

/// Result type alias for core protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command byte has no registered frame layout
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Frame length does not match the registered layout
    #[error("Frame length mismatch for command 0x{command:02X}: expected {expected} bytes, got {actual} bytes")]
    LengthMismatch {
        command: u8,
        expected: usize,
        actual: usize,
    },

    /// Field name not defined by the message's layout
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field accessed with the wrong type
    #[error("Field type mismatch for {field}: expected {expected}")]
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// Layout registered with a field outside the frame bounds
    #[error("Field {field} at offset {offset} does not fit in a {length}-byte frame")]
    FieldOutOfBounds {
        field: String,
        offset: usize,
        length: usize,
    },

    /// Layout already registered for this command byte
    #[error("Duplicate layout for command 0x{0:02X}")]
    DuplicateLayout(u8),

    /// Layout shorter than the two header bytes
    #[error("Invalid frame length {0}: must be at least the 2-byte header")]
    InvalidLength(usize),
}
