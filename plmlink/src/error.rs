//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] plmlink_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] plmlink_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] plmlink_types::Error),

    #[error("Port is not running")]
    NotRunning,

    #[error("Port is already running")]
    AlreadyRunning,

    #[error("Port cannot be restarted; create a new instance")]
    NotRestartable,

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}
