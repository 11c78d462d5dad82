//! Transport layer for powerline modem communication
//!
//! Provides the duplex byte channel the driver runs over: a local serial
//! port or a TCP connection to a network-attached hub.

pub mod error;
pub mod serial;
pub mod tcp;

pub use error::{Error, Result};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read half of an opened transport
pub type TransportReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an opened transport
pub type TransportWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Duplex byte channel to the modem
///
/// Opening yields owned read and write halves so the driver's reader and
/// writer tasks can each hold their own direction of the channel. Dropping
/// both halves releases the underlying connection.
#[async_trait]
pub trait Transport: Send {
    /// Open the channel and hand out its halves
    async fn open(&mut self) -> Result<(TransportReader, TransportWriter)>;

    /// Close the channel
    async fn close(&mut self) -> Result<()>;

    /// Check if the channel has been opened and not yet closed
    fn is_open(&self) -> bool;

    /// Human-readable endpoint description, for logging
    fn description(&self) -> String;
}
