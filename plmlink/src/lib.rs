//! # plmlink
//!
//! Async communication driver for Insteon-style powerline modems and
//! network-attached hubs.
//!
//! ## Features
//!
//! - Incremental frame codec with noise resynchronization
//! - Bus flow control: at most one unacknowledged send outstanding,
//!   NACK/timeout handled by retransmission
//! - Listener fan-out of all inbound traffic
//! - Serial and TCP hub transports, using Tokio
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plmlink::Port;
//! use plmlink_core::defs::modem_layouts;
//! use plmlink_transport::SerialTransport;
//!
//! #[tokio::main]
//! async fn main() -> plmlink::Result<()> {
//!     let transport = SerialTransport::new("/dev/ttyUSB0");
//!     let mut port = Port::new(Box::new(transport), Arc::new(modem_layouts()));
//!
//!     port.start().await?;
//!
//!     // Replies and bus traffic arrive through listeners; see
//!     // `Port::add_listener`.
//!
//!     port.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod listener;
mod modem;
pub mod port;

// Re-exports
pub use error::{Error, Result};
pub use listener::{ListenerRegistry, MsgListener};
pub use port::Port;

// Re-export types
pub use plmlink_core::{Direction, Message, MessageBuilder};
pub use plmlink_transport::{SerialTransport, TcpTransport, Transport};
pub use plmlink_types::{Address, ModemInfo};
