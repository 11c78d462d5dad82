//! # plmlink-core
//!
//! Core protocol implementation for powerline modem communication.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame layout tables (command byte -> frame length and field offsets)
//! - Message structure and field decoding
//! - Incremental stream codec with resynchronization
//! - Wire constants

pub mod codec;
pub mod constants;
pub mod defs;
pub mod error;
pub mod layout;
pub mod message;

pub use codec::MessageCodec;
pub use error::{Error, Result};
pub use layout::{FieldDef, FieldType, FieldValue, FrameLayout, LayoutRegistry, LayoutTable};
pub use message::{Direction, Message, MessageBuilder};

/// Default TCP port of network-attached hubs
pub const DEFAULT_HUB_PORT: u16 = 9761;

/// Frame header size (start marker + command byte)
pub const HEADER_SIZE: usize = 2;
