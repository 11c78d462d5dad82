//! Type definitions for plmlink

pub mod address;
pub mod error;
pub mod modem_info;

pub use address::Address;
pub use error::{Error, Result};
pub use modem_info::ModemInfo;
