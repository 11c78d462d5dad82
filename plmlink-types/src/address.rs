//! Device addresses on the powerline bus

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Three-byte bus address of a device or modem
///
/// Rendered as dotted upper-case hex, e.g. `23.9B.65`.
///
/// # Examples
///
/// ```
/// use plmlink_types::Address;
///
/// let addr: Address = "23.9B.65".parse().unwrap();
/// assert_eq!(addr.bytes(), [0x23, 0x9B, 0x65]);
/// assert_eq!(addr.to_string(), "23.9B.65");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 3]);

impl Address {
    /// Create an address from its three raw bytes
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Raw bytes, high byte first (wire order)
    pub fn bytes(&self) -> [u8; 3] {
        self.0
    }
}

impl From<[u8; 3]> for Address {
    fn from(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::Parse(format!("Invalid address: {}", s)));
        }

        let mut bytes = [0u8; 3];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::Parse(format!("Invalid address byte: {}", part)))?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}.{:02X}.{:02X}", self.0[0], self.0[1], self.0[2])
    }
}
