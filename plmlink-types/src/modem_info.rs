//! Modem identification structures

use std::fmt;

use crate::address::Address;

/// Identity of the local modem/hub, as reported on the bus at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemInfo {
    /// Bus address of the modem
    pub address: Address,

    /// Device category (product family)
    pub category: u8,

    /// Device subcategory (model within the family)
    pub subcategory: u8,

    /// Firmware revision
    pub firmware_version: u8,
}

impl ModemInfo {
    pub fn new(address: Address, category: u8, subcategory: u8, firmware_version: u8) -> Self {
        Self {
            address,
            category,
            subcategory,
            firmware_version,
        }
    }
}

impl fmt::Display for ModemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Modem[{}, cat: 0x{:02X}, sub: 0x{:02X}, fw: 0x{:02X}]",
            self.address, self.category, self.subcategory, self.firmware_version
        )
    }
}
