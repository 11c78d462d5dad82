//! Standard modem frame definitions
//!
//! The minimal set of frame layouts the driver itself depends on: the modem
//! identification exchange and the basic send/receive frames. Anything beyond
//! this is registered by the application against its own device database.

use crate::layout::{FieldDef, FieldType, FrameLayout, LayoutRegistry};

/// Standard message received from a device on the bus
pub const CMD_STD_MSG_RECEIVED: u8 = 0x50;

/// Extended message received (14 bytes of user data)
pub const CMD_EXT_MSG_RECEIVED: u8 = 0x51;

/// Modem identification reply
pub const CMD_GET_MODEM_INFO: u8 = 0x60;

/// Send standard message (echoed back by the modem with a status byte)
pub const CMD_SEND_STD_MSG: u8 = 0x62;

/// Layout of the outbound modem identification request
///
/// The request is header-only; the 9-byte reply layout lives in the inbound
/// table built by [`modem_layouts`].
pub fn modem_info_request_layout() -> FrameLayout {
    FrameLayout::new(CMD_GET_MODEM_INFO, 2, true, vec![])
}

/// Build the inbound layout table for the standard modem frames
pub fn modem_layouts() -> LayoutRegistry {
    let mut registry = LayoutRegistry::new();

    let layouts = vec![
        FrameLayout::new(
            CMD_STD_MSG_RECEIVED,
            11,
            false,
            vec![
                FieldDef::new("fromAddress", 2, FieldType::Address),
                FieldDef::new("toAddress", 5, FieldType::Address),
                FieldDef::new("messageFlags", 8, FieldType::Byte),
                FieldDef::new("command1", 9, FieldType::Byte),
                FieldDef::new("command2", 10, FieldType::Byte),
            ],
        ),
        FrameLayout::new(
            CMD_EXT_MSG_RECEIVED,
            25,
            false,
            vec![
                FieldDef::new("fromAddress", 2, FieldType::Address),
                FieldDef::new("toAddress", 5, FieldType::Address),
                FieldDef::new("messageFlags", 8, FieldType::Byte),
                FieldDef::new("command1", 9, FieldType::Byte),
                FieldDef::new("command2", 10, FieldType::Byte),
            ],
        ),
        FrameLayout::new(
            CMD_GET_MODEM_INFO,
            9,
            true,
            vec![
                FieldDef::new("address", 2, FieldType::Address),
                FieldDef::new("category", 5, FieldType::Byte),
                FieldDef::new("subcategory", 6, FieldType::Byte),
                FieldDef::new("firmwareVersion", 7, FieldType::Byte),
                FieldDef::new("status", 8, FieldType::Byte),
            ],
        ),
        FrameLayout::new(
            CMD_SEND_STD_MSG,
            9,
            true,
            vec![
                FieldDef::new("toAddress", 2, FieldType::Address),
                FieldDef::new("messageFlags", 5, FieldType::Byte),
                FieldDef::new("command1", 6, FieldType::Byte),
                FieldDef::new("command2", 7, FieldType::Byte),
                FieldDef::new("status", 8, FieldType::Byte),
            ],
        ),
    ];

    for layout in layouts {
        // Table is built from literals above; registration cannot fail
        registry
            .register(layout)
            .unwrap_or_else(|e| unreachable!("bad builtin layout: {e}"));
    }

    registry
}
