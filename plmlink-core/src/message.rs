//! Framed message structure and field decoding

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use plmlink_types::Address;

use crate::constants::{NACK_BYTE, START_BYTE};
use crate::error::{Error, Result};
use crate::layout::{FieldType, FieldValue, FrameLayout};

/// Direction a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to modem
    Outbound,

    /// Modem to host
    Inbound,
}

/// One complete framed unit of the wire protocol
///
/// Immutable once constructed. Inbound messages come out of the
/// [`MessageCodec`](crate::MessageCodec); outbound ones are assembled with
/// [`MessageBuilder`]. The raw bytes always match the length registered for
/// the command byte; a mismatch is a construction error, never a
/// partially-valid message.
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    raw: Bytes,
    direction: Direction,
    layout: Option<Arc<FrameLayout>>,
    quiet_time: Duration,
}

impl Message {
    /// Construct an inbound message from raw frame bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the byte count does not match the layout length.
    pub fn inbound(raw: Bytes, layout: Arc<FrameLayout>) -> Result<Self> {
        if raw.len() != layout.length {
            return Err(Error::LengthMismatch {
                command: layout.command,
                expected: layout.length,
                actual: raw.len(),
            });
        }

        Ok(Self {
            raw,
            direction: Direction::Inbound,
            layout: Some(layout),
            quiet_time: Duration::ZERO,
        })
    }

    /// The one-byte pure negative-acknowledgement frame
    pub fn pure_nack() -> Self {
        Self {
            raw: Bytes::from_static(&[NACK_BYTE]),
            direction: Direction::Inbound,
            layout: None,
            quiet_time: Duration::ZERO,
        }
    }

    /// Exact bytes as sent or received
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Minimum delay to observe after this message completes before the
    /// next outbound send (bus-level rate limiting)
    pub fn quiet_time(&self) -> Duration {
        self.quiet_time
    }

    /// Command byte of the frame (the NACK byte for a pure NACK)
    pub fn command(&self) -> u8 {
        match &self.layout {
            Some(layout) => layout.command,
            None => NACK_BYTE,
        }
    }

    /// Layout this message was decoded with, absent for the pure NACK
    pub fn layout(&self) -> Option<&Arc<FrameLayout>> {
        self.layout.as_ref()
    }

    /// Is this the one-byte pure negative acknowledgement?
    pub fn is_pure_nack(&self) -> bool {
        self.raw.len() == 1 && self.raw[0] == NACK_BYTE
    }

    /// Is this an inbound frame that is not a direct reply to a host command?
    pub fn is_unsolicited(&self) -> bool {
        match &self.layout {
            Some(layout) => self.direction == Direction::Inbound && !layout.solicited,
            None => false,
        }
    }

    /// Is this a well-formed solicited reply whose trailing status byte
    /// reports a negative acknowledgement?
    pub fn is_reply_nack(&self) -> bool {
        match &self.layout {
            Some(layout) => layout.solicited && self.raw.last() == Some(&NACK_BYTE),
            None => false,
        }
    }

    /// Does this message carry a `toAddress` field equal to `addr`?
    pub fn is_addressed_to(&self, addr: &Address) -> bool {
        matches!(self.get_address("toAddress"), Ok(a) if a == *addr)
    }

    /// Decode a named field
    pub fn get_field(&self, name: &str) -> Result<FieldValue> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        let field = layout
            .field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;

        let value = match field.field_type {
            FieldType::Byte => FieldValue::Byte(self.raw[field.offset]),
            FieldType::Address => {
                let b = &self.raw[field.offset..field.offset + 3];
                FieldValue::Address(Address::from_bytes([b[0], b[1], b[2]]))
            }
        };

        Ok(value)
    }

    /// Decode a named byte field
    pub fn get_byte(&self, name: &str) -> Result<u8> {
        match self.get_field(name)? {
            FieldValue::Byte(b) => Ok(b),
            _ => Err(Error::FieldTypeMismatch {
                field: name.to_string(),
                expected: "byte",
            }),
        }
    }

    /// Decode a named address field
    pub fn get_address(&self, name: &str) -> Result<Address> {
        match self.get_field(name)? {
            FieldValue::Address(a) => Ok(a),
            _ => Err(Error::FieldTypeMismatch {
                field: name.to_string(),
                expected: "address",
            }),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("command", &format!("0x{:02X}", self.command()))
            .field("direction", &self.direction)
            .field("len", &self.raw.len())
            .field("quiet_time", &self.quiet_time)
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Msg[0x{:02X} {} {}]",
            self.command(),
            match self.direction {
                Direction::Outbound => "out",
                Direction::Inbound => "in",
            },
            hex::encode_upper(&self.raw)
        )
    }
}

/// Builder for outbound messages
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use plmlink_core::defs::{modem_layouts, CMD_SEND_STD_MSG};
/// use plmlink_core::{LayoutTable, MessageBuilder};
///
/// let table = modem_layouts();
/// let layout = table.layout_for(CMD_SEND_STD_MSG).unwrap();
///
/// let msg = MessageBuilder::new(layout)
///     .set_address("toAddress", "23.9B.65".parse().unwrap()).unwrap()
///     .set_byte("command1", 0x11).unwrap()
///     .set_byte("command2", 0xFF).unwrap()
///     .quiet_time(Duration::from_millis(250))
///     .build();
///
/// assert_eq!(msg.raw().len(), 9);
/// assert_eq!(msg.raw()[0], 0x02);
/// ```
pub struct MessageBuilder {
    layout: Arc<FrameLayout>,
    raw: Vec<u8>,
    quiet_time: Duration,
}

impl MessageBuilder {
    /// Start building a frame for the given layout; header bytes are filled
    /// in, all field bytes start zeroed
    pub fn new(layout: Arc<FrameLayout>) -> Self {
        let mut raw = vec![0u8; layout.length];
        raw[0] = START_BYTE;
        raw[1] = layout.command;

        Self {
            layout,
            raw,
            quiet_time: Duration::ZERO,
        }
    }

    /// Set a named byte field
    pub fn set_byte(mut self, name: &str, value: u8) -> Result<Self> {
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        if field.field_type != FieldType::Byte {
            return Err(Error::FieldTypeMismatch {
                field: name.to_string(),
                expected: "byte",
            });
        }

        self.raw[field.offset] = value;
        Ok(self)
    }

    /// Set a named address field
    pub fn set_address(mut self, name: &str, value: Address) -> Result<Self> {
        let field = self
            .layout
            .field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        if field.field_type != FieldType::Address {
            return Err(Error::FieldTypeMismatch {
                field: name.to_string(),
                expected: "address",
            });
        }

        self.raw[field.offset..field.offset + 3].copy_from_slice(&value.bytes());
        Ok(self)
    }

    /// Set the post-send quiet time
    pub fn quiet_time(mut self, quiet_time: Duration) -> Self {
        self.quiet_time = quiet_time;
        self
    }

    /// Finish the outbound message
    pub fn build(self) -> Message {
        Message {
            raw: Bytes::from(self.raw),
            direction: Direction::Outbound,
            layout: Some(self.layout),
            quiet_time: self.quiet_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{modem_layouts, CMD_GET_MODEM_INFO, CMD_SEND_STD_MSG, CMD_STD_MSG_RECEIVED};
    use crate::layout::LayoutTable;
    use pretty_assertions::assert_eq;

    fn layout(command: u8) -> Arc<FrameLayout> {
        modem_layouts().layout_for(command).unwrap()
    }

    #[test]
    fn test_inbound_length_invariant() {
        let raw = Bytes::from_static(&[0x02, 0x60, 0x23, 0x9B, 0x65, 0x03, 0x20, 0x9C]);
        let result = Message::inbound(raw, layout(CMD_GET_MODEM_INFO));
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                command: 0x60,
                expected: 9,
                actual: 8,
            })
        ));
    }

    #[test]
    fn test_inbound_field_decoding() {
        let raw = Bytes::from_static(&[
            0x02, 0x50, 0x23, 0x9B, 0x65, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF,
        ]);
        let msg = Message::inbound(raw, layout(CMD_STD_MSG_RECEIVED)).unwrap();

        assert_eq!(
            msg.get_address("fromAddress").unwrap(),
            Address::from_bytes([0x23, 0x9B, 0x65])
        );
        assert_eq!(
            msg.get_address("toAddress").unwrap(),
            Address::from_bytes([0x11, 0x22, 0x33])
        );
        assert_eq!(msg.get_byte("command1").unwrap(), 0x11);
        assert_eq!(msg.get_byte("command2").unwrap(), 0xFF);

        assert!(msg.is_addressed_to(&Address::from_bytes([0x11, 0x22, 0x33])));
        assert!(!msg.is_addressed_to(&Address::from_bytes([0x11, 0x22, 0x34])));
    }

    #[test]
    fn test_field_errors() {
        let raw = Bytes::from_static(&[
            0x02, 0x50, 0x23, 0x9B, 0x65, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF,
        ]);
        let msg = Message::inbound(raw, layout(CMD_STD_MSG_RECEIVED)).unwrap();

        assert!(matches!(
            msg.get_byte("nope"),
            Err(Error::UnknownField(_))
        ));
        assert!(matches!(
            msg.get_byte("fromAddress"),
            Err(Error::FieldTypeMismatch { .. })
        ));
        assert!(matches!(
            msg.get_address("command1"),
            Err(Error::FieldTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_predicates() {
        let nack = Message::pure_nack();
        assert!(nack.is_pure_nack());
        assert!(!nack.is_unsolicited());
        assert_eq!(nack.command(), NACK_BYTE);

        let broadcast = Message::inbound(
            Bytes::from_static(&[
                0x02, 0x50, 0x23, 0x9B, 0x65, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF,
            ]),
            layout(CMD_STD_MSG_RECEIVED),
        )
        .unwrap();
        assert!(broadcast.is_unsolicited());
        assert!(!broadcast.is_pure_nack());
        assert!(!broadcast.is_reply_nack());

        let acked_reply = Message::inbound(
            Bytes::from_static(&[0x02, 0x62, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF, 0x06]),
            layout(CMD_SEND_STD_MSG),
        )
        .unwrap();
        assert!(!acked_reply.is_unsolicited());
        assert!(!acked_reply.is_reply_nack());

        let nacked_reply = Message::inbound(
            Bytes::from_static(&[0x02, 0x62, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF, 0x15]),
            layout(CMD_SEND_STD_MSG),
        )
        .unwrap();
        assert!(nacked_reply.is_reply_nack());
        assert!(!nacked_reply.is_pure_nack());
    }

    #[test]
    fn test_builder() {
        let msg = MessageBuilder::new(layout(CMD_SEND_STD_MSG))
            .set_address("toAddress", Address::from_bytes([0x23, 0x9B, 0x65]))
            .unwrap()
            .set_byte("messageFlags", 0x0F)
            .unwrap()
            .set_byte("command1", 0x11)
            .unwrap()
            .set_byte("command2", 0xFF)
            .unwrap()
            .quiet_time(Duration::from_millis(250))
            .build();

        assert_eq!(
            msg.raw().as_ref(),
            &[0x02, 0x62, 0x23, 0x9B, 0x65, 0x0F, 0x11, 0xFF, 0x00]
        );
        assert_eq!(msg.direction(), Direction::Outbound);
        assert_eq!(msg.quiet_time(), Duration::from_millis(250));
    }

    #[test]
    fn test_builder_unknown_field() {
        let result = MessageBuilder::new(layout(CMD_SEND_STD_MSG)).set_byte("bogus", 1);
        assert!(matches!(result, Err(Error::UnknownField(_))));

        let result =
            MessageBuilder::new(layout(CMD_SEND_STD_MSG)).set_byte("toAddress", 1);
        assert!(matches!(result, Err(Error::FieldTypeMismatch { .. })));
    }

    #[test]
    fn test_display() {
        let msg = Message::pure_nack();
        assert_eq!(msg.to_string(), "Msg[0x15 in 15]");
    }
}
