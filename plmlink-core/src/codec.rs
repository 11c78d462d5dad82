//! Incremental stream codec
//!
//! Accumulates raw bytes from the transport and extracts complete frames as
//! soon as enough bytes are available. Stateful but never blocking: callers
//! append with [`MessageCodec::add_data`] and then call
//! [`MessageCodec::process_data`] in a loop until it returns `Ok(None)`.

use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use crate::constants::{NACK_BYTE, START_BYTE};
use crate::error::{Error, Result};
use crate::layout::LayoutTable;
use crate::message::Message;
use crate::HEADER_SIZE;

/// Stateful frame extractor over an accumulated byte stream
pub struct MessageCodec {
    buf: BytesMut,
    table: Arc<dyn LayoutTable>,
}

impl MessageCodec {
    pub fn new(table: Arc<dyn LayoutTable>) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            table,
        }
    }

    /// Append raw bytes to the accumulation buffer; no parsing happens here
    pub fn add_data(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes currently buffered and not yet consumed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Try to extract exactly one message from the front of the buffer
    ///
    /// Bytes preceding a recognizable frame start are discarded one at a
    /// time (resynchronization after line noise).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCommand`] when the byte after a start marker
    /// has no registered layout. The start marker is dropped so scanning can
    /// resume; the caller should treat any outstanding reply wait as
    /// implicitly satisfied, since the frame it was waiting on may be the
    /// one that could not be classified.
    pub fn process_data(&mut self) -> Result<Option<Message>> {
        // Discard noise until a start marker or a lone NACK byte
        let noise = self
            .buf
            .iter()
            .position(|&b| b == START_BYTE || b == NACK_BYTE)
            .unwrap_or(self.buf.len());
        if noise > 0 {
            debug!(bytes = noise, "Discarding noise before frame start");
            self.buf.advance(noise);
        }

        if self.buf.is_empty() {
            return Ok(None);
        }

        if self.buf[0] == NACK_BYTE {
            self.buf.advance(1);
            trace!("Extracted pure NACK");
            return Ok(Some(Message::pure_nack()));
        }

        if self.buf.len() < HEADER_SIZE {
            return Ok(None);
        }

        let command = self.buf[1];
        let Some(layout) = self.table.layout_for(command) else {
            // Drop the start marker so the unknown byte is rescanned as
            // potential noise on the next call
            self.buf.advance(1);
            return Err(Error::UnknownCommand(command));
        };

        if self.buf.len() < layout.length {
            return Ok(None);
        }

        let raw = self.buf.split_to(layout.length).freeze();
        trace!(
            command = format!("0x{:02X}", command),
            len = raw.len(),
            "Extracted frame"
        );

        Ok(Some(Message::inbound(raw, layout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{modem_layouts, CMD_GET_MODEM_INFO, CMD_STD_MSG_RECEIVED};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn codec() -> MessageCodec {
        MessageCodec::new(Arc::new(modem_layouts()))
    }

    fn std_msg_frame() -> Vec<u8> {
        vec![0x02, 0x50, 0x23, 0x9B, 0x65, 0x11, 0x22, 0x33, 0x0F, 0x11, 0xFF]
    }

    fn modem_info_frame() -> Vec<u8> {
        vec![0x02, 0x60, 0x23, 0x9B, 0x65, 0x03, 0x20, 0x9C, 0x06]
    }

    /// Pull every currently-complete message, ignoring parse faults
    fn drain(codec: &mut MessageCodec) -> Vec<Message> {
        let mut out = Vec::new();
        loop {
            match codec.process_data() {
                Ok(Some(msg)) => out.push(msg),
                Ok(None) => return out,
                Err(_) => continue,
            }
        }
    }

    #[test]
    fn test_single_frame() {
        let mut codec = codec();
        codec.add_data(&std_msg_frame());

        let msg = codec.process_data().unwrap().unwrap();
        assert_eq!(msg.command(), CMD_STD_MSG_RECEIVED);
        assert_eq!(msg.raw().as_ref(), std_msg_frame().as_slice());
        assert_eq!(codec.buffered(), 0);

        assert!(codec.process_data().unwrap().is_none());
    }

    #[test]
    fn test_incomplete_frame_stability() {
        let mut codec = codec();
        let frame = std_msg_frame();

        codec.add_data(&frame[..7]);
        for _ in 0..5 {
            assert!(codec.process_data().unwrap().is_none());
        }

        codec.add_data(&frame[7..]);
        let msg = codec.process_data().unwrap().unwrap();
        assert_eq!(msg.raw().as_ref(), frame.as_slice());
    }

    #[test]
    fn test_resynchronization_after_noise() {
        let mut codec = codec();
        let mut stream = vec![0xDE, 0xAD, 0x01];
        stream.extend_from_slice(&std_msg_frame());
        stream.extend_from_slice(&modem_info_frame());
        codec.add_data(&stream);

        let msgs = drain(&mut codec);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].command(), CMD_STD_MSG_RECEIVED);
        assert_eq!(msgs[1].command(), CMD_GET_MODEM_INFO);
    }

    #[test]
    fn test_unknown_command() {
        let mut codec = codec();
        codec.add_data(&[0x02, 0x7F]);
        codec.add_data(&modem_info_frame());

        // Unknown command surfaces as an error once, then the codec
        // resynchronizes on the next frame
        assert!(matches!(
            codec.process_data(),
            Err(Error::UnknownCommand(0x7F))
        ));
        let msg = codec.process_data().unwrap().unwrap();
        assert_eq!(msg.command(), CMD_GET_MODEM_INFO);
    }

    #[test]
    fn test_pure_nack_extraction() {
        let mut codec = codec();
        codec.add_data(&[0x15]);
        codec.add_data(&std_msg_frame());

        let msgs = drain(&mut codec);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].is_pure_nack());
        assert_eq!(msgs[1].command(), CMD_STD_MSG_RECEIVED);
    }

    #[test]
    fn test_empty_buffer() {
        let mut codec = codec();
        assert!(codec.process_data().unwrap().is_none());
        codec.add_data(&[]);
        assert!(codec.process_data().unwrap().is_none());
    }

    prop_compose! {
        /// One well-formed frame from the standard table with a random body
        fn arb_frame()(cmd in prop::sample::select(vec![0x50u8, 0x51, 0x60, 0x62]),
                       body in prop::collection::vec(any::<u8>(), 0..32))
                       -> Vec<u8> {
            let len = modem_layouts().frame_len(cmd).unwrap();
            let mut frame = vec![0x02, cmd];
            frame.extend(body.iter().cycle().take(len - 2).copied());
            if frame.len() < len {
                frame.resize(len, 0);
            }
            frame
        }
    }

    proptest! {
        /// Feeding a stream byte-at-a-time yields the same messages as
        /// feeding it all at once
        #[test]
        fn prop_byte_at_a_time_equivalence(
            frames in prop::collection::vec(arb_frame(), 1..8)
        ) {
            let stream: Vec<u8> = frames.iter().flatten().copied().collect();

            let mut all_at_once = codec();
            all_at_once.add_data(&stream);
            let bulk = drain(&mut all_at_once);

            let mut incremental = codec();
            let mut trickled = Vec::new();
            for &byte in &stream {
                incremental.add_data(&[byte]);
                trickled.extend(drain(&mut incremental));
            }

            prop_assert_eq!(bulk.len(), trickled.len());
            for (a, b) in bulk.iter().zip(trickled.iter()) {
                prop_assert_eq!(a.raw(), b.raw());
            }
        }
    }
}
