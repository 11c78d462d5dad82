//! Wire constants

use std::time::Duration;

/// Frame start marker; every well-formed frame begins with this byte
pub const START_BYTE: u8 = 0x02;

/// Positive acknowledgement status byte (trailing byte of a solicited reply)
pub const ACK_BYTE: u8 = 0x06;

/// Negative acknowledgement byte
///
/// Appears either as the trailing status byte of a solicited reply, or
/// alone on the wire as a one-byte pure NACK when the modem cannot accept
/// a command at all.
pub const NACK_BYTE: u8 = 0x15;

/// How long the writer waits for the reply to one send before treating
/// the attempt as nacked
pub const ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed backoff between a NACK (or timeout) and the retransmission
pub const RETRY_BACKOFF: Duration = Duration::from_millis(250);
