//! Serial transport for locally attached modems

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, warn};

use crate::{error::*, Transport, TransportReader, TransportWriter};

/// Default baud rate of powerline modems
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Serial transport for a modem on a local port (USB or RS-232)
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    open: bool,
}

impl SerialTransport {
    /// Create new serial transport, e.g. for `/dev/ttyUSB0`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            open: false,
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<(TransportReader, TransportWriter)> {
        if self.open {
            return Err(Error::AlreadyOpen);
        }

        debug!("Opening serial port {} at {} baud...", self.path, self.baud_rate);

        let stream = tokio_serial::new(&self.path, self.baud_rate).open_native_async()?;

        debug!("Opened serial port {}", self.path);

        self.open = true;
        let (rd, wr) = tokio::io::split(stream);
        Ok((Box::new(rd), Box::new(wr)))
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            debug!("Closing serial port {}", self.path);
            self.open = false;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn description(&self) -> String {
        self.path.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Serial transport dropped while still open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serial_transport_create() {
        let transport = SerialTransport::new("/dev/ttyUSB0").with_baud_rate(115200);
        assert!(!transport.is_open());
        assert_eq!(transport.description(), "/dev/ttyUSB0");
    }

    #[tokio::test]
    async fn test_serial_transport_missing_port() {
        let mut transport = SerialTransport::new("/dev/does-not-exist");
        assert!(transport.open().await.is_err());
        assert!(!transport.is_open());

        // close() after a failed open is a no-op
        transport.close().await.unwrap();
    }
}
