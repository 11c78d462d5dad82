//! Modem bootstrap listener
//!
//! One-shot listener registered by [`Port::start`](crate::Port::start): it
//! watches for the modem identification reply, publishes the parsed
//! [`ModemInfo`], and deregisters itself from inside its own callback.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use plmlink_core::defs::{modem_info_request_layout, CMD_GET_MODEM_INFO};
use plmlink_core::{Message, MessageBuilder};
use plmlink_types::ModemInfo;

use crate::listener::{ListenerRegistry, MsgListener};

pub(crate) struct ModemBootstrap {
    listeners: Arc<ListenerRegistry>,
    info_tx: watch::Sender<Option<ModemInfo>>,
}

impl ModemBootstrap {
    pub(crate) fn new(
        listeners: Arc<ListenerRegistry>,
        info_tx: watch::Sender<Option<ModemInfo>>,
    ) -> Self {
        Self { listeners, info_tx }
    }

    /// The outbound identification request (header-only frame)
    pub(crate) fn request() -> Message {
        MessageBuilder::new(Arc::new(modem_info_request_layout())).build()
    }

    fn parse(msg: &Message) -> plmlink_core::Result<ModemInfo> {
        Ok(ModemInfo::new(
            msg.get_address("address")?,
            msg.get_byte("category")?,
            msg.get_byte("subcategory")?,
            msg.get_byte("firmwareVersion")?,
        ))
    }
}

impl MsgListener for ModemBootstrap {
    fn on_message(&self, msg: &Message, source: &str) {
        if msg.is_pure_nack() || msg.command() != CMD_GET_MODEM_INFO {
            return;
        }

        match Self::parse(msg) {
            Ok(info) => {
                info!("Identified modem on {}: {}", source, info);
                let _ = self.info_tx.send(Some(info));
                self.listeners.remove(self);
            }
            Err(e) => {
                warn!("Could not parse modem info reply on {}: {}", source, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use plmlink_core::defs::modem_layouts;
    use plmlink_core::LayoutTable;
    use plmlink_types::Address;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_frame() {
        let request = ModemBootstrap::request();
        assert_eq!(request.raw().as_ref(), &[0x02, 0x60]);
    }

    #[test]
    fn test_bootstrap_identifies_and_removes_itself() {
        let registry = Arc::new(ListenerRegistry::new());
        let (tx, rx) = watch::channel(None);

        let bootstrap = Arc::new(ModemBootstrap::new(registry.clone(), tx));
        registry.add(bootstrap.clone());
        assert_eq!(registry.len(), 1);

        let layout = modem_layouts().layout_for(CMD_GET_MODEM_INFO).unwrap();
        let reply = Message::inbound(
            Bytes::from_static(&[0x02, 0x60, 0x23, 0x9B, 0x65, 0x03, 0x20, 0x9C, 0x06]),
            layout,
        )
        .unwrap();

        // Unrelated traffic before the reply leaves the bootstrap in place
        registry.dispatch(&Message::pure_nack(), "test");
        assert_eq!(registry.len(), 1);
        assert!(rx.borrow().is_none());

        registry.dispatch(&reply, "test");
        assert!(registry.is_empty());

        let info = rx.borrow().unwrap();
        assert_eq!(info.address, Address::from_bytes([0x23, 0x9B, 0x65]));
        assert_eq!(info.category, 0x03);
        assert_eq!(info.subcategory, 0x20);
        assert_eq!(info.firmware_version, 0x9C);
    }
}
