//! Bus monitor: print every message seen on the powerline

use std::sync::Arc;

use plmlink::{Message, MsgListener, Port, SerialTransport};
use plmlink_core::defs::modem_layouts;

struct Printer;

impl MsgListener for Printer {
    fn on_message(&self, msg: &Message, source: &str) {
        println!("{}: {}", source, msg);
    }
}

#[tokio::main]
async fn main() -> plmlink::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let path = std::env::var("MODEM_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    println!("Opening modem on {}...", path);

    let transport = SerialTransport::new(path);
    let mut port = Port::new(Box::new(transport), Arc::new(modem_layouts()));

    port.add_listener(Arc::new(Printer));
    port.start().await?;

    let mut updates = port.modem_info_updates();
    if let Ok(info) = updates.wait_for(|i| i.is_some()).await {
        println!("✓ {}", info.unwrap());
    }

    // Monitor for a minute
    tokio::time::sleep(std::time::Duration::from_secs(60)).await;

    port.stop().await?;
    println!("✓ Stopped");
    Ok(())
}
