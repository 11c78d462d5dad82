//! Send a single standard command to a device via a network hub

use std::sync::Arc;
use std::time::Duration;

use plmlink::{Address, MessageBuilder, Port, TcpTransport};
use plmlink_core::defs::{modem_layouts, CMD_SEND_STD_MSG};
use plmlink_core::LayoutTable;

#[tokio::main]
async fn main() -> plmlink::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let host = std::env::var("HUB_HOST").unwrap_or_else(|_| "192.168.1.50".to_string());
    let device: Address = std::env::var("DEVICE_ADDR")
        .unwrap_or_else(|_| "23.9B.65".to_string())
        .parse()?;

    println!("Connecting to hub at {}...", host);

    let table = Arc::new(modem_layouts());
    let transport = TcpTransport::new(host, plmlink_core::DEFAULT_HUB_PORT);
    let mut port = Port::new(Box::new(transport), table.clone());

    port.start().await?;
    println!("✓ Connected");

    // Light on, full brightness
    let layout = table.layout_for(CMD_SEND_STD_MSG).expect("builtin layout");
    let msg = MessageBuilder::new(layout)
        .set_address("toAddress", device)?
        .set_byte("messageFlags", 0x0F)?
        .set_byte("command1", 0x11)?
        .set_byte("command2", 0xFF)?
        .quiet_time(Duration::from_millis(250))
        .build();

    port.write_message(msg)?;
    println!("✓ Queued ON command for {}", device);

    // Give the flow-control cycle time to complete before tearing down
    tokio::time::sleep(Duration::from_secs(2)).await;

    port.stop().await?;
    println!("✓ Disconnected");
    Ok(())
}
