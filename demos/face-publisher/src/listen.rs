//! Blendcast listener
//!
//! Prints every record that arrives on the bound UDP address.
//!
//! ```text
//! face-listen [ADDR]
//! ```

use std::net::SocketAddr;

use blendcast_runtime::{init_logging, LogFormat};
use blendcast_transport::{start_receive_loop, UdpTransport};
use blendcast_wire::{Record, RecordDecoder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogFormat::from_env());

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9300".to_string())
        .parse()?;
    let transport = UdpTransport::bind(addr).await?;
    tracing::info!("listening on {}", transport.local_addr());

    let mut rx = start_receive_loop(transport.socket(), 64);
    while let Some((envelope, from)) = rx.recv().await {
        let record = Record::from_text(envelope.body);
        match RecordDecoder::decode(&record) {
            Ok(decoded) => println!(
                "{} #{} {} yaw={:.2} pitch={:.2} roll={:.2}",
                from, envelope.sequence, envelope.channel, decoded.orientation.yaw, decoded.orientation.pitch,
                decoded.orientation.roll
            ),
            Err(e) => tracing::warn!("bad record from {}: {}", from, e),
        }
    }
    Ok(())
}
