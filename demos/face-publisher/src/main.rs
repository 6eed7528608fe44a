//! Blendcast face publisher
//!
//! Runs one session against a synthetic performer, publishes records to
//! the given UDP subscribers and writes artifacts under the configured
//! storage root.
//!
//! ```text
//! face-publisher [CONFIG.json] [--bind ADDR] [--subscriber ADDR]... [--seconds N]
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use blendcast_runtime::{init_logging, LogFormat, OverlayStage, PipelineConfig, Session};
use blendcast_store::FsBlobStore;
use blendcast_test::SyntheticSource;
use blendcast_transport::UdpTransport;
use blendcast_visual::{AnyEstimator, NoFaceDetector};

struct Args {
    config: Option<String>,
    bind: SocketAddr,
    subscribers: Vec<SocketAddr>,
    seconds: u64,
}

fn parse_args() -> Result<Args, Box<dyn std::error::Error>> {
    let mut args = Args {
        config: None,
        bind: "0.0.0.0:0".parse()?,
        subscribers: Vec::new(),
        seconds: 10,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--bind" => args.bind = iter.next().ok_or("--bind needs an address")?.parse()?,
            "--subscriber" => args
                .subscribers
                .push(iter.next().ok_or("--subscriber needs an address")?.parse()?),
            "--seconds" => args.seconds = iter.next().ok_or("--seconds needs a value")?.parse()?,
            _ if arg.starts_with("--") => return Err(format!("unknown option {}", arg).into()),
            _ => args.config = Some(arg),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LogFormat::from_env());
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let transport = UdpTransport::bind(args.bind).await?;
    let channel = config.channel_id();
    for addr in &args.subscribers {
        transport.subscribe(&channel, *addr);
    }
    tracing::info!(
        "publishing {} from {} to {} subscriber(s)",
        channel,
        transport.local_addr(),
        args.subscribers.len()
    );

    let store = FsBlobStore::new(&config.storage_root, &config.session_dir);
    let estimator = AnyEstimator::for_strategy(config.orientation_strategy, NoFaceDetector);
    let session = Session::start(
        config,
        SyntheticSource::with_seed(0x5eed),
        transport,
        store,
        estimator,
        OverlayStage::null(),
    )
    .await?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    let stats = session.stop().await?;
    println!("{:#?}", stats);
    Ok(())
}
