//! Connect to whatever access concentrator answers on an interface,
//! print the session parameters, then tear the session down.
//!
//! Needs raw-socket privileges:
//!
//! ```text
//! sudo cargo run --example connect -- eth0 [service-name]
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use rppoe_client::{
    ClientConfig, ConnectMode, HeapFramePool, Interface, PppoeClient, Result,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let iface_name = args.next().unwrap_or_else(|| "eth0".to_string());
    let service_name = args.next().unwrap_or_default();

    let iface = Interface::by_name(&iface_name)?;
    info!(%iface, "using interface");

    let config = ClientConfig::default();
    let sender = Arc::new(iface.open_sender()?);
    let pool = Arc::new(HeapFramePool::new(config.frame_capacity));

    let (client, mut session_rx) =
        PppoeClient::create(iface.mac_address, config, sender, pool);
    client.set_service_name(service_name.as_bytes())?;

    let injector = client.frame_injector();
    iface.spawn_receiver(move |frame| injector.inject(frame))?;

    info!("starting discovery");
    client
        .connect(ConnectMode::Timeout(Duration::from_secs(30)))
        .await?;

    if let Some((peer, session_id)) = client.session_info() {
        info!(%peer, session_id, "session established");
    }

    // Show any PPP traffic the concentrator sends us right away
    // (typically an LCP Configure-Request).
    match tokio::time::timeout(Duration::from_secs(5), session_rx.recv()).await {
        Ok(Some(payload)) => info!(len = payload.len(), "received PPP payload: {payload:02x?}"),
        _ => info!("no PPP traffic within 5s"),
    }

    client.terminate().await?;
    client.shutdown().await;
    info!("session terminated");
    Ok(())
}
