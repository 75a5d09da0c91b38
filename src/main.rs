use galena_network::{run_server, NetworkSettings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let settings = NetworkSettings::default();

    info!(
        "starting server for Minecraft {} (protocol {})",
        galena_protocol::MINECRAFT_VERSION,
        galena_protocol::PROTOCOL_VERSION,
    );

    tokio::select! {
        () = run_server(settings) => {}
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("shutting down");
        }
    }

    Ok(())
}
