use replikv::server::RedisServer;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server = RedisServer::new(std::env::args())?;

    tokio::select! {
        result = server.run() => result?,
        _ = signal::ctrl_c() => info!("shutdown signal received, stopping server"),
    }

    info!("server shutdown complete");

    Ok(())
}
