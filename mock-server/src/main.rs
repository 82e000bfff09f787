use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let delay_ms: u64 = match std::env::var("MOCK_DELAY_MS") {
        Ok(raw) => raw.parse().with_context(|| format!("MOCK_DELAY_MS={raw:?}"))?,
        Err(_) => 0,
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, delay_ms, "mock price service listening");
    mock_server::run(listener, Duration::from_millis(delay_ms)).await?;
    Ok(())
}
