//! mailpoll - mailbox polling backend
//!
//! Serves `POST /poll-emails` and `POST /get-gmail-token`.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    let service = config.poll_service()?;
    let app = routes::router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!(
        "mailpoll listening on {}, token service at {}",
        listener.local_addr()?,
        config.token_service().endpoint()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
