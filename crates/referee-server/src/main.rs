//! Binary WebSocket server for the bribed-referee game.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use referee_server::auth::HmacTokenValidator;
use referee_server::backend::MemoryBackend;
use referee_server::config::Config;
use referee_server::server::{self, ServerState};
use referee_server::session::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        "starting referee-server on {}:{} (max_clients = {})",
        config.bind_addr,
        config.port,
        config.max_clients
    );

    let validator = Arc::new(HmacTokenValidator::new(&config.token_secret));
    let state = ServerState {
        config,
        validator,
        sessions: Arc::new(SessionStore::new()),
        backend: Arc::new(MemoryBackend::new()),
    };

    server::run(state).await
}
