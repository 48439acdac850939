/**
 * Arcadia Console Client
 *
 * Connects to the realtime server, authenticates, and prints every pushed
 * event until ctrl-c triggers a clean logout.
 */

use std::sync::Arc;

use arcadia::client::{ChannelEvents, ChannelState, ClientConfig, ConnectionManager, WsConnector};
use arcadia::shared::protocol::ServerMessage;
use async_trait::async_trait;

struct ConsoleEvents;

#[async_trait]
impl ChannelEvents for ConsoleEvents {
    async fn on_event(&self, event: ServerMessage) {
        match &event {
            ServerMessage::Error { message } => {
                tracing::warn!("[Client] Server error: {}", message);
            }
            _ => {
                tracing::info!("[Client] {}: {:?}", event.kind(), event);
            }
        }
    }

    async fn on_open(&self) {
        tracing::info!("[Client] Channel open");
    }

    async fn on_reconnecting(&self, attempt: u32, max_attempts: u32, delay: std::time::Duration) {
        tracing::warn!(
            "[Client] Connection lost, retry {}/{} in {:?}",
            attempt,
            max_attempts,
            delay
        );
    }

    async fn on_closed(&self) {
        tracing::info!("[Client] Channel closed");
    }

    async fn on_gave_up(&self) {
        // Automatic recovery has stopped for good; only a restart helps.
        tracing::error!("[Client] Reconnection attempts exhausted. Restart the client to recover.");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let url =
        std::env::var("ARCADIA_URL").unwrap_or_else(|_| "ws://127.0.0.1:3000/ws".to_string());
    let credential = std::env::var("AUTH_TOKEN")
        .map_err(|_| "AUTH_TOKEN must be set to a bearer token for this user")?;

    let config = ClientConfig {
        url,
        credential,
        ..ClientConfig::default()
    };

    let (mut manager, handle) =
        ConnectionManager::new(config, Arc::new(WsConnector), Arc::new(ConsoleEvents));
    manager.subscribe_all();

    let run = tokio::spawn(manager.run());

    tokio::signal::ctrl_c().await?;
    tracing::info!("[Client] Logging out");
    handle.disconnect();

    run.await?;
    if handle.state() == ChannelState::GaveUp {
        std::process::exit(1);
    }

    Ok(())
}
