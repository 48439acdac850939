//! Server Initialization
//!
//! Builds the service graph and the Axum router. Construction order
//! matters only in that every service shares the same registry and store
//! instances; the registry itself never touches the store.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::backend::auth::SessionAuthenticator;
use crate::backend::friends::FriendshipNotifier;
use crate::backend::presence::{ConnectionRegistry, PresenceCoordinator};
use crate::backend::server::config::{load_store, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::ws::ws_handler;

/// Create and configure the Axum application.
pub async fn create_app(config: &ServerConfig) -> Router {
    tracing::info!("Initializing arcadia realtime server");

    let store = load_store().await;

    let registry = Arc::new(ConnectionRegistry::new());
    let authenticator = Arc::new(SessionAuthenticator::new(
        config.jwt_secret.clone(),
        store.clone(),
    ));
    let coordinator = Arc::new(PresenceCoordinator::new(store.clone(), registry.clone()));
    let notifier = Arc::new(FriendshipNotifier::new(store.clone(), registry.clone()));

    let app_state = AppState {
        registry,
        authenticator,
        coordinator,
        notifier,
        store,
    };

    tracing::info!("Services initialized, configuring router");

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}
