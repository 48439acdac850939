//! Application State
//!
//! The services of the realtime subsystem, constructed once at process
//! start and injected into connection handlers. Nothing here is a process
//! global; every service can be built standalone in tests.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::SessionAuthenticator;
use crate::backend::friends::FriendshipNotifier;
use crate::backend::presence::{ConnectionRegistry, PresenceCoordinator};
use crate::backend::store::SocialStore;

/// Application state shared by every connection handler.
#[derive(Clone)]
pub struct AppState {
    /// Single source of truth for which users are online.
    pub registry: Arc<ConnectionRegistry>,
    /// Resolves bearer credentials to user identities.
    pub authenticator: Arc<SessionAuthenticator>,
    /// Durable status writes and presence fan-out.
    pub coordinator: Arc<PresenceCoordinator>,
    /// The friend-request protocol.
    pub notifier: Arc<FriendshipNotifier>,
    /// Durable store behind the services, exposed for handlers that read
    /// profiles directly.
    pub store: Arc<dyn SocialStore>,
}

impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.registry.clone()
    }
}

impl FromRef<AppState> for Arc<SessionAuthenticator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.authenticator.clone()
    }
}

impl FromRef<AppState> for Arc<PresenceCoordinator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.coordinator.clone()
    }
}

impl FromRef<AppState> for Arc<FriendshipNotifier> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifier.clone()
    }
}
