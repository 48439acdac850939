//! Server Configuration
//!
//! Configuration is loaded from environment variables with development
//! defaults. A missing or unreachable database does not prevent startup:
//! the server falls back to the in-memory store and runs with degraded
//! persistence.

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::store::{MemoryStore, PgStore, SocialStore};

/// Server settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub jwt_secret: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .unwrap_or(3000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|err| {
            tracing::warn!("Missing JWT_SECRET ({}), using development default", err);
            "your-secret-key-change-in-production".to_string()
        });

        Self { port, jwt_secret }
    }
}

/// Connect the durable store.
///
/// Reads `DATABASE_URL`, builds the Postgres pool, and runs migrations.
/// Any failure falls back to the in-memory store so the realtime channel
/// stays available.
pub async fn load_store() -> Arc<dyn SocialStore> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set. Falling back to the in-memory store.");
            return Arc::new(MemoryStore::new());
        }
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to the in-memory store.");
            return Arc::new(MemoryStore::new());
        }
    };

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {:?}", e);
            // Continue anyway - migrations might have already been run
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Arc::new(PgStore::new(pool))
}
