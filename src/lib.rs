// Core modules
pub mod api;
pub mod auth;
pub mod avatar;
pub mod config;
pub mod db;
pub mod error;
pub mod resources;
pub mod types;
pub mod validation;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthContext, AuthGate, CredentialStore, TokenService};
pub use config::{AppConfig, AuthConfig, ServerConfig, load_config};
pub use db::{AuthorProfile, DatabaseConfig, Db, create_connection, ensure_schema};
pub use error::{Error, Result};
pub use resources::{Comment, OwnedRepository, OwnedResource, Post};
pub use types::{AuthorId, DocumentId, TokenFingerprint};

/// Connect to the configured database, ensure the schema and build the
/// application state.
pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let db = create_connection(config.database.clone()).await?;
    ensure_schema(&db).await?;

    Ok(AppState::new(db, &config.auth)?)
}
