// REST API for authors, posts and comments

use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, Request},
    response::Json,
    routing::get,
};
use serde_json::{Map, Value};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthGate, CredentialStore, TokenService};
use crate::avatar::MAX_AVATAR_BYTES;
use crate::config::AuthConfig;
use crate::db::Db;
use crate::error::{Error, Result};
use crate::resources::{Comment, OwnedRepository, OwnedResource, Post};
use crate::validation::ValidationErrors;

mod authors;
mod resources;

/// Shared handles every handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenService>,
    pub gate: Arc<AuthGate>,
}

impl AppState {
    /// Wire the credential store, token service and gate around `db`.
    ///
    /// `config` is read once here; the signing secret cannot change afterwards.
    pub fn new(db: Db, config: &AuthConfig) -> Result<Self> {
        let credentials = Arc::new(CredentialStore::new(db.clone(), config)?);
        let tokens = Arc::new(TokenService::new(config, credentials.clone()));
        let gate = Arc::new(AuthGate::new(tokens.clone(), credentials.clone()));

        Ok(Self {
            db,
            credentials,
            tokens,
            gate,
        })
    }

    pub fn repository<R: OwnedResource>(&self) -> OwnedRepository<R> {
        OwnedRepository::new(self.db.clone())
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(authors::router())
        .merge(resources::router::<Post>())
        .merge(resources::router::<Comment>())
        // leave room for multipart framing around a maximum-size avatar
        .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES * 2))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// A JSON request body that must be an object.
///
/// Anything else (malformed JSON, arrays, scalars) is a validation error, so
/// clients always get the same 400 shape.
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            ValidationErrors::single("body", "must be a JSON object")
                .with_message("Invalid request body")
        })?;

        match value {
            Value::Object(map) => Ok(JsonObject(map)),
            _ => Err(ValidationErrors::single("body", "must be a JSON object")
                .with_message("Invalid request body")
                .into()),
        }
    }
}
