use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{AppState, JsonObject};
use crate::auth::AuthContext;
use crate::avatar::normalize_avatar;
use crate::db::AuthorProfile;
use crate::error::{Error, Result};
use crate::types::AuthorId;
use crate::validation::ValidationErrors;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors", post(register))
        .route("/authors/login", post(login))
        .route("/authors/logout", post(logout))
        .route("/authors/logoutAll", post(logout_all))
        .route("/authors/me", get(me).patch(update_me).delete(delete_me))
        .route("/authors/me/avatar", post(upload_avatar).delete(delete_avatar))
        .route("/authors/{id}/avatar", get(get_avatar))
}

/// Body returned by registration and login.
#[derive(Debug, Serialize)]
struct Session {
    author: AuthorProfile,
    token: String,
}

async fn register(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<Session>)> {
    let author = state.credentials.register(body).await?;
    let token = state.tokens.issue_token(&author.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(Session {
            author: author.profile(),
            token,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    JsonObject(body): JsonObject,
) -> Result<Json<Session>> {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    let author = state.credentials.find_by_credentials(email, password).await?;
    let token = state.tokens.issue_token(&author.id).await?;
    info!("Author {} logged in", author.id);

    Ok(Json(Session {
        author: author.profile(),
        token,
    }))
}

async fn logout(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode> {
    state
        .tokens
        .revoke_token(auth.author_id(), auth.token())
        .await?;
    Ok(StatusCode::OK)
}

async fn logout_all(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode> {
    state.tokens.revoke_all(auth.author_id()).await?;
    info!("Author {} logged out of every session", auth.author_id());
    Ok(StatusCode::OK)
}

async fn me(auth: AuthContext) -> Json<AuthorProfile> {
    Json(auth.author().profile())
}

async fn update_me(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonObject(patch): JsonObject,
) -> Result<Json<AuthorProfile>> {
    let updated = state.credentials.update_profile(auth.author(), patch).await?;
    Ok(Json(updated.profile()))
}

async fn delete_me(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<AuthorProfile>> {
    let deleted = state.credentials.delete_author(auth.author_id()).await?;
    Ok(Json(deleted.profile()))
}

async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<StatusCode> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("avatar") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(upload_error)?;
        debug!(
            "Avatar upload '{}' ({} bytes) for author {}",
            file_name,
            bytes.len(),
            auth.author_id()
        );

        let png = normalize_avatar(&file_name, &bytes)?;
        state.credentials.set_avatar(auth.author_id(), Some(png)).await?;
        info!("Author {} uploaded an avatar", auth.author_id());
        return Ok(StatusCode::OK);
    }

    Err(ValidationErrors::single("avatar", "Please upload an image.").into())
}

fn upload_error(err: axum::extract::multipart::MultipartError) -> Error {
    debug!("Rejected multipart upload: {}", err.body_text());
    let message = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "File too large."
    } else {
        "Please upload an image."
    };
    ValidationErrors::single("avatar", message).into()
}

async fn delete_avatar(State(state): State<AppState>, auth: AuthContext) -> Result<StatusCode> {
    state.credentials.set_avatar(auth.author_id(), None).await?;
    info!("Author {} removed their avatar", auth.author_id());
    Ok(StatusCode::OK)
}

async fn get_avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let png = state
        .credentials
        .avatar(&AuthorId::new(id))
        .await?
        .ok_or(Error::NotFound)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
