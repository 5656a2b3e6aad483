//! Handlers shared by every ownership-scoped resource.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};

use crate::api::{AppState, JsonObject};
use crate::auth::AuthContext;
use crate::error::Result;
use crate::resources::{ListParams, ListQuery, OwnedResource};
use crate::types::DocumentId;

/// Create, list, fetch, patch and delete routes for `R`.
pub fn router<R: OwnedResource>() -> Router<AppState> {
    Router::new()
        .route(R::COLLECTION_PATH, post(create::<R>).get(list::<R>))
        .route(
            R::ITEM_PATH,
            get(fetch::<R>).patch(update::<R>).delete(remove::<R>),
        )
}

async fn create<R: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    JsonObject(body): JsonObject,
) -> Result<(StatusCode, Json<R::Record>)> {
    let record = state.repository::<R>().create(auth.author_id(), body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list<R: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<R::Record>>> {
    let query = ListQuery::parse::<R>(&params)?;
    let records = state.repository::<R>().list(auth.author_id(), &query).await?;
    Ok(Json(records))
}

async fn fetch<R: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<R::Record>> {
    let record = state
        .repository::<R>()
        .get(auth.author_id(), &DocumentId::new(id))
        .await?;
    Ok(Json(record))
}

async fn update<R: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
    JsonObject(patch): JsonObject,
) -> Result<Json<R::Record>> {
    let record = state
        .repository::<R>()
        .update(auth.author_id(), &DocumentId::new(id), patch)
        .await?;
    Ok(Json(record))
}

async fn remove<R: OwnedResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<R::Record>> {
    let record = state
        .repository::<R>()
        .delete(auth.author_id(), &DocumentId::new(id))
        .await?;
    Ok(Json(record))
}
