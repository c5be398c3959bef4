use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{self, Document, ID_FIELD},
    object_id::ObjectId,
    store::Filter,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/films", get(list_films).post(create_film))
        .route("/films/", get(list_films).post(create_film))
        .route("/films/{id}", get(get_film).put(update_film).delete(delete_film))
        .with_state(state)
}

pub async fn list_films(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Document>>> {
    let films = state.store.find_many(Filter::All).await?;
    Ok(Json(films))
}

pub async fn get_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let id: ObjectId = id.parse()?;

    match state.store.find_one(Filter::Id(id)).await? {
        Some(film) => Ok(Json(film).into_response()),
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn create_film(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Document>> {
    let doc = object_body(body)?;
    models::validate_new(&doc)?;

    let film = state.store.insert_one(doc).await?;
    debug!(id = ?film.get(ID_FIELD), "film created");
    Ok(Json(film))
}

pub async fn update_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let id: ObjectId = id.parse()?;
    let patch = models::prepare_patch(id, object_body(body)?)?;

    match state.store.find_one_and_update(Filter::Id(id), patch).await? {
        Some(film) => {
            debug!(%id, "film updated");
            Ok(Json(film).into_response())
        },
        None => Ok(StatusCode::NOT_FOUND.into_response()),
    }
}

pub async fn delete_film(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id: ObjectId = id.parse()?;

    let result = state.store.delete_one(Filter::Id(id)).await?;
    if result.deleted_count == 1 {
        debug!(%id, "film deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

fn object_body(body: Result<Json<Value>, JsonRejection>) -> AppResult<Document> {
    let Json(value) = body?;
    match value {
        Value::Object(doc) => Ok(doc),
        other => Err(AppError::Body(format!("request body must be a JSON object, got {other}"))),
    }
}
