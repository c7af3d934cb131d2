//! HTTP routes over the clean-data query functions.

use crate::config::Api;
use crate::db::{self, Pool};
use crate::error::ApiError;
use crate::model::{CleanData, NewCleanData, Pagination};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

/// Shared handler state: the database pool and pagination limits.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub api: Api,
}

impl AppState {
    pub fn new(pool: Pool, api: Api) -> Self {
        Self { pool, api }
    }
}

/// Build the API router. Collection routes answer with and without the trailing slash.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route(
            "/clean_data/",
            get(read_clean_data_list).post(create_clean_data),
        )
        .route(
            "/clean_data",
            get(read_clean_data_list).post(create_clean_data),
        )
        .route("/clean_data/:clean_data_id", get(read_clean_data))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn read_root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the CleanData API!" }))
}

#[instrument(skip_all)]
pub async fn create_clean_data(
    State(state): State<AppState>,
    Json(new): Json<NewCleanData>,
) -> Result<(StatusCode, Json<CleanData>), ApiError> {
    new.validate().map_err(ApiError::BadRequest)?;
    let created = db::create_clean_data(&state.pool, &new).await?;
    info!(id = created.id, channel = %created.channel_username, "created clean data");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn read_clean_data(
    State(state): State<AppState>,
    Path(clean_data_id): Path<i64>,
) -> Result<Json<CleanData>, ApiError> {
    db::get_clean_data(&state.pool, clean_data_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("CleanData"))
}

pub async fn read_clean_data_list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<CleanData>>, ApiError> {
    let (skip, limit) = page.resolve(state.api.default_limit, state.api.max_limit);
    let rows = db::list_clean_data(&state.pool, skip, limit).await?;
    Ok(Json(rows))
}
