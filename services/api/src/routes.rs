//! API service routes

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use medialibrary::MediaRecord;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    models::{
        AddMediaRequest, ConversionsRequest, MediaListResponse, MediaQuery, MediaResponse,
        MediaSource, ModelMediaQuery, ResponsiveImagesRequest, TransferRequest,
    },
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/media", post(add_media))
        .route("/media/:id", get(get_media).delete(delete_media))
        .route("/media/:id/conversions", post(perform_conversions))
        .route("/media/:id/responsive-images", post(generate_responsive_images))
        .route("/media/:id/copy", post(copy_media))
        .route("/media/:id/move", post(move_media))
        .route("/models/:model_type/:model_id/media", get(get_model_media))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "media-api"
    }))
}

/// Ingest a new original from a URL or another disk
pub async fn add_media(
    State(state): State<AppState>,
    Json(payload): Json<AddMediaRequest>,
) -> ApiResult<impl IntoResponse> {
    let library = &state.library;
    let collection = payload.collection.unwrap_or_default();

    let media = match payload.source {
        MediaSource::Url { url } => {
            library
                .add_media_from_url(&url, &collection, payload.options)
                .await?
        }
        MediaSource::Disk { disk, path } => {
            let target = payload
                .options
                .disk
                .clone()
                .unwrap_or_else(|| library.options().default_disk.clone());
            library
                .add_media_from_disk_to_disk(&disk, &path, &target, &collection, payload.options)
                .await?
        }
    };

    info!("Added media {:?}", media.id);
    Ok((StatusCode::CREATED, Json(MediaResponse::new(library, media))))
}

/// Get a media record with its URLs
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<impl IntoResponse> {
    let media = find_media(&state, id).await?;

    let temporary_url = match query.temporary {
        Some(0) => {
            return Err(ApiError::BadRequest(
                "temporary must be a positive number of seconds".to_string(),
            ));
        }
        Some(seconds) => Some(
            state
                .library
                .temporary_url_for_media(&media, Duration::from_secs(seconds))
                .await?,
        ),
        None => None,
    };

    let mut response = MediaResponse::new(&state.library, media);
    response.temporary_url = temporary_url;
    Ok(Json(response))
}

/// Delete a media record and its files
pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let media = find_media(&state, id).await?;
    state.library.delete_media(&media).await?;

    info!("Deleted media {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Generate conversions for a media record
pub async fn perform_conversions(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<ConversionsRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut media = find_media(&state, id).await?;
    state
        .library
        .perform_conversions(&mut media, &payload.conversions)
        .await?;

    Ok(Json(MediaResponse::new(&state.library, media)))
}

/// Generate responsive widths for a media record
pub async fn generate_responsive_images(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<ResponsiveImagesRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut media = find_media(&state, id).await?;
    state
        .library
        .generate_responsive_images(&mut media, &payload.recipes)
        .await?;

    Ok(Json(MediaResponse::new(&state.library, media)))
}

/// Copy a media record to another disk
pub async fn copy_media(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<TransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let media = find_media(&state, id).await?;
    let copy = state
        .library
        .copy_media_to_disk(&media, &payload.disk)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MediaResponse::new(&state.library, copy)),
    ))
}

/// Move a media record to another disk
pub async fn move_media(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<TransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let media = find_media(&state, id).await?;
    let moved = state
        .library
        .move_media_to_disk(&media, &payload.disk)
        .await?;

    Ok(Json(MediaResponse::new(&state.library, moved)))
}

/// List the media attached to a model
pub async fn get_model_media(
    State(state): State<AppState>,
    Path((model_type, model_id)): Path<(String, u64)>,
    Query(query): Query<ModelMediaQuery>,
) -> ApiResult<impl IntoResponse> {
    let records = match query.collection {
        Some(collection) => {
            state
                .library
                .media_for_model_and_collection(&model_type, model_id, &collection)
                .await?
        }
        None => state.library.media_for_model(&model_type, model_id).await?,
    };

    let items: Vec<MediaResponse> = records
        .into_iter()
        .map(|media| MediaResponse::new(&state.library, media))
        .collect();

    Ok(Json(MediaListResponse {
        total: items.len(),
        items,
    }))
}

async fn find_media(state: &AppState, id: u64) -> ApiResult<MediaRecord> {
    state
        .library
        .find_media(id)
        .await?
        .ok_or(ApiError::NotFound(id))
}
