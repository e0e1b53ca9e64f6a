//! Image and voice uploads kept in object storage and answered with mock analysis.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::debug;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    storage::StorageClient,
};

pub mod analysis;
pub mod images;
pub mod upload;
pub mod voice;

use upload::MIB;

/// Presigned download links stay valid this long.
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

/// 302 to a presigned URL when the storage hands them out, otherwise the
/// stored bytes with their content type.
pub async fn download(
    storage: &dyn StorageClient,
    key: &str,
    not_found: &'static str,
) -> ApiResult<Response> {
    if !storage.head_object(key).await? {
        return Err(ApiError::not_found(not_found));
    }
    if let Some(url) = storage.presign_get(key, PRESIGN_TTL_SECS).await? {
        return Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response());
    }
    let (body, content_type) = storage
        .get_object(key)
        .await?
        .ok_or_else(|| ApiError::not_found(not_found))?;
    debug!(%key, size = body.len(), "serving media from storage");
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/images/upload",
            post(images::upload_image).layer(DefaultBodyLimit::max(images::MAX_IMAGE_BYTES + MIB)),
        )
        .route(
            "/images/:filename",
            get(images::get_image).delete(images::delete_image),
        )
        .route(
            "/voice/upload",
            post(voice::upload_voice).layer(DefaultBodyLimit::max(voice::MAX_AUDIO_BYTES + MIB)),
        )
        .route(
            "/voice/:filename",
            get(voice::get_voice).delete(voice::delete_voice),
        )
}
