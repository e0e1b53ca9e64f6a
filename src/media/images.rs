use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{
    analysis::{analyze_image, ImageAnalysis},
    download,
    upload::{check_filename, generate_filename, read_form, MIB},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::AppPath,
    response::{ApiResponse, MessageResponse},
    state::AppState,
};

pub const MAX_IMAGE_BYTES: usize = 10 * MIB;
const FOLDER: &str = "images";

pub fn object_key(filename: &str) -> String {
    format!("{FOLDER}/{filename}")
}

#[derive(Debug, Serialize)]
pub struct ImageUpload {
    pub filename: String,
    pub original_name: Option<String>,
    pub url: String,
    pub size: usize,
    pub content_type: String,
    pub analysis: ImageAnalysis,
}

#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<Json<ApiResponse<ImageUpload>>> {
    let form = read_form(mp, "image", "food_name").await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No image file provided"))?;

    let content_type = file.content_type.clone().unwrap_or_default();
    if !content_type.starts_with("image/") {
        warn!(%content_type, "non-image upload rejected");
        return Err(ApiError::bad_request("Only image files are allowed"));
    }
    if file.size() > MAX_IMAGE_BYTES {
        return Err(ApiError::bad_request("Image exceeds the 10 MB limit"));
    }

    let filename = generate_filename("food", &file);
    let size = file.size();
    state
        .storage
        .put_object(&object_key(&filename), file.body, &content_type)
        .await?;

    info!(%filename, size, "image stored");
    let data = ImageUpload {
        url: format!("/api/images/{filename}"),
        original_name: file.original_name,
        size,
        content_type,
        analysis: analyze_image(form.text.as_deref()),
        filename,
    };
    Ok(Json(ApiResponse::with_message(
        data,
        "Image uploaded successfully",
    )))
}

/// Presigned redirect or the stored bytes, see [`download`].
#[instrument(skip(state, _user))]
pub async fn get_image(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(filename): AppPath<String>,
) -> ApiResult<Response> {
    check_filename(&filename)?;
    download(state.storage.as_ref(), &object_key(&filename), "Image not found").await
}

#[instrument(skip(state, _user))]
pub async fn delete_image(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(filename): AppPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    check_filename(&filename)?;
    let key = object_key(&filename);
    if !state.storage.head_object(&key).await? {
        return Err(ApiError::not_found("Image not found"));
    }
    state.storage.delete_object(&key).await?;
    info!(%filename, "image deleted");
    Ok(Json(MessageResponse::new("Image deleted successfully")))
}
