use axum::{
    extract::{Multipart, State},
    response::Response,
    Json,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{
    analysis::{analyze_voice, transcribe, VoiceAnalysis},
    download,
    upload::{check_filename, ext_from_name, generate_filename, read_form, UploadedFile, MIB},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    extract::AppPath,
    response::{ApiResponse, MessageResponse},
    state::AppState,
};

pub const MAX_AUDIO_BYTES: usize = 25 * MIB;
const FOLDER: &str = "audio";
const AUDIO_EXTENSIONS: [&str; 5] = ["wav", "mp3", "ogg", "flac", "m4a"];

pub fn object_key(filename: &str) -> String {
    format!("{FOLDER}/{filename}")
}

/// Audio MIME type, or a known audio extension on the client's file name.
pub fn is_audio(file: &UploadedFile) -> bool {
    let by_mime = file
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("audio/"));
    let by_ext = file
        .original_name
        .as_deref()
        .and_then(ext_from_name)
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()));
    by_mime || by_ext
}

#[derive(Debug, Serialize)]
pub struct VoiceUpload {
    pub filename: String,
    pub original_name: Option<String>,
    pub url: String,
    pub size: usize,
    pub content_type: String,
    pub transcription: String,
    pub analysis: VoiceAnalysis,
}

#[instrument(skip(state, user, mp), fields(user_id = %user.id))]
pub async fn upload_voice(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mp: Multipart,
) -> ApiResult<Json<ApiResponse<VoiceUpload>>> {
    let form = read_form(mp, "audio", "text").await?;
    let file = form
        .file
        .ok_or_else(|| ApiError::bad_request("No audio file provided"))?;

    if !is_audio(&file) {
        warn!(content_type = ?file.content_type, "non-audio upload rejected");
        return Err(ApiError::bad_request("Only audio files are allowed"));
    }
    if file.size() > MAX_AUDIO_BYTES {
        return Err(ApiError::bad_request("Audio exceeds the 25 MB limit"));
    }

    let filename = generate_filename("voice", &file);
    let size = file.size();
    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    state
        .storage
        .put_object(&object_key(&filename), file.body, &content_type)
        .await?;

    let transcription = transcribe(form.text.as_deref());
    let analysis = analyze_voice(&transcription);
    info!(%filename, size, foods = analysis.extracted_meals.len(), "voice recording processed");

    let data = VoiceUpload {
        url: format!("/api/voice/{filename}"),
        original_name: file.original_name,
        size,
        content_type,
        transcription,
        analysis,
        filename,
    };
    Ok(Json(ApiResponse::with_message(
        data,
        "Voice recording processed successfully",
    )))
}

#[instrument(skip(state, _user))]
pub async fn get_voice(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(filename): AppPath<String>,
) -> ApiResult<Response> {
    check_filename(&filename)?;
    download(state.storage.as_ref(), &object_key(&filename), "Audio file not found").await
}

#[instrument(skip(state, _user))]
pub async fn delete_voice(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(filename): AppPath<String>,
) -> ApiResult<Json<MessageResponse>> {
    check_filename(&filename)?;
    let key = object_key(&filename);
    if !state.storage.head_object(&key).await? {
        return Err(ApiError::not_found("Audio file not found"));
    }
    state.storage.delete_object(&key).await?;
    info!(%filename, "voice recording deleted");
    Ok(Json(MessageResponse::new(
        "Voice recording deleted successfully",
    )))
}
