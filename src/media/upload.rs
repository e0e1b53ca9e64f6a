use axum::extract::{multipart::MultipartError, Multipart};
use bytes::Bytes;
use rand::Rng;
use time::OffsetDateTime;
use tracing::warn;

use crate::error::{ApiError, ApiResult};

pub const MIB: usize = 1024 * 1024;

/// A file field read from a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub original_name: Option<String>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// The file field plus an optional text field of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub text: Option<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    warn!(error = %e, "multipart read failed");
    ApiError::bad_request(format!("Upload failed: {}", e.body_text()))
}

/// Reads `file_field` and `text_field` from the form; other fields are skipped.
pub async fn read_form(
    mut mp: Multipart,
    file_field: &str,
    text_field: &str,
) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(name) if name == file_field => {
                let content_type = field.content_type().map(str::to_string);
                let original_name = field.file_name().map(str::to_string);
                let body = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    body,
                    content_type,
                    original_name,
                });
            }
            Some(name) if name == text_field => {
                let text = field.text().await.map_err(multipart_error)?;
                form.text = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }
    Ok(form)
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => Some("m4a"),
        _ => None,
    }
}

/// Lowercased extension of a client-supplied file name, if it is short and alphanumeric.
pub fn ext_from_name(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ok = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then(|| ext.to_ascii_lowercase())
}

/// Stored name `<prefix>-<millis>-<random>.<ext>`.
pub fn generate_filename(prefix: &str, file: &UploadedFile) -> String {
    let ext = file
        .original_name
        .as_deref()
        .and_then(ext_from_name)
        .or_else(|| {
            file.content_type
                .as_deref()
                .and_then(ext_from_mime)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "bin".to_string());
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{prefix}-{millis}-{suffix}.{ext}")
}

/// Rejects names that could address objects outside their folder.
pub fn check_filename(name: &str) -> ApiResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        warn!(filename = %name, "rejected media filename");
        return Err(ApiError::bad_request("Invalid filename"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: Option<&str>, ct: Option<&str>) -> UploadedFile {
        UploadedFile {
            body: Bytes::from_static(b"x"),
            content_type: ct.map(str::to_string),
            original_name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn filename_prefers_original_extension() {
        let name = generate_filename("food", &file(Some("Lunch.JPEG"), Some("image/png")));
        assert!(name.starts_with("food-"));
        assert!(name.ends_with(".jpeg"));
        assert_eq!(name.split('-').count(), 3);

        let name = generate_filename("voice", &file(None, Some("audio/ogg")));
        assert!(name.ends_with(".ogg"));

        let name = generate_filename("voice", &file(Some("noext"), None));
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn unsafe_filenames_are_rejected() {
        assert!(check_filename("food-1-2.jpg").is_ok());
        assert!(check_filename("../secret").is_err());
        assert!(check_filename("a/b.jpg").is_err());
        assert!(check_filename("a\\b.jpg").is_err());
        assert!(check_filename("").is_err());
    }
}
