mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

use common::{app, delete, multipart, register, upload};

#[tokio::test]
async fn image_upload_download_and_delete() {
    let app = app();
    let (_, token) = register(&app, "img@example.com", "patient").await;

    let form = multipart(
        "image",
        "lunch.png",
        "image/png",
        b"\x89PNG fake",
        &[("food_name", "Paneer Tikka")],
    );
    let (status, body) = upload(&app, "/api/images/upload", &token, form).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    let filename = data["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("food-") && filename.ends_with(".png"));
    assert_eq!(data["url"], format!("/api/images/{filename}"));
    assert_eq!(data["size"], 9);
    assert_eq!(data["analysis"]["identified_foods"][0]["name"], "Paneer Tikka");
    assert_eq!(data["analysis"]["nutrition"]["calories"], 320.0);

    let req = Request::get(format!("/api/images/{filename}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG fake");

    let uri = format!("/api/images/{filename}");
    let (status, _) = delete(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = delete(&app, &uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Image not found");
}

#[tokio::test]
async fn image_upload_rejects_other_files() {
    let app = app();
    let (_, token) = register(&app, "img2@example.com", "patient").await;

    let form = multipart("image", "notes.txt", "text/plain", b"hello", &[]);
    let (status, _) = upload(&app, "/api/images/upload", &token, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let form = multipart("photo", "lunch.png", "image/png", b"png", &[]);
    let (status, body) = upload(&app, "/api/images/upload", &token, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn voice_upload_transcribes_and_analyzes() {
    let app = app();
    let (_, token) = register(&app, "voice@example.com", "patient").await;

    let form = multipart(
        "audio",
        "memo.wav",
        "audio/wav",
        b"RIFF....WAVE",
        &[("text", "For breakfast I had two eggs and toast with milk")],
    );
    let (status, body) = upload(&app, "/api/voice/upload", &token, form).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(
        data["transcription"],
        "For breakfast I had two eggs and toast with milk"
    );
    assert_eq!(data["analysis"]["meal_type"], "breakfast");
    let names: Vec<_> = data["analysis"]["extracted_meals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Milk", "Egg"]);
    assert_eq!(data["analysis"]["extracted_meals"][1]["quantity"], 2.0);
    assert_eq!(data["analysis"]["confidence"], 0.8);

    let filename = data["filename"].as_str().unwrap();
    assert!(filename.starts_with("voice-") && filename.ends_with(".wav"));

    let req = Request::get(format!("/api/voice/{filename}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/wav");
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"RIFF....WAVE");

    let (status, _) = delete(&app, &format!("/api/voice/{filename}"), &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn voice_upload_requires_audio() {
    let app = app();
    let (_, token) = register(&app, "voice2@example.com", "patient").await;
    let form = multipart("audio", "photo.jpg", "image/jpeg", b"jpg", &[]);
    let (status, body) = upload(&app, "/api/voice/upload", &token, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only audio files are allowed");
}

#[tokio::test]
async fn media_needs_auth_and_safe_names() {
    let app = app();
    let (_, token) = register(&app, "m@example.com", "patient").await;

    let form = multipart("image", "a.png", "image/png", b"png", &[]);
    let (content_type, bytes) = form;
    let req = Request::post("/api/images/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let (status, _) = delete(&app, "/api/voice/..secret", &token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = delete(&app, "/api/voice/voice-1-2.wav", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Audio file not found");
}
