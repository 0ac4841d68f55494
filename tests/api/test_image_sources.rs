// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! `imgUrl` resolution against a local HTTP server
//!
//! Covers the content-type allow list, non-2xx statuses and the full
//! request path from URL to recognized text.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use captcha_solver::{
    api::{create_router, AppState},
    config::SolverConfig,
    vision::{ImageFetcher, ImageSource, SourceError, VisionModelManager},
    Recognition, TextRecognizer,
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use serde_json::Value;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt; // for `oneshot`

struct MockRecognizer;

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> anyhow::Result<Recognition> {
        Ok(Recognition::new("url42", 0.7))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn captcha(format: ImageFormat) -> Vec<u8> {
    let img = GrayImage::from_fn(150, 50, |x, _| if x % 15 < 5 { Luma([0]) } else { Luma([255]) });
    let mut buffer = Cursor::new(Vec::new());
    let image = DynamicImage::ImageLuma8(img);
    // The GIF encoder has no L8 support
    let image = if format == ImageFormat::Gif {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        image
    };
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

/// Serves captchas and a few misbehaving routes on an ephemeral port
async fn spawn_image_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/captcha.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], captcha(ImageFormat::Png)) }),
        )
        .route(
            "/captcha.jpg",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "image/jpeg; charset=binary")],
                    captcha(ImageFormat::Jpeg),
                )
            }),
        )
        .route(
            "/page.html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
        )
        .route(
            "/captcha.gif",
            get(|| async { ([(header::CONTENT_TYPE, "image/gif")], captcha(ImageFormat::Gif)) }),
        )
        .route(
            "/gone.png",
            get(|| async { StatusCode::NOT_FOUND.into_response() }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetcher() -> ImageFetcher {
    ImageFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap()
}

async fn solve_url(url: String) -> (StatusCode, Value) {
    let manager = VisionModelManager::with_recognizer(Arc::new(MockRecognizer));
    let state = AppState::new(Arc::new(manager), SolverConfig::default()).unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/captchaSolver")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "imgUrl": url }).to_string()))
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_fetch_png() {
    let addr = spawn_image_server().await;
    let bytes = fetcher()
        .fetch(&format!("http://{}/captcha.png", addr))
        .await
        .unwrap();
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn test_fetch_jpeg_with_parameters() {
    let addr = spawn_image_server().await;
    let bytes = ImageSource::Url(format!("http://{}/captcha.jpg", addr))
        .resolve(&fetcher())
        .await
        .unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_fetch_rejects_non_image_content_type() {
    let addr = spawn_image_server().await;
    let err = fetcher()
        .fetch(&format!("http://{}/page.html", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidContentType(ref ct) if ct == "text/html"));
}

#[tokio::test]
async fn test_fetch_rejects_gif() {
    let addr = spawn_image_server().await;
    let err = fetcher()
        .fetch(&format!("http://{}/captcha.gif", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::InvalidContentType(ref ct) if ct == "image/gif"));
    assert_eq!(err.to_string(), "Invalid file type");
}

#[test]
fn test_gif_fixture_is_a_real_gif() {
    let bytes = captcha(ImageFormat::Gif);
    assert_eq!(&bytes[..6], b"GIF89a");
}

#[tokio::test]
async fn test_fetch_rejects_error_status() {
    let addr = spawn_image_server().await;
    let err = fetcher()
        .fetch(&format!("http://{}/gone.png", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::FetchFailed(_)));
}

#[tokio::test]
async fn test_fetch_rejects_oversized_body() {
    let addr = spawn_image_server().await;
    let tiny = ImageFetcher::new(Duration::from_secs(5), 16).unwrap();
    let err = tiny
        .fetch(&format!("http://{}/captcha.png", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::TooLarge(_, 16)));
}

#[tokio::test]
async fn test_fetch_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let err = fetcher()
        .fetch(&format!("http://{}/captcha.png", addr))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to retrieve image from URL");
}

#[tokio::test]
async fn test_endpoint_solves_url() {
    let addr = spawn_image_server().await;
    let (status, json) = solve_url(format!("http://{}/captcha.png", addr)).await;
    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["detected_text"], "url42");
}

#[tokio::test]
async fn test_endpoint_invalid_content_type() {
    let addr = spawn_image_server().await;
    let (status, json) = solve_url(format!("http://{}/page.html", addr)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json, serde_json::json!({"error": "Invalid file type"}));
}

#[tokio::test]
async fn test_endpoint_not_found_url() {
    let addr = spawn_image_server().await;
    let (status, json) = solve_url(format!("http://{}/gone.png", addr)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json,
        serde_json::json!({"error": "Failed to retrieve image from URL"})
    );
}
