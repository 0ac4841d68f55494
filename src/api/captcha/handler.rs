// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha solver endpoint handler

use axum::{
    extract::{FromRequest, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::SolveRequest;
use super::response::CaptchaResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;

/// POST /captchaSolver - Decode the text of a captcha image
///
/// # Request
/// Either `multipart/form-data` with a `file` part plus optional
/// `brightness`, `contrast`, `sharpness` text parts, or a JSON body:
/// - `imgUrl`: URL of a PNG/JPEG captcha
/// - `base64Image`: base64 captcha, optionally a data URI
/// - `brightness`, `contrast`, `sharpness`: enhancement multipliers (default 1.0)
///
/// # Response
/// - `detected_text`: recognized text
/// - `confidence_score`: model confidence (0.0-1.0)
/// - `result`: "OCR Completed Successfully."
/// - `execution_time`: e.g. "0.42 sec"
///
/// # Errors
/// - 400 Bad Request: missing image, bad URL, wrong content type, undecodable image
/// - 503 Service Unavailable: OCR model not loaded
/// - 500 Internal Server Error: OCR processing failed
pub async fn captcha_solver_handler(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<CaptchaResponse>, ApiError> {
    let started = Instant::now();

    // 1. Parse the body according to its content type
    let solve = parse_request(&state, request).await.map_err(|e| {
        warn!("Captcha request rejected: {}", e);
        e
    })?;

    debug!(
        "Captcha request: source={}, config={:?}",
        solve.source.kind(),
        solve.config
    );

    // 2. Model must be loaded
    let pipeline = state.pipeline().ok_or_else(|| {
        warn!("OCR model not loaded");
        ApiError::ServiceUnavailable("OCR model not loaded".to_string())
    })?;

    // 3. Resolve the image bytes
    let bytes = solve.source.resolve(&state.fetcher).await.map_err(|e| {
        warn!("Failed to resolve captcha image: {}", e);
        ApiError::from(e)
    })?;

    // 4. Enhance and recognize off the async runtime
    let config = solve.config;
    let solution = tokio::task::spawn_blocking(move || pipeline.solve(&bytes, &config))
        .await
        .map_err(|e| ApiError::InternalError(format!("OCR task failed: {}", e)))?
        .map_err(|e| {
            warn!("Captcha solving failed: {}", e);
            ApiError::from(e)
        })?;

    let response = CaptchaResponse::new(solution.text, solution.confidence, started.elapsed());

    info!(
        "Captcha request complete: '{}' ({:.3}) in {}",
        response.detected_text, response.confidence_score, response.execution_time
    );

    Ok(Json(response))
}

/// Multipart bodies carry an upload; everything else is read as JSON
async fn parse_request(state: &AppState, request: Request) -> Result<SolveRequest, ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid multipart body: {}", e)))?;
        return SolveRequest::from_multipart(multipart).await;
    }

    if !content_type.is_empty() && !content_type.contains("json") {
        return Err(ApiError::InvalidRequest(format!(
            "Unsupported content type '{}'",
            content_type
        )));
    }

    let body = Bytes::from_request(request, state)
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to read request body: {}", e)))?;

    SolveRequest::from_json_bytes(&body)
}
