// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha solver request types and validation

use axum_extra::extract::Multipart;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::errors::ApiError;
use crate::vision::{EnhanceConfig, ImageSource};

/// Returned when no image source is present
pub const MISSING_IMAGE_MESSAGE: &str =
    "Either imgUrl, base64Image, or image buffer must be provided";

/// Multipart field carrying the uploaded captcha
pub const FILE_FIELD: &str = "file";

/// JSON body of `POST /captchaSolver`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaRequest {
    /// Remote captcha location
    #[serde(default)]
    pub img_url: Option<String>,

    /// Base64 captcha, optionally a data URI
    #[serde(default)]
    pub base64_image: Option<String>,

    /// Additive offset applied after thresholding
    #[serde(default)]
    pub brightness: Option<f32>,

    /// Gain applied after thresholding
    #[serde(default)]
    pub contrast: Option<f32>,

    /// Sharpen kernel center multiplier
    #[serde(default)]
    pub sharpness: Option<f32>,
}

impl CaptchaRequest {
    pub fn enhance_config(&self) -> EnhanceConfig {
        let defaults = EnhanceConfig::default();
        EnhanceConfig::new(
            self.brightness.unwrap_or(defaults.brightness),
            self.contrast.unwrap_or(defaults.contrast),
            self.sharpness.unwrap_or(defaults.sharpness),
        )
    }

    /// `imgUrl` wins over `base64Image`; empty strings count as absent
    pub fn image_source(&self) -> Option<ImageSource> {
        if let Some(url) = non_empty(&self.img_url) {
            return Some(ImageSource::Url(url.to_string()));
        }
        non_empty(&self.base64_image).map(|b64| ImageSource::Base64(b64.to_string()))
    }

    /// Validate the request
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image_source().is_none() {
            return Err(ApiError::InvalidRequest(MISSING_IMAGE_MESSAGE.to_string()));
        }

        for (field, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("sharpness", self.sharpness),
        ] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(ApiError::ValidationError {
                        field: field.to_string(),
                        message: format!("must be a finite number, got {}", v),
                    });
                }
            }
        }

        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// A parsed request, whatever its transport
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub source: ImageSource,
    pub config: EnhanceConfig,
}

impl SolveRequest {
    pub fn from_json(request: CaptchaRequest) -> Result<Self, ApiError> {
        request.validate()?;
        let config = request.enhance_config();
        let source = request
            .image_source()
            .ok_or_else(|| ApiError::InvalidRequest(MISSING_IMAGE_MESSAGE.to_string()))?;
        Ok(Self { source, config })
    }

    pub fn from_json_bytes(body: &[u8]) -> Result<Self, ApiError> {
        let request: CaptchaRequest = if body.iter().all(u8::is_ascii_whitespace) {
            CaptchaRequest::default()
        } else {
            serde_json::from_slice(body)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {}", e)))?
        };
        Self::from_json(request)
    }

    /// Read the `file` part and the enhancement fields; other parts are ignored
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut file: Option<Bytes> = None;
        let mut config = EnhanceConfig::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                FILE_FIELD => {
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::InvalidRequest(format!("Failed to read uploaded file: {}", e))
                    })?;
                    debug!("Received {} byte upload", bytes.len());
                    file = Some(bytes);
                }
                "brightness" | "contrast" | "sharpness" => {
                    let text = field.text().await.map_err(|e| {
                        ApiError::InvalidRequest(format!("Failed to read field {}: {}", name, e))
                    })?;
                    let value = parse_param(&name, &text)?;
                    match name.as_str() {
                        "brightness" => config.brightness = value,
                        "contrast" => config.contrast = value,
                        _ => config.sharpness = value,
                    }
                }
                _ => debug!("Ignoring multipart field '{}'", name),
            }
        }

        let file = file
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest(MISSING_IMAGE_MESSAGE.to_string()))?;

        Ok(Self {
            source: ImageSource::Upload(file),
            config,
        })
    }
}

/// Parse a multipart text field as a finite float
pub fn parse_param(field: &str, text: &str) -> Result<f32, ApiError> {
    let trimmed = text.trim();
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("expected a number, got '{}'", trimmed),
        }),
    }
}
