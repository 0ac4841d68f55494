// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Resolution of the three captcha input sources into raw image bytes

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::image_utils::{decode_base64_payload, ImageError};

/// Content types accepted from remote URLs
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// Input source resolution errors; all of them are caused by the caller
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid image URL: {0}")]
    InvalidUrl(String),

    /// The reason is logged, the client only sees the generic message
    #[error("Failed to retrieve image from URL")]
    FetchFailed(String),

    #[error("Invalid file type")]
    InvalidContentType(String),

    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Where the captcha comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Remote image fetched over HTTP(S)
    Url(String),
    /// Base64 payload, optionally a `data:` URI
    Base64(String),
    /// Raw bytes from a multipart upload
    Upload(Bytes),
}

impl ImageSource {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "url",
            ImageSource::Base64(_) => "base64",
            ImageSource::Upload(_) => "upload",
        }
    }

    /// Turn the source into raw image bytes
    pub async fn resolve(self, fetcher: &ImageFetcher) -> Result<Bytes, SourceError> {
        match self {
            ImageSource::Url(url) => fetcher.fetch(&url).await,
            ImageSource::Base64(payload) => {
                let bytes = decode_base64_payload(&payload, fetcher.max_bytes())?;
                Ok(Bytes::from(bytes))
            }
            ImageSource::Upload(bytes) => {
                if bytes.is_empty() {
                    return Err(ImageError::EmptyData.into());
                }
                if bytes.len() > fetcher.max_bytes() {
                    return Err(SourceError::TooLarge(bytes.len(), fetcher.max_bytes()));
                }
                Ok(bytes)
            }
        }
    }
}

/// HTTP client used to download captchas given by URL
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// Create a fetcher with a per-request timeout and a body size cap
    pub fn new(timeout: Duration, max_bytes: usize) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("CaptchaSolver/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, max_bytes })
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Download an image, enforcing status, content type and size
    pub async fn fetch(&self, url: &str) -> Result<Bytes, SourceError> {
        let parsed = Self::parse_url(url)?;

        debug!("Fetching captcha from: {}", parsed);

        let response = self.client.get(parsed.clone()).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timeout fetching {}", parsed)
            } else {
                e.to_string()
            };
            warn!("Captcha fetch failed: {}", reason);
            SourceError::FetchFailed(reason)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Captcha fetch returned HTTP {} for {}", status.as_u16(), parsed);
            return Err(SourceError::FetchFailed(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(media_type)
            .unwrap_or_default();

        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            warn!("Rejected captcha with content type '{}' from {}", content_type, parsed);
            return Err(SourceError::InvalidContentType(content_type));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_bytes {
                return Err(SourceError::TooLarge(length as usize, self.max_bytes));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::FetchFailed(e.to_string()))?;

        if bytes.len() > self.max_bytes {
            return Err(SourceError::TooLarge(bytes.len(), self.max_bytes));
        }

        info!("Fetched {} byte captcha from {}", bytes.len(), parsed);

        Ok(bytes)
    }

    /// Only absolute http(s) URLs are fetched
    fn parse_url(url: &str) -> Result<Url, SourceError> {
        let parsed = Url::parse(url.trim()).map_err(|e| SourceError::InvalidUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(SourceError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }
}

/// `image/PNG; charset=binary` -> `image/png`
fn media_type(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
