// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end captcha solving: decode, enhance, recognize

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::enhance::{encode_png, enhance_image, EnhanceConfig, EnhanceError};
use super::image_utils::decode_image_bytes;
use super::ocr::TextRecognizer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Enhance(#[from] EnhanceError),

    #[error("OCR processing failed: {0:#}")]
    Recognition(anyhow::Error),
}

impl PipelineError {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        match self {
            PipelineError::Enhance(e) => e.is_client_error(),
            PipelineError::Recognition(_) => false,
        }
    }
}

/// Result of solving one captcha
#[derive(Debug, Clone)]
pub struct CaptchaSolution {
    /// Decoded captcha text
    pub text: String,
    /// Model confidence (0.0-1.0)
    pub confidence: f32,
    /// Time spent enhancing and recognizing, in milliseconds
    pub processing_time_ms: u64,
}

/// The enhancement chain followed by the recognizer
#[derive(Clone)]
pub struct CaptchaPipeline {
    recognizer: Arc<dyn TextRecognizer>,
    max_image_bytes: usize,
    dump_path: Option<PathBuf>,
}

impl CaptchaPipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, max_image_bytes: usize) -> Self {
        Self {
            recognizer,
            max_image_bytes,
            dump_path: None,
        }
    }

    /// Also write every enhanced captcha to `path` (debugging aid)
    pub fn with_dump_path(mut self, path: Option<PathBuf>) -> Self {
        self.dump_path = path;
        self
    }

    pub fn model_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Solve a captcha given as encoded image bytes
    ///
    /// CPU bound; call from a blocking context.
    pub fn solve(&self, bytes: &[u8], config: &EnhanceConfig) -> Result<CaptchaSolution, PipelineError> {
        let started = Instant::now();

        config.validate()?;
        let (image, info) = decode_image_bytes(bytes, self.max_image_bytes).map_err(EnhanceError::from)?;

        debug!(
            "Decoded captcha: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let enhanced = enhance_image(&image, config)?;

        if let Some(ref path) = self.dump_path {
            self.dump(&enhanced, path);
        }

        let recognition = self
            .recognizer
            .recognize(&DynamicImage::ImageLuma8(enhanced))
            .map_err(PipelineError::Recognition)?;

        let processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            "Captcha solved: {} chars, {:.3} confidence, {}ms",
            recognition.text.chars().count(),
            recognition.confidence,
            processing_time_ms
        );

        Ok(CaptchaSolution {
            text: recognition.text,
            confidence: recognition.confidence,
            processing_time_ms,
        })
    }

    fn dump(&self, enhanced: &image::GrayImage, path: &PathBuf) {
        match encode_png(enhanced).map(|png| std::fs::write(path, png)) {
            Ok(Ok(())) => debug!("Enhanced image saved to {}", path.display()),
            Ok(Err(e)) => warn!("Failed to save enhanced image to {}: {}", path.display(), e),
            Err(e) => warn!("Failed to encode enhanced image: {}", e),
        }
    }
}
