// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognizer abstraction shared by the HTTP handler and the CLI

use anyhow::Result;
use image::DynamicImage;

/// Text decoded from a captcha
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// The recognized text content
    pub text: String,
    /// Confidence score (0.0-1.0), rounded to 3 decimals
    pub confidence: f32,
    /// Per-character probabilities
    pub char_confidences: Vec<f32>,
}

impl Recognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            char_confidences: Vec::new(),
        }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Anything that can read text out of an enhanced captcha
pub trait TextRecognizer: Send + Sync {
    /// Recognize the text in an already enhanced image
    fn recognize(&self, image: &DynamicImage) -> Result<Recognition>;

    /// Model name reported by `/health`
    fn name(&self) -> &str;
}
