// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha solver response types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Constant `result` field of a successful response
pub const RESULT_MESSAGE: &str = "OCR Completed Successfully.";

/// Response from the captcha solver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptchaResponse {
    /// Decoded captcha text
    pub detected_text: String,
    /// Model confidence (0.0-1.0)
    pub confidence_score: f32,
    pub result: String,
    /// Wall time of the whole request, e.g. "0.42 sec"
    pub execution_time: String,
}

impl CaptchaResponse {
    pub fn new(detected_text: String, confidence_score: f32, elapsed: Duration) -> Self {
        Self {
            detected_text,
            confidence_score,
            result: RESULT_MESSAGE.to_string(),
            execution_time: format!("{} sec", format_seconds(elapsed)),
        }
    }
}

/// Seconds rounded to two decimals; whole values keep one decimal ("1.0")
pub fn format_seconds(elapsed: Duration) -> String {
    let rounded = (elapsed.as_secs_f64() * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}
