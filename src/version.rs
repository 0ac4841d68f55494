// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the captcha solver

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-parseq-onnx";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Greeting served on `GET /`
pub const GREETING: &str = "Hello from CaptchaSolver v1.0!";

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("CaptchaSolver {}", VERSION)
}
