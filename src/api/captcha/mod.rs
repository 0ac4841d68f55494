// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha solver endpoint module
//!
//! Provides POST /captchaSolver for decoding captcha images.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::captcha_solver_handler;
pub use request::{CaptchaRequest, SolveRequest, MISSING_IMAGE_MESSAGE};
pub use response::{CaptchaResponse, RESULT_MESSAGE};
