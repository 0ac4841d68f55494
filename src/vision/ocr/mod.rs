// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha text recognition
//!
//! Components:
//! - `preprocessing` - Tensor preparation for the recognizer
//! - `recognition` - PARSeq ONNX model and decoding
//! - `model` - Recognizer trait and result type

pub mod model;
pub mod preprocessing;
pub mod recognition;

pub use model::{Recognition, TextRecognizer};
pub use preprocessing::preprocess_for_recognition;
pub use recognition::{decode_parseq, ParseqRecognizer, DEFAULT_CHARSET};
