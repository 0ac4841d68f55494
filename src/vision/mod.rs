// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for captcha solving
//!
//! This module provides:
//! - Input resolution (URL, base64, upload)
//! - The fixed enhancement pipeline
//! - PARSeq text recognition on CPU

pub mod enhance;
pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod pipeline;
pub mod source;

pub use enhance::{enhance_bytes, enhance_image, EnhanceConfig, EnhanceError};
pub use image_utils::{
    decode_base64_payload, decode_image_bytes, detect_format, ImageError, ImageInfo,
    DEFAULT_MAX_IMAGE_BYTES,
};
pub use model_manager::{VisionModelConfig, VisionModelInfo, VisionModelManager};
pub use pipeline::{CaptchaPipeline, CaptchaSolution, PipelineError};
pub use source::{ImageFetcher, ImageSource, SourceError};
