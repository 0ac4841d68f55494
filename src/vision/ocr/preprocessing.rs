// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the PARSeq recognizer

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 32;

/// Recognition model input width
pub const REC_INPUT_WIDTH: u32 = 128;

/// Per-channel normalization mean
pub const NORM_MEAN: f32 = 0.5;

/// Per-channel normalization std
pub const NORM_STD: f32 = 0.5;

/// Preprocess an enhanced captcha for recognition
///
/// Steps:
/// 1. Convert to RGB (grayscale input is replicated across channels)
/// 2. Resize to 32x128 with a bicubic (Catmull-Rom) filter
/// 3. Normalize: (pixel/255 - 0.5) / 0.5, giving values in [-1, 1]
/// 4. Convert to NCHW tensor format [1, 3, 32, 128]
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let resized = image.resize_exact(REC_INPUT_WIDTH, REC_INPUT_HEIGHT, FilterType::CatmullRom);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::zeros((
        1,
        3,
        REC_INPUT_HEIGHT as usize,
        REC_INPUT_WIDTH as usize,
    ));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (pixel[c] as f32 / 255.0 - NORM_MEAN) / NORM_STD;
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }

    tensor
}
