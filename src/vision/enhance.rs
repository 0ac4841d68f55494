// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Captcha enhancement pipeline
//!
//! Every captcha goes through the same fixed chain before recognition:
//! 1. Resize to a 200x50 canvas
//! 2. Grayscale (BT.601 luma)
//! 3. Inverted Otsu binarization
//! 4. Optional contrast gain / brightness offset
//! 5. Optional 3x3 sharpening
//! 6. Lossless PNG re-encode

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GrayImage, ImageFormat, Luma};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::image_utils::{decode_image_bytes, ImageError};

/// Width of the normalized captcha canvas
pub const CANVAS_WIDTH: u32 = 200;

/// Height of the normalized captcha canvas
pub const CANVAS_HEIGHT: u32 = 50;

/// Foreground value produced by binarization
const FOREGROUND: u8 = 255;

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("{name} must be a finite number, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Failed to encode enhanced image: {0}")]
    Encode(String),
}

impl EnhanceError {
    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EnhanceError::Encode(_))
    }
}

/// Brightness, contrast and sharpness multipliers
///
/// `1.0` leaves the corresponding step out of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhanceConfig {
    /// Additive offset applied after binarization
    pub brightness: f32,
    /// Gain applied after binarization
    pub contrast: f32,
    /// Weight of the centre tap in the sharpening kernel (times 9)
    pub sharpness: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            sharpness: 1.0,
        }
    }
}

impl EnhanceConfig {
    pub fn new(brightness: f32, contrast: f32, sharpness: f32) -> Self {
        Self {
            brightness,
            contrast,
            sharpness,
        }
    }

    /// Reject NaN and infinite multipliers
    pub fn validate(&self) -> Result<(), EnhanceError> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("sharpness", self.sharpness),
        ] {
            if !value.is_finite() {
                return Err(EnhanceError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    pub fn adjusts_levels(&self) -> bool {
        self.brightness != 1.0 || self.contrast != 1.0
    }

    pub fn sharpens(&self) -> bool {
        self.sharpness != 1.0
    }

    /// True when only the fixed steps (resize, grayscale, threshold) run
    pub fn is_identity(&self) -> bool {
        !self.adjusts_levels() && !self.sharpens()
    }
}

/// Run the enhancement chain on a decoded image
pub fn enhance_image(image: &DynamicImage, config: &EnhanceConfig) -> Result<GrayImage, EnhanceError> {
    config.validate()?;

    if image.width() == 0 || image.height() == 0 {
        return Err(ImageError::ZeroSized.into());
    }

    let resized = resize_to_canvas(image);
    let gray = to_grayscale(&resized);
    let level = otsu_threshold(&gray);
    let mut output = threshold_inverted(&gray, level);

    debug!(
        "Binarized {}x{} captcha at Otsu level {} (brightness={}, contrast={}, sharpness={})",
        image.width(),
        image.height(),
        level,
        config.brightness,
        config.contrast,
        config.sharpness
    );

    if config.adjusts_levels() {
        output = scale_levels(&output, config.contrast, config.brightness);
    }

    if config.sharpens() {
        output = sharpen(&output, config.sharpness);
    }

    Ok(output)
}

/// Decode, enhance and re-encode a captcha as PNG
pub fn enhance_bytes(
    bytes: &[u8],
    config: &EnhanceConfig,
    max_bytes: usize,
) -> Result<Vec<u8>, EnhanceError> {
    let (image, _info) = decode_image_bytes(bytes, max_bytes)?;
    let enhanced = enhance_image(&image, config)?;
    encode_png(&enhanced)
}

/// Encode a grayscale image as PNG
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, EnhanceError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| EnhanceError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Resize to the fixed canvas; the triangle filter widens with the scale
/// factor, which averages source pixels like an area resampler when shrinking.
fn resize_to_canvas(image: &DynamicImage) -> DynamicImage {
    image.resize_exact(CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Triangle)
}

/// BT.601 luma, alpha dropped
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        Luma([((luma + 500) / 1000) as u8])
    })
}

/// Otsu level: pixels above it form one class, the rest the other
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    imageproc::contrast::otsu_level(image)
}

/// Pixels above `level` become 0, everything else 255
pub fn threshold_inverted(image: &GrayImage, level: u8) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > level { 0 } else { FOREGROUND };
    }
    output
}

/// `|p * alpha + beta|`, rounded and saturated to u8
pub fn scale_levels(image: &GrayImage, alpha: f32, beta: f32) -> GrayImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let scaled = (pixel.0[0] as f32 * alpha + beta).abs();
        pixel.0[0] = saturate_u8(scaled);
    }
    output
}

/// Convolve with `[[-1,-1,-1],[-1,9*sharpness,-1],[-1,-1,-1]]`
///
/// Borders are mirrored without repeating the edge pixel (reflect-101).
pub fn sharpen(image: &GrayImage, sharpness: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let centre = 9.0 * sharpness;

    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0f32;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = reflect_101(x as i64 + dx, width);
                let sy = reflect_101(y as i64 + dy, height);
                let value = image.get_pixel(sx, sy).0[0] as f32;
                let weight = if dx == 0 && dy == 0 { centre } else { -1.0 };
                acc += weight * value;
            }
        }
        Luma([saturate_u8(acc)])
    })
}

fn reflect_101(index: i64, len: u32) -> u32 {
    let len = len as i64;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    // A 3x3 kernel never reaches further than one pixel past the edge
    if i < 0 {
        i = -i;
    }
    if i >= len {
        i = 2 * len - 2 - i;
    }
    i.clamp(0, len - 1) as u32
}

/// Round half to even, then clamp, like OpenCV's `saturate_cast`
fn saturate_u8(value: f32) -> u8 {
    value.round_ties_even().clamp(0.0, 255.0) as u8
}
