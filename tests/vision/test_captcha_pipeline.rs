// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Enhancement and solving through the public vision API

use captcha_solver::vision::enhance::{CANVAS_HEIGHT, CANVAS_WIDTH};
use captcha_solver::vision::{
    enhance_bytes, CaptchaPipeline, EnhanceConfig, VisionModelConfig, VisionModelManager,
    DEFAULT_MAX_IMAGE_BYTES,
};
use captcha_solver::{Recognition, TextRecognizer};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Keeps the last image so the test can inspect what the model received
struct CapturingRecognizer {
    last: Mutex<Option<DynamicImage>>,
}

impl TextRecognizer for CapturingRecognizer {
    fn recognize(&self, image: &DynamicImage) -> anyhow::Result<Recognition> {
        *self.last.lock().unwrap() = Some(image.clone());
        Ok(Recognition::new("7hX2q", 0.93))
    }

    fn name(&self) -> &str {
        "capturing"
    }
}

/// Dark glyph-like bars on a light, slightly noisy background
fn synthetic_captcha(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(240, 80, |x, y| {
        let glyph = (x / 16) % 2 == 0 && (20..60).contains(&y);
        if glyph {
            Rgb([30, 35, 50])
        } else {
            let noise = ((x * 7 + y * 13) % 20) as u8;
            Rgb([220 + noise, 215 + noise, 210 + noise])
        }
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

#[test]
fn test_enhance_bytes_from_jpeg() {
    let png = enhance_bytes(
        &synthetic_captcha(ImageFormat::Jpeg),
        &EnhanceConfig::default(),
        DEFAULT_MAX_IMAGE_BYTES,
    )
    .unwrap();

    let enhanced = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
    assert_eq!(enhanced.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));

    let gray = enhanced.to_luma8();
    assert!(gray.pixels().all(|p| p[0] == 0 || p[0] == 255));
    // Inverted: the dark glyphs become the white foreground
    assert!(gray.pixels().any(|p| p[0] == 255));
    assert!(gray.pixels().any(|p| p[0] == 0));
}

#[test]
fn test_pipeline_feeds_binary_canvas_to_model() {
    let recognizer = Arc::new(CapturingRecognizer {
        last: Mutex::new(None),
    });
    let pipeline = CaptchaPipeline::new(recognizer.clone(), DEFAULT_MAX_IMAGE_BYTES);

    let solution = pipeline
        .solve(&synthetic_captcha(ImageFormat::Png), &EnhanceConfig::default())
        .unwrap();
    assert_eq!(solution.text, "7hX2q");
    assert_eq!(solution.confidence, 0.93);

    let seen = recognizer.last.lock().unwrap().clone().unwrap();
    assert_eq!(seen.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
    assert!(seen.to_luma8().pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn test_contrast_gain_keeps_binary_extremes() {
    let recognizer = Arc::new(CapturingRecognizer {
        last: Mutex::new(None),
    });
    let pipeline = CaptchaPipeline::new(recognizer.clone(), DEFAULT_MAX_IMAGE_BYTES);

    // 255 * 0.5 + 0 = 127.5 rounds to 128
    pipeline
        .solve(
            &synthetic_captcha(ImageFormat::Png),
            &EnhanceConfig::new(0.0, 0.5, 1.0),
        )
        .unwrap();

    let seen = recognizer.last.lock().unwrap().clone().unwrap().to_luma8();
    assert!(seen.pixels().all(|p| p[0] == 0 || p[0] == 128));
}

#[tokio::test]
#[ignore] // Only run if model files are downloaded
async fn test_real_model_reads_synthetic_captcha() {
    let manager = VisionModelManager::new(VisionModelConfig {
        ocr_model_path: Some(PathBuf::from("./models/parseq/parseq.onnx")),
        charset_path: None,
        intra_threads: 2,
    })
    .await
    .unwrap();
    let recognizer = manager.get_recognizer().expect("model should be loaded");

    let pipeline = CaptchaPipeline::new(recognizer, DEFAULT_MAX_IMAGE_BYTES);
    let solution = pipeline
        .solve(&synthetic_captcha(ImageFormat::Png), &EnhanceConfig::default())
        .unwrap();

    assert!((0.0..=1.0).contains(&solution.confidence));
}
