// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Vision model manager tests
//!
//! Verify that the VisionModelManager:
//! - Reports availability of the recognizer
//! - Survives missing model files
//! - Loads the real PARSeq export when present

use captcha_solver::vision::{VisionModelConfig, VisionModelManager};
use captcha_solver::{Recognition, TextRecognizer};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

// Model path (downloaded separately)
const PARSEQ_MODEL_PATH: &str = "./models/parseq/parseq.onnx";

struct FixedRecognizer;

impl TextRecognizer for FixedRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> anyhow::Result<Recognition> {
        Ok(Recognition::new("abc", 1.0))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod model_manager_tests {
    use super::*;

    #[test]
    fn test_default_config_points_at_parseq() {
        let config = VisionModelConfig::default();
        let path = config.ocr_model_path.unwrap();
        assert!(path.to_string_lossy().contains("parseq"));
    }

    #[test]
    fn test_with_recognizer_lists_model() {
        let manager = VisionModelManager::with_recognizer(Arc::new(FixedRecognizer));
        assert!(manager.has_ocr());

        let models = manager.list_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "fixed");
        assert_eq!(models[0].model_type, "ocr");
        assert!(models[0].available);
    }

    #[test]
    fn test_empty_manager() {
        let manager = VisionModelManager::empty();
        assert!(!manager.has_ocr());
        assert!(manager.get_recognizer().is_none());
        assert!(!manager.list_models()[0].available);
    }

    #[tokio::test]
    async fn test_missing_model_file_is_not_fatal() {
        let config = VisionModelConfig {
            ocr_model_path: Some(PathBuf::from("/nonexistent/parseq.onnx")),
            charset_path: None,
            intra_threads: 1,
        };
        let manager = VisionModelManager::new(config).await.unwrap();
        assert!(!manager.has_ocr());
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_real_model_loads() {
        let config = VisionModelConfig {
            ocr_model_path: Some(PathBuf::from(PARSEQ_MODEL_PATH)),
            charset_path: None,
            intra_threads: 2,
        };
        let manager = VisionModelManager::new(config).await.unwrap();
        assert!(manager.has_ocr());
        assert_eq!(manager.list_models()[0].name, "parseq");
    }
}
