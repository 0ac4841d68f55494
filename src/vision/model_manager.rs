// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading and sharing the captcha recognizer

use std::path::PathBuf;
use std::sync::Arc;

use crate::vision::ocr::{ParseqRecognizer, TextRecognizer};

/// Configuration for loading vision models
#[derive(Debug, Clone)]
pub struct VisionModelConfig {
    /// Path to the PARSeq ONNX file (optional)
    pub ocr_model_path: Option<PathBuf>,
    /// Path to a charset file (optional, defaults to the PARSeq charset)
    pub charset_path: Option<PathBuf>,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for VisionModelConfig {
    fn default() -> Self {
        Self {
            ocr_model_path: Some(PathBuf::from("./models/parseq/parseq.onnx")),
            charset_path: None,
            intra_threads: 4,
        }
    }
}

/// Information about a loaded vision model
#[derive(Debug, Clone)]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type
    pub model_type: String,
    /// Whether the model is available
    pub available: bool,
}

/// Holds the recognizer shared by every request
///
/// A missing or broken model file does not abort startup; the solver
/// endpoint answers 503 until a model is available.
pub struct VisionModelManager {
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("recognizer", &self.recognizer.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}

impl VisionModelManager {
    /// Create a new VisionModelManager with the given configuration
    pub async fn new(config: VisionModelConfig) -> anyhow::Result<Self> {
        let recognizer = if let Some(ref path) = config.ocr_model_path {
            match ParseqRecognizer::new(
                path,
                config.charset_path.as_deref(),
                config.intra_threads,
            )
            .await
            {
                Ok(model) => {
                    tracing::info!("✅ PARSeq model loaded from {}", path.display());
                    Some(Arc::new(model) as Arc<dyn TextRecognizer>)
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to load OCR model from {}: {:#}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self { recognizer })
    }

    /// Wrap an already constructed recognizer
    pub fn with_recognizer(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            recognizer: Some(recognizer),
        }
    }

    /// Manager with no model loaded
    pub fn empty() -> Self {
        Self { recognizer: None }
    }

    /// Get the recognizer if available
    pub fn get_recognizer(&self) -> Option<Arc<dyn TextRecognizer>> {
        self.recognizer.clone()
    }

    /// Check if OCR is available
    pub fn has_ocr(&self) -> bool {
        self.recognizer.is_some()
    }

    /// List all vision models and their availability
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        vec![VisionModelInfo {
            name: self
                .recognizer
                .as_ref()
                .map(|r| r.name().to_string())
                .unwrap_or_else(|| "parseq".to_string()),
            model_type: "ocr".to_string(),
            available: self.recognizer.is_some(),
        }]
    }
}
