// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PARSeq text recognition model
//!
//! Runs a PARSeq ONNX export on CPU and decodes its output the way the
//! PARSeq tokenizer does: greedy per-step argmax, stop at the
//! end-of-sequence token, report the probability of the final step.

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::model::{Recognition, TextRecognizer};
use super::preprocessing::{preprocess_for_recognition, REC_INPUT_HEIGHT, REC_INPUT_WIDTH};

/// Charset the pretrained PARSeq weights were trained on (94 printable ASCII characters)
pub const DEFAULT_CHARSET: &str =
    "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Class index of the end-of-sequence token `[E]`
pub const EOS_INDEX: usize = 0;

/// PARSeq recognizer backed by ONNX Runtime
#[derive(Clone)]
pub struct ParseqRecognizer {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Characters for class indices 1..=len
    charset: Arc<Vec<char>>,
    /// Model input name
    input_name: String,
    /// Name reported to clients
    model_name: String,
}

impl std::fmt::Debug for ParseqRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseqRecognizer")
            .field("charset_size", &self.charset.len())
            .field("input_name", &self.input_name)
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl ParseqRecognizer {
    /// Load the recognizer
    ///
    /// # Arguments
    /// - `model_path`: Path to the PARSeq ONNX export
    /// - `charset_path`: Optional charset file, one character per line.
    ///   Falls back to [`DEFAULT_CHARSET`].
    /// - `intra_threads`: ONNX Runtime intra-op thread count
    ///
    /// # Errors
    /// Returns error if a file is missing or ONNX Runtime initialization fails
    pub async fn new(
        model_path: impl AsRef<Path>,
        charset_path: Option<&Path>,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }

        let charset = match charset_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("OCR charset not found: {}", path.display());
                }
                Self::load_charset(path)?
            }
            None => DEFAULT_CHARSET.chars().collect(),
        };
        info!("Using recognition charset with {} characters", charset.len());

        info!("Loading PARSeq model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load PARSeq model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Recognition model expected input: {:?}", input.input_type);
        }

        let model_name = model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "parseq".to_string());

        info!("✅ PARSeq model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            charset: Arc::new(charset),
            input_name,
            model_name,
        })
    }

    /// Load a charset file, one character per line
    fn load_charset(path: &Path) -> Result<Vec<char>> {
        let file = File::open(path)
            .context(format!("Failed to open charset: {}", path.display()))?;

        let mut charset = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("Failed to read charset line")?;
            if let Some(ch) = line.chars().next() {
                charset.push(ch);
            }
        }

        if charset.is_empty() {
            anyhow::bail!("OCR charset is empty: {}", path.display());
        }

        Ok(charset)
    }

    pub fn charset_size(&self) -> usize {
        self.charset.len()
    }
}

impl TextRecognizer for ParseqRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Recognition> {
        let input = preprocess_for_recognition(image);
        debug_assert_eq!(
            input.shape(),
            &[1, 3, REC_INPUT_HEIGHT as usize, REC_INPUT_WIDTH as usize]
        );

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Recognition session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Recognition output shape: {:?}", output_tensor.shape());

        decode_parseq(&output_tensor, &self.charset)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Greedy PARSeq decoding
///
/// Accepts `[1, T, C]` or `[T, C]` scores. Raw logits are softmaxed per
/// step; rows that already form a distribution are used as-is.
pub fn decode_parseq(output: &ArrayViewD<f32>, charset: &[char]) -> Result<Recognition> {
    let shape = output.shape();
    let (seq_len, num_classes) = match shape.len() {
        3 => (shape[1], shape[2]),
        2 => (shape[0], shape[1]),
        _ => anyhow::bail!("Unexpected output shape: {:?}", shape),
    };

    if num_classes == 0 {
        anyhow::bail!("Recognition output has no classes");
    }

    let row = |t: usize| -> Vec<f32> {
        (0..num_classes)
            .map(|c| {
                if shape.len() == 3 {
                    output[IxDyn(&[0, t, c])]
                } else {
                    output[IxDyn(&[t, c])]
                }
            })
            .collect()
    };

    let mut text = String::new();
    let mut char_confidences = Vec::new();
    let mut final_prob = 0.0f32;

    for t in 0..seq_len {
        let probs = to_probabilities(row(t));

        let (index, prob) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        final_prob = prob;

        if index == EOS_INDEX {
            break;
        }

        // Indices past the charset are BOS/PAD and carry no text
        if let Some(ch) = charset.get(index - 1) {
            text.push(*ch);
            char_confidences.push(prob);
        }
    }

    Ok(Recognition {
        text,
        confidence: round_confidence(final_prob),
        char_confidences,
    })
}

fn to_probabilities(row: Vec<f32>) -> Vec<f32> {
    let is_distribution = row.iter().all(|p| (0.0..=1.0).contains(p))
        && (row.iter().sum::<f32>() - 1.0).abs() < 1e-3;
    if is_distribution {
        return row;
    }

    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = row.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn round_confidence(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}
