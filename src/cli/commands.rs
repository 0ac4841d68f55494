// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::api::{start_server, CaptchaResponse};
use crate::config::SolverConfig;
use crate::version;
use crate::vision::{enhance_bytes, CaptchaPipeline, EnhanceConfig, VisionModelManager};

/// Enhancement multipliers shared by `solve` and `enhance`
#[derive(Args, Debug, Clone)]
pub struct EnhanceParams {
    /// Additive offset applied after thresholding
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub brightness: f32,

    /// Gain applied after thresholding
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub contrast: f32,

    /// Sharpen kernel center multiplier
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub sharpness: f32,
}

impl EnhanceParams {
    pub fn to_config(&self) -> EnhanceConfig {
        EnhanceConfig::new(self.brightness, self.contrast, self.sharpness)
    }
}

/// Arguments for the solve command
#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Captcha image (PNG or JPEG)
    pub image: PathBuf,

    #[command(flatten)]
    pub params: EnhanceParams,
}

/// Arguments for the enhance command
#[derive(Args, Debug)]
pub struct EnhanceArgs {
    /// Captcha image to enhance
    pub input: PathBuf,

    /// Where to write the enhanced PNG
    pub output: PathBuf,

    #[command(flatten)]
    pub params: EnhanceParams,
}

pub async fn serve(config: SolverConfig) -> Result<()> {
    info!("🚀 Starting {}", version::get_version_string());

    let manager = VisionModelManager::new(config.vision_model_config()).await?;
    if !manager.has_ocr() {
        warn!("⚠️ No OCR model loaded, /captchaSolver will answer 503");
    }

    start_server(config, Arc::new(manager)).await
}

pub async fn solve(config: SolverConfig, args: SolveArgs) -> Result<()> {
    let started = Instant::now();

    let manager = VisionModelManager::new(config.vision_model_config()).await?;
    let recognizer = manager
        .get_recognizer()
        .ok_or_else(|| anyhow!("OCR model not loaded from {}", config.model_path.display()))?;

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;

    let pipeline = CaptchaPipeline::new(recognizer, config.max_image_bytes)
        .with_dump_path(config.enhanced_dump_path.clone());
    let enhance_config = args.params.to_config();

    let solution = tokio::task::spawn_blocking(move || pipeline.solve(&bytes, &enhance_config))
        .await
        .context("OCR task failed")??;

    let response = CaptchaResponse::new(solution.text, solution.confidence, started.elapsed());
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

pub async fn enhance(config: SolverConfig, args: EnhanceArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let enhance_config = args.params.to_config();
    let max_bytes = config.max_image_bytes;
    let png = tokio::task::spawn_blocking(move || enhance_bytes(&bytes, &enhance_config, max_bytes))
        .await
        .context("Enhancement task failed")??;

    tokio::fs::write(&args.output, &png)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "Enhanced {} -> {} ({} bytes)",
        args.input.display(),
        args.output.display(),
        png.len()
    );

    Ok(())
}
