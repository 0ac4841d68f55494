// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide solver configuration, read from flags or the environment

use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::vision::{VisionModelConfig, DEFAULT_MAX_IMAGE_BYTES};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_PATH: &str = "./models/parseq/parseq.onnx";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Solver settings shared by every subcommand
#[derive(Args, Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "CAPTCHA_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "CAPTCHA_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// PARSeq ONNX model
    #[arg(long, env = "OCR_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Charset file, one character per line (defaults to the PARSeq charset)
    #[arg(long, env = "OCR_CHARSET_PATH")]
    pub charset_path: Option<PathBuf>,

    /// Largest accepted image, in bytes
    #[arg(long, env = "MAX_IMAGE_BYTES", default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,

    /// Timeout for downloading `imgUrl` captchas
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Also write each enhanced captcha here
    #[arg(long, env = "ENHANCED_IMAGE_PATH")]
    pub enhanced_dump_path: Option<PathBuf>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "OCR_INTRA_THREADS", default_value_t = DEFAULT_INTRA_THREADS)]
    pub intra_threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            charset_path: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            enhanced_dump_path: None,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_image_bytes == 0 {
            return Err(anyhow!("max_image_bytes must be greater than 0"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("fetch_timeout_secs must be greater than 0"));
        }
        if self.intra_threads == 0 {
            return Err(anyhow!("intra_threads must be greater than 0"));
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn vision_model_config(&self) -> VisionModelConfig {
        VisionModelConfig {
            ocr_model_path: Some(self.model_path.clone()),
            charset_path: self.charset_path.clone(),
            intra_threads: self.intra_threads,
        }
    }
}
