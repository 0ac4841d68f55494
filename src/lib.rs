// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use api::{create_router, AppState, CaptchaRequest, CaptchaResponse};
pub use config::SolverConfig;
pub use vision::{
    CaptchaPipeline, CaptchaSolution, EnhanceConfig, ImageFetcher, ImageSource,
    VisionModelManager,
};
pub use vision::ocr::{ParseqRecognizer, Recognition, TextRecognizer};
