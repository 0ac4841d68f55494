// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::captcha::captcha_solver_handler;
use crate::config::SolverConfig;
use crate::version;
use crate::vision::{CaptchaPipeline, ImageFetcher, VisionModelManager};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub vision_model_manager: Arc<VisionModelManager>,
    pub fetcher: Arc<ImageFetcher>,
    pub config: Arc<SolverConfig>,
}

impl AppState {
    pub fn new(vision_model_manager: Arc<VisionModelManager>, config: SolverConfig) -> Result<Self> {
        let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes)?;
        Ok(Self {
            vision_model_manager,
            fetcher: Arc::new(fetcher),
            config: Arc::new(config),
        })
    }

    /// Pipeline over the loaded recognizer, `None` when no model is loaded
    pub fn pipeline(&self) -> Option<CaptchaPipeline> {
        self.vision_model_manager.get_recognizer().map(|recognizer| {
            CaptchaPipeline::new(recognizer, self.config.max_image_bytes)
                .with_dump_path(self.config.enhanced_dump_path.clone())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomeResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub issues: Option<Vec<String>>,
    pub model: Option<String>,
    pub version: String,
}

pub fn create_router(state: AppState) -> Router {
    // Base64 and multipart framing inflate the payload past the raw image size
    let body_limit = state.config.max_image_bytes.saturating_mul(2);

    Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .route("/captchaSolver", post(captcha_solver_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn home_handler() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: version::GREETING.to_string(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let models = state.vision_model_manager.list_models();
    let loaded = models.iter().find(|m| m.available);

    let (status, issues) = match loaded {
        Some(_) => ("healthy", None),
        None => ("degraded", Some(vec!["OCR model not loaded".to_string()])),
    };

    Json(HealthResponse {
        status: status.to_string(),
        issues,
        model: loaded.map(|m| m.name.clone()),
        version: version::VERSION_NUMBER.to_string(),
    })
}

/// Serve until Ctrl+C
pub async fn start_server(config: SolverConfig, manager: Arc<VisionModelManager>) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::new(manager, config)?;
    let app = create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Captcha solver listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
