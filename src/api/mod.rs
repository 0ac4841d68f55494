// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod captcha;
pub mod errors;
pub mod server;

pub use captcha::{captcha_solver_handler, CaptchaRequest, CaptchaResponse, SolveRequest};
pub use errors::{ApiError, ErrorResponse};
pub use server::{create_router, start_server, AppState, HealthResponse};
