// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use captcha_solver::cli::{self, Cli};
use clap::Parser;
use std::env;

#[tokio::main]
async fn main() {
    // .env first so its values feed clap's env fallbacks
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
