// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::SolverConfig;

/// Captcha solver: HTTP service and local tools
#[derive(Parser, Debug)]
#[command(name = "captcha-solver")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Solve text captchas with image enhancement and PARSeq OCR", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: SolverConfig,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Solve a local captcha image and print the response JSON
    Solve(commands::SolveArgs),

    /// Write the enhanced version of a captcha, for tuning parameters
    Enhance(commands::EnhanceArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    cli.config.validate()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve(cli.config).await,
        Commands::Solve(args) => commands::solve(cli.config, args).await,
        Commands::Enhance(args) => commands::enhance(cli.config, args).await,
    }
}
