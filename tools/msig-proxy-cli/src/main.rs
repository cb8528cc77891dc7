// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::Cli;
use clap::Parser;
use msig_proxy_bin_common::logging::{maybe_print_banner, setup_tracing_logger};

pub(crate) mod cli;
pub(crate) mod config;
pub(crate) mod error;
mod keys;
mod pacing;
mod payloads;
mod scenario;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing_logger();
    maybe_print_banner(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    cli.execute().await?;

    Ok(())
}
