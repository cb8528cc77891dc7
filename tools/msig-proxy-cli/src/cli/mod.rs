// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::config::LedgerBackend;
use crate::error::MsigProxyCliError;
use clap::{Parser, Subcommand};
use std::time::Duration;
use url::Url;

mod derive;
mod init;
mod run;

#[derive(Parser, Debug)]
#[clap(author = "Nymtech", version, about)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    pub(crate) async fn execute(self) -> Result<(), MsigProxyCliError> {
        match self.command {
            Commands::Init(args) => init::execute(args),
            Commands::Derive(args) => derive::execute(args),
            Commands::Run(args) => run::execute(args).await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Write a commented configuration file with the default scenario parameters
    Init(init::Args),

    /// Print the multisig account derived from the given members and threshold
    Derive(derive::Args),

    /// Provision the proxied account and both multisig groups, then run the announce, delay,
    /// execute and cancel scenario against the configured ordering log
    Run(run::Args),
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct ConfigOverridableArgs {
    /// Ordering log to run against.
    #[clap(long, value_enum)]
    pub(crate) backend: Option<LedgerBackend>,

    /// Url to the rpc endpoint of the CometBFT node.
    #[clap(long)]
    pub(crate) rpc_url: Option<Url>,

    /// Url to the websocket endpoint of the CometBFT node.
    #[clap(long)]
    pub(crate) websocket_url: Option<Url>,

    /// Interval at which the simulated ledger produces new blocks.
    #[clap(long, value_parser = humantime::parse_duration)]
    pub(crate) block_time: Option<Duration>,

    /// Make the simulated ledger omit submission positions from its inclusion reports.
    #[clap(long)]
    pub(crate) without_positions: bool,

    /// Number of blocks an announced call has to wait before it can be executed.
    #[clap(long)]
    pub(crate) announce_delay: Option<u64>,

    /// Wait for enter to be pressed after every step.
    #[clap(long)]
    pub(crate) interactive: bool,
}
