// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ConfigOverridableArgs;
use crate::config::{Config, LedgerBackend};
use crate::error::MsigProxyCliError;
use crate::keys::Parties;
use crate::pacing::EnterToContinue;
use crate::scenario::{Scenario, ScenarioReport};
use msig_proxy_comet_ledger::CometLedger;
use msig_proxy_ledger_sim::SimulatedLedger;
use msig_proxy_protocol::{NoPacing, StepGate};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

// development accounts that pay for everything on the simulated ledger
const SIMULATED_ENDOWMENT: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    #[command(flatten)]
    config_override: ConfigOverridableArgs,

    /// Specifies custom location for the configuration file.
    /// If the file does not exist, the default configuration is used instead.
    #[clap(long)]
    custom_config_path: Option<PathBuf>,
}

fn load_config(args: Args) -> Result<Config, MsigProxyCliError> {
    let path = args
        .custom_config_path
        .unwrap_or_else(Config::default_location);

    let config = if path.exists() {
        Config::read_from_toml_file(&path)?
    } else {
        info!(
            "there's no config file at {}, using the default configuration",
            path.display()
        );
        Config::default()
    };

    let config = config.with_override(args.config_override);
    config.ensure_is_valid()?;
    Ok(config)
}

pub(crate) async fn execute(args: Args) -> Result<(), MsigProxyCliError> {
    let config = load_config(args)?;
    let parties = Parties::from_config(&config.groups)?;
    let gate: Arc<dyn StepGate> = if config.pacing.interactive {
        Arc::new(EnterToContinue::new())
    } else {
        Arc::new(NoPacing)
    };

    let report = match config.ledger.backend {
        LedgerBackend::Simulated => {
            info!(
                "running against a simulated ledger producing a block every {}",
                humantime::format_duration(config.simulated.block_time)
            );
            let ledger = SimulatedLedger::new(
                config
                    .simulated_ledger()
                    .with_endowment(parties.spawner.address(), SIMULATED_ENDOWMENT)
                    .with_endowment(parties.funder.address(), SIMULATED_ENDOWMENT),
            );
            let result = Scenario::new(ledger.clone(), config.workflow(), parties, gate)
                .run()
                .await;
            ledger.shutdown();
            result?
        }
        LedgerBackend::Comet => {
            info!("running against the CometBFT node at {}", config.ledger.rpc_url);
            let ledger = Arc::new(CometLedger::new(
                &config.ledger.rpc_url,
                config.ledger.websocket_url.clone(),
            )?);
            let result = Scenario::new(ledger.clone(), config.workflow(), parties, gate)
                .run()
                .await;
            ledger.shutdown();
            result?
        }
    };

    print_report(&report);
    Ok(())
}

fn print_report(report: &ScenarioReport) {
    println!("{report}")
}
