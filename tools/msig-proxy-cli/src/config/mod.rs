// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::config::r#override::ConfigOverride;
use crate::config::template::CONFIG_TEMPLATE;
use crate::error::MsigProxyCliError;
use msig_proxy_config::{
    must_get_home, read_config_from_toml_file, save_formatted_config_to_file, ConfigTemplate,
    DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME, MSIG_PROXY_DIR,
};
use msig_proxy_ledger_sim::{SealingMode, SimulatedLedgerConfig};
use msig_proxy_protocol::coordinator::DEFAULT_MAX_WEIGHT;
use msig_proxy_protocol::workflow::{DEFAULT_ANNOUNCE_DELAY, DEFAULT_FUNDING_AMOUNT};
use msig_proxy_protocol::WorkflowConfig;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub mod r#override;
mod template;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:26657";
const DEFAULT_WEBSOCKET_URL: &str = "ws://127.0.0.1:26657/websocket";
const DEFAULT_BLOCK_TIME: Duration = Duration::from_secs(1);

/// Get default path to the config directory.
/// It should get resolved to `$HOME/.msig-proxy/config`
pub fn default_config_directory() -> PathBuf {
    must_get_home().join(MSIG_PROXY_DIR).join(DEFAULT_CONFIG_DIR)
}

/// Get default path to the config file.
/// It should get resolved to `$HOME/.msig-proxy/config/config.toml`
pub fn default_config_filepath() -> PathBuf {
    default_config_directory().join(DEFAULT_CONFIG_FILENAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    /// In-process ledger, useful for trying the protocol out without any infrastructure.
    Simulated,

    /// CometBFT node running the multisig and proxy modules.
    Comet,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    // additional metadata holding on-disk location of this config file
    #[serde(skip)]
    pub(crate) save_path: Option<PathBuf>,

    pub ledger: Ledger,

    pub simulated: Simulated,

    pub protocol: Protocol,

    pub groups: Groups,

    pub pacing: Pacing,
}

impl ConfigTemplate for Config {
    fn template(&self) -> &'static str {
        CONFIG_TEMPLATE
    }
}

impl Config {
    pub fn ensure_is_valid(&self) -> Result<(), MsigProxyCliError> {
        if self.simulated.block_time.is_zero() {
            return Err(MsigProxyCliError::InvalidConfig {
                reason: "the simulated block time has to be non-zero".to_string(),
            });
        }
        self.groups.ensure_is_valid()
    }

    pub fn r#override<O: ConfigOverride>(&mut self, r#override: O) {
        r#override.override_config(self)
    }

    #[must_use]
    pub fn with_override<O: ConfigOverride>(mut self, r#override: O) -> Self {
        self.r#override(r#override);
        self
    }

    pub fn workflow(&self) -> WorkflowConfig {
        WorkflowConfig {
            max_weight: self.protocol.max_weight,
            funding_amount: u128::from(self.protocol.funding_amount),
            announce_delay: self.protocol.announce_delay,
        }
    }

    pub fn simulated_ledger(&self) -> SimulatedLedgerConfig {
        let config = SimulatedLedgerConfig::default()
            .with_sealing(SealingMode::Interval(self.simulated.block_time))
            .with_genesis_height(self.simulated.genesis_height);
        if self.simulated.report_positions {
            config
        } else {
            config.without_positions()
        }
    }

    // simple wrapper that reads config file and assigns path location
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, MsigProxyCliError> {
        let path = path.as_ref();
        let mut loaded: Config = read_config_from_toml_file(path).map_err(|source| {
            MsigProxyCliError::ConfigLoadFailure {
                path: path.to_path_buf(),
                source,
            }
        })?;
        loaded.ensure_is_valid()?;
        loaded.save_path = Some(path.to_path_buf());
        debug!("loaded config file from {}", path.display());
        Ok(loaded)
    }

    pub fn read_from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, MsigProxyCliError> {
        Self::read_from_path(path)
    }

    pub fn default_location() -> PathBuf {
        default_config_filepath()
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        save_formatted_config_to_file(self, path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ledger {
    /// Ordering log the scenario runs against.
    pub backend: LedgerBackend,

    /// Url to the rpc endpoint of the CometBFT node, used by the `comet` backend.
    pub rpc_url: Url,

    /// Url to the websocket endpoint of the CometBFT node, used by the `comet` backend.
    pub websocket_url: Url,
}

impl Default for Ledger {
    // the literals are valid urls
    #[allow(clippy::unwrap_used)]
    fn default() -> Self {
        Ledger {
            backend: LedgerBackend::Simulated,
            rpc_url: DEFAULT_RPC_URL.parse().unwrap(),
            websocket_url: DEFAULT_WEBSOCKET_URL.parse().unwrap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Simulated {
    /// Interval at which the simulated ledger produces new blocks.
    #[serde(with = "humantime_serde")]
    pub block_time: Duration,

    /// Whether inclusion reports tell the position of the submission within its block.
    pub report_positions: bool,

    pub genesis_height: u64,
}

impl Default for Simulated {
    fn default() -> Self {
        Simulated {
            block_time: DEFAULT_BLOCK_TIME,
            report_positions: true,
            genesis_height: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Protocol {
    pub max_weight: u64,

    // toml integers are signed 64-bit
    pub funding_amount: u64,

    /// Number of blocks between an announcement and the earliest execution.
    pub announce_delay: u64,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol {
            max_weight: DEFAULT_MAX_WEIGHT,
            funding_amount: DEFAULT_FUNDING_AMOUNT as u64,
            announce_delay: DEFAULT_ANNOUNCE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Groups {
    /// Key that spawns the pure proxy account and remains its `Any` proxy.
    pub spawner: String,

    /// Key that funds the pure proxy account and both multisig accounts.
    pub funder: String,

    pub staking: Group,

    pub cancellation: Group,
}

impl Groups {
    fn ensure_is_valid(&self) -> Result<(), MsigProxyCliError> {
        self.staking.ensure_is_valid("staking")?;
        self.cancellation.ensure_is_valid("cancellation")?;
        if self.staking.threshold < 2 {
            return Err(MsigProxyCliError::InvalidConfig {
                reason: "the staking group needs a threshold of at least 2".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Groups {
    fn default() -> Self {
        let uris = |names: &[&str]| names.iter().map(|name| format!("//{name}")).collect();
        Groups {
            spawner: "//Eve".to_string(),
            funder: "//Ferdie".to_string(),
            staking: Group {
                members: uris(&["Alice", "Dave", "Bob"]),
                threshold: 2,
                signers: uris(&["Alice", "Bob"]),
            },
            cancellation: Group {
                members: uris(&["Charlie", "Dave", "Ferdie"]),
                threshold: 1,
                signers: uris(&["Charlie"]),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Group {
    /// Development key uris of every member, e.g. `//Alice`.
    pub members: Vec<String>,

    pub threshold: u16,

    /// Members that sign on behalf of the group during the scenario, in signing order.
    pub signers: Vec<String>,
}

impl Group {
    fn ensure_is_valid(&self, group: &'static str) -> Result<(), MsigProxyCliError> {
        if let Some(signer) = self
            .signers
            .iter()
            .find(|signer| !self.members.contains(signer))
        {
            return Err(MsigProxyCliError::SignerOutsideGroup {
                signer: signer.clone(),
                group,
            });
        }
        if self.signers.len() < usize::from(self.threshold) {
            return Err(MsigProxyCliError::InvalidConfig {
                reason: format!(
                    "the {group} group has a threshold of {} but only {} signers",
                    self.threshold,
                    self.signers.len()
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Pacing {
    /// Wait for the operator to press enter after every step.
    pub interactive: bool,
}
