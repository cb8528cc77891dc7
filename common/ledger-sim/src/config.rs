// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use msig_proxy_crypto::Address;
use msig_proxy_protocol::call::Balance;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SealingMode {
    /// Every accepted submission is immediately sealed into its own block.
    #[default]
    Instant,

    /// Submissions wait in the pool until [`SimulatedLedger::seal_block`](crate::SimulatedLedger::seal_block) is called.
    Manual,

    /// A background task seals a block every `block_time`.
    Interval(Duration),
}

#[derive(Debug, Clone)]
pub struct SimulatedLedgerConfig {
    pub sealing: SealingMode,

    /// Height of the genesis block. The first sealed block is at `genesis_height + 1`.
    pub genesis_height: u64,

    /// Whether inclusion reports carry the position of the submission within its block.
    /// Without them, submitters have to fall back to scanning the block.
    pub report_positions: bool,

    pub endowed_accounts: Vec<(Address, Balance)>,
}

impl Default for SimulatedLedgerConfig {
    fn default() -> Self {
        SimulatedLedgerConfig {
            sealing: SealingMode::Instant,
            genesis_height: 0,
            report_positions: true,
            endowed_accounts: Vec::new(),
        }
    }
}

impl SimulatedLedgerConfig {
    #[must_use]
    pub fn with_sealing(mut self, sealing: SealingMode) -> Self {
        self.sealing = sealing;
        self
    }

    #[must_use]
    pub fn with_genesis_height(mut self, genesis_height: u64) -> Self {
        self.genesis_height = genesis_height;
        self
    }

    #[must_use]
    pub fn without_positions(mut self) -> Self {
        self.report_positions = false;
        self
    }

    #[must_use]
    pub fn with_endowment(mut self, account: Address, amount: Balance) -> Self {
        self.endowed_accounts.push((account, amount));
        self
    }
}
