// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! In-process ordering log for exercising the multisig proxy protocol without a live network.

mod chain;
pub mod config;
pub(crate) mod runtime;

pub use chain::{SealedBlock, SimulatedLedger};
pub use config::{SealingMode, SimulatedLedgerConfig};
pub use runtime::balances::EXISTENTIAL_DEPOSIT;
pub use runtime::proxy::{pure_account, MAX_PENDING, MAX_PROXIES};
pub use runtime::{AnnouncementRecord, PendingMultisig, ProxyDefinition, RuntimeState};
