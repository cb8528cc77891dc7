// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! Multisig coordinated announce, delay and execute protocol for proxied accounts.
//!
//! A threshold group of key holders jointly announces an action on behalf of a proxied account,
//! waits out the announcement delay and finally executes it, while an independent cancellation
//! group may reject the announcement at any point before execution.

pub mod call;
pub mod coordinator;
pub mod delay;
pub mod error;
pub mod extrinsic;
pub mod gate;
pub mod group;
pub mod ledger;
pub mod provisioning;
pub mod submitter;
pub mod timepoint;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use call::{CallHash, OpaqueCall, ProxyType, RuntimeCall};
pub use coordinator::MultisigCoordinator;
pub use delay::DelayWaiter;
pub use error::ProtocolError;
pub use extrinsic::SignedExtrinsic;
pub use gate::{NoPacing, StepGate};
pub use group::{derive, MultisigGroup};
pub use ledger::{
    BlockContents, BlockHash, DispatchError, DispatchOutcome, HeadStream, InclusionReport,
    LedgerError, LedgerEvent, OrderingLog,
};
pub use provisioning::Provisioner;
pub use submitter::{CallSubmitter, Submission};
pub use timepoint::Timepoint;
pub use workflow::{Announcement, AnnouncementState, DelayedProxyWorkflow, ProxyDelegate, WorkflowConfig};

pub use msig_proxy_crypto as crypto;
