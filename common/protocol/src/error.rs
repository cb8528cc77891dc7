// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::CallHash;
use crate::ledger::{BlockHash, DispatchError, DispatchOutcome, LedgerError};
use msig_proxy_crypto::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid threshold {threshold} for a group of {members} members (expected 2 <= threshold <= members)")]
    InvalidThreshold { threshold: u16, members: usize },

    #[error("{member} appears more than once in the multisig group")]
    DuplicateMember { member: Address },

    #[error("multisig groups are limited to {max} members, got {members}")]
    TooManyMembers { members: usize, max: usize },

    #[error("{signer} is not a member of multisig {multisig}")]
    SignerNotMember { signer: Address, multisig: Address },

    #[error("{signer} was provided more than once as a signer")]
    DuplicateSigner { signer: Address },

    #[error("multisig {multisig} requires {threshold} signers but only {provided} were provided")]
    InsufficientSigners {
        multisig: Address,
        threshold: u16,
        provided: usize,
    },

    #[error("transport failure before inclusion was observed: {source}")]
    Transport {
        #[source]
        source: LedgerError,
    },

    #[error("the ordering log refused {call} before inclusion: {reason}")]
    InvalidTransaction { call: String, reason: String },

    #[error("{call} was included in block {block_hash} (height {height}) but its dispatch failed: {detail}")]
    DispatchRejected {
        call: String,
        block_hash: BlockHash,
        height: u64,
        detail: DispatchError,
    },

    #[error("{call} got included at height {height}, but its inclusion details could not be retrieved: {source}")]
    InclusionLookupFailed {
        call: String,
        height: u64,
        block_hash: Option<BlockHash>,
        outcome: DispatchOutcome,
        #[source]
        source: LedgerError,
    },

    #[error("could not determine the position of call {call_hash} within block {block_hash}: found {matches} matching entries")]
    TimepointAmbiguous {
        block_hash: BlockHash,
        call_hash: CallHash,
        matches: usize,
    },

    #[error("the stream of new heads terminated before reaching height {target}")]
    HeadStreamClosed { target: u64 },

    #[error("expected the ledger to emit the {module}.{name} event, but it did not")]
    MissingEvent { module: String, name: String },

    #[error("event {module}.{name} carried a malformed '{attribute}' attribute: {value}")]
    MalformedEvent {
        module: String,
        name: String,
        attribute: String,
        value: String,
    },

    #[error("can't {attempted} an announcement that is currently {state}")]
    InvalidTransition {
        attempted: &'static str,
        state: &'static str,
    },

    #[error("'{raw}' is not a known proxy type")]
    UnknownProxyType { raw: String },

    #[error("failed to encode or decode a call: {source}")]
    MalformedCall {
        #[from]
        source: bincode::Error,
    },
}

impl ProtocolError {
    pub fn from_ledger(call: impl Into<String>, err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidTransaction { reason } => ProtocolError::InvalidTransaction {
                call: call.into(),
                reason,
            },
            LedgerError::InclusionUnresolved {
                height,
                outcome,
                source,
            } => ProtocolError::InclusionLookupFailed {
                call: call.into(),
                height,
                block_hash: None,
                outcome,
                source: *source,
            },
            source => ProtocolError::Transport { source },
        }
    }

    /// Returns the ledger dispatch error, if the failure was a logical rejection.
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        match self {
            ProtocolError::DispatchRejected { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ProtocolError::Transport { .. })
    }

    /// Whether the failed submission is nonetheless part of the ordering log.
    pub fn was_included(&self) -> bool {
        matches!(
            self,
            ProtocolError::DispatchRejected { .. }
                | ProtocolError::InclusionLookupFailed { .. }
                | ProtocolError::TimepointAmbiguous { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_inclusions_are_not_transport_failures() {
        let err = ProtocolError::from_ledger(
            "staking.bond",
            LedgerError::InclusionUnresolved {
                height: 42,
                outcome: DispatchOutcome::Failed(DispatchError::new("staking", "AlreadyBonded")),
                source: Box::new(LedgerError::transport("connection reset")),
            },
        );

        assert!(!err.is_transport());
        assert!(err.was_included());
        let ProtocolError::InclusionLookupFailed {
            height, outcome, ..
        } = err
        else {
            panic!("unexpected error: {err}")
        };
        assert_eq!(height, 42);
        assert!(!outcome.is_applied());
    }

    #[test]
    fn transport_failures_were_never_included() {
        let err = ProtocolError::from_ledger("staking.bond", LedgerError::transport("timeout"));
        assert!(err.is_transport());
        assert!(!err.was_included());
    }
}
