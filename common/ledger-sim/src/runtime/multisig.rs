// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use super::{error, DispatchResult, Dispatcher, Origin};
use msig_proxy_crypto::Address;
use msig_proxy_protocol::call::{CallHash, OpaqueCall, Weight};
use msig_proxy_protocol::group::{multisig_account_id, MAX_SIGNATORIES};
use msig_proxy_protocol::ledger::LedgerEvent;
use msig_proxy_protocol::Timepoint;

const MODULE: &str = "multisig";

const BASE_CALL_WEIGHT: Weight = 100_000_000;
const PER_BYTE_WEIGHT: Weight = 10_000;

/// Weight charged for dispatching the provided call.
pub(crate) fn call_weight(call: &OpaqueCall) -> Weight {
    BASE_CALL_WEIGHT + call.encoded_len() as Weight * PER_BYTE_WEIGHT
}

/// Approvals collected so far for a single call of a multisig account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMultisig {
    /// Timepoint of the extrinsic that opened the operation.
    pub when: Timepoint,
    pub depositor: Address,

    /// Sorted approving signatories.
    pub approvals: Vec<Address>,
}

impl PendingMultisig {
    fn approve(&mut self, who: Address) {
        if let Err(position) = self.approvals.binary_search(&who) {
            self.approvals.insert(position, who)
        }
    }
}

fn ensure_sorted_and_insert(
    other_signatories: &[Address],
    who: Address,
) -> Result<Vec<Address>, msig_proxy_protocol::DispatchError> {
    if other_signatories.is_empty() {
        return Err(error(MODULE, "TooFewSignatories"));
    }
    if other_signatories.len() + 1 > MAX_SIGNATORIES {
        return Err(error(MODULE, "TooManySignatories"));
    }
    if !other_signatories.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(error(MODULE, "SignatoriesOutOfOrder"));
    }
    if other_signatories.binary_search(&who).is_ok() {
        return Err(error(MODULE, "SenderInSignatories"));
    }

    let mut signatories = other_signatories.to_vec();
    let position = signatories
        .binary_search(&who)
        .unwrap_or_else(|position| position);
    signatories.insert(position, who);
    Ok(signatories)
}

// checks shared by both approval flavours; returns the multisig account
fn validate_approval(
    origin: &Origin,
    threshold: u16,
    other_signatories: &[Address],
) -> Result<Address, msig_proxy_protocol::DispatchError> {
    if threshold < 2 {
        return Err(error(MODULE, "MinimumThreshold"));
    }
    let signatories = ensure_sorted_and_insert(other_signatories, origin.who)?;
    if threshold as usize > signatories.len() {
        return Err(error(MODULE, "TooFewSignatories")
            .with_detail(format!("threshold {threshold} exceeds {} signatories", signatories.len())));
    }
    Ok(multisig_account_id(&signatories, threshold))
}

impl Dispatcher<'_> {
    fn check_timepoint(
        &self,
        existing: Option<&PendingMultisig>,
        maybe_timepoint: Option<Timepoint>,
    ) -> DispatchResult {
        match (existing, maybe_timepoint) {
            (Some(_), None) => Err(error(MODULE, "NoTimepoint")),
            (Some(pending), Some(timepoint)) if pending.when != timepoint => {
                Err(error(MODULE, "WrongTimepoint")
                    .with_detail(format!("expected {}, got {timepoint}", pending.when)))
            }
            (None, Some(_)) => Err(error(MODULE, "UnexpectedTimepoint")),
            _ => Ok(()),
        }
    }

    fn open_or_approve(
        &mut self,
        who: Address,
        multisig: Address,
        maybe_timepoint: Option<Timepoint>,
        call_hash: CallHash,
    ) -> DispatchResult {
        let key = (multisig, call_hash);
        let existing = self.state.multisigs.get(&key);
        self.check_timepoint(existing, maybe_timepoint)?;

        match self.state.multisigs.get_mut(&key) {
            Some(pending) => {
                if pending.approvals.binary_search(&who).is_ok() {
                    return Err(error(MODULE, "AlreadyApproved"));
                }
                pending.approve(who);
                let timepoint = pending.when;
                self.deposit_event(
                    LedgerEvent::new(MODULE, "MultisigApproval")
                        .with_attribute("approving", who)
                        .with_attribute("timepoint", timepoint)
                        .with_attribute("multisig", multisig)
                        .with_attribute("call_hash", call_hash),
                );
            }
            None => {
                let when = Timepoint::new(self.ctx.height, self.ctx.index);
                self.state.multisigs.insert(
                    key,
                    PendingMultisig {
                        when,
                        depositor: who,
                        approvals: vec![who],
                    },
                );
                self.deposit_event(
                    LedgerEvent::new(MODULE, "NewMultisig")
                        .with_attribute("approving", who)
                        .with_attribute("multisig", multisig)
                        .with_attribute("call_hash", call_hash),
                );
            }
        }
        Ok(())
    }

    pub(super) fn approve_as_multi(
        &mut self,
        origin: Origin,
        threshold: u16,
        other_signatories: &[Address],
        maybe_timepoint: Option<Timepoint>,
        call_hash: CallHash,
        _max_weight: Weight,
    ) -> DispatchResult {
        let multisig = validate_approval(&origin, threshold, other_signatories)?;
        self.open_or_approve(origin.who, multisig, maybe_timepoint, call_hash)
    }

    pub(super) fn as_multi(
        &mut self,
        origin: Origin,
        threshold: u16,
        other_signatories: &[Address],
        maybe_timepoint: Option<Timepoint>,
        call: &OpaqueCall,
        max_weight: Weight,
    ) -> DispatchResult {
        let multisig = validate_approval(&origin, threshold, other_signatories)?;
        let call_hash = call.hash();
        let key = (multisig, call_hash);

        let approvals = match self.state.multisigs.get(&key) {
            Some(pending) => {
                self.check_timepoint(Some(pending), maybe_timepoint)?;
                let already_approved = pending.approvals.binary_search(&origin.who).is_ok();
                pending.approvals.len() + usize::from(!already_approved)
            }
            None => 1,
        };

        if approvals < threshold as usize {
            // not enough approvals yet, this behaves exactly like an approval
            return self.open_or_approve(origin.who, multisig, maybe_timepoint, call_hash);
        }

        let weight = call_weight(call);
        if weight > max_weight {
            return Err(error(MODULE, "MaxWeightTooLow")
                .with_detail(format!("call requires {weight}, allowed {max_weight}")));
        }

        let Some(pending) = self.state.multisigs.remove(&key) else {
            return Err(error(MODULE, "NotFound"));
        };
        self.dispatch(Origin::signed(multisig), call)?;
        self.deposit_event(
            LedgerEvent::new(MODULE, "MultisigExecuted")
                .with_attribute("approving", origin.who)
                .with_attribute("timepoint", pending.when)
                .with_attribute("multisig", multisig)
                .with_attribute("call_hash", call_hash),
        );
        Ok(())
    }

    pub(super) fn as_multi_threshold_1(
        &mut self,
        origin: Origin,
        other_signatories: &[Address],
        call: &OpaqueCall,
    ) -> DispatchResult {
        let signatories = ensure_sorted_and_insert(other_signatories, origin.who)?;
        let multisig = multisig_account_id(&signatories, 1);
        self.dispatch(Origin::signed(multisig), call)
    }

    pub(super) fn cancel_as_multi(
        &mut self,
        origin: Origin,
        threshold: u16,
        other_signatories: &[Address],
        timepoint: Timepoint,
        call_hash: CallHash,
    ) -> DispatchResult {
        let multisig = validate_approval(&origin, threshold, other_signatories)?;
        let key = (multisig, call_hash);

        let Some(pending) = self.state.multisigs.get(&key) else {
            return Err(error(MODULE, "NotFound"));
        };
        if pending.when != timepoint {
            return Err(error(MODULE, "WrongTimepoint"));
        }
        if pending.depositor != origin.who {
            return Err(error(MODULE, "NotOwner"));
        }
        self.state.multisigs.remove(&key);
        self.deposit_event(
            LedgerEvent::new(MODULE, "MultisigCancelled")
                .with_attribute("cancelling", origin.who)
                .with_attribute("timepoint", timepoint)
                .with_attribute("multisig", multisig)
                .with_attribute("call_hash", call_hash),
        );
        Ok(())
    }
}
