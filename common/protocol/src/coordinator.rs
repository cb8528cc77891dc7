// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{MultisigCall, OpaqueCall, RuntimeCall, Weight};
use crate::error::ProtocolError;
use crate::gate::{NoPacing, StepGate};
use crate::group::MultisigGroup;
use crate::ledger::OrderingLog;
use crate::submitter::{CallSubmitter, Submission};
use crate::timepoint::Timepoint;
use msig_proxy_crypto::KeyPair;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const DEFAULT_MAX_WEIGHT: Weight = 1_000_000_000_000;

// state of a single multisig operation; lives only for the duration of `execute`
struct PendingMultisigOp<'a> {
    call: &'a OpaqueCall,
    group: &'a MultisigGroup,
    approvals_submitted: u16,
    first_timepoint: Option<Timepoint>,
}

impl<'a> PendingMultisigOp<'a> {
    fn new(group: &'a MultisigGroup, call: &'a OpaqueCall) -> Self {
        PendingMultisigOp {
            call,
            group,
            approvals_submitted: 0,
            first_timepoint: None,
        }
    }

    fn record_approval(&mut self, timepoint: Timepoint) {
        if self.first_timepoint.is_none() {
            self.first_timepoint = Some(timepoint)
        }
        self.approvals_submitted += 1;
    }
}

/// Turns a single logical call of a multisig account into the sequence of approvals
/// and the final execution required by the ledger.
pub struct MultisigCoordinator<L> {
    submitter: CallSubmitter<L>,
    max_weight: Weight,
    gate: Arc<dyn StepGate>,
}

impl<L> MultisigCoordinator<L>
where
    L: OrderingLog,
{
    pub fn new(submitter: CallSubmitter<L>, max_weight: Weight) -> Self {
        MultisigCoordinator {
            submitter,
            max_weight,
            gate: Arc::new(NoPacing),
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn StepGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn submitter(&self) -> &CallSubmitter<L> {
        &self.submitter
    }

    pub async fn execute_call(
        &self,
        group: &MultisigGroup,
        signers: &[&KeyPair],
        call: &RuntimeCall,
    ) -> Result<Timepoint, ProtocolError> {
        self.execute(group, signers, &call.to_opaque()?).await
    }

    /// Executes `call` on behalf of the group's account using the first `threshold` signers.
    ///
    /// Returns the timepoint of the final, executing submission.
    /// Any failure aborts the remaining rounds; approvals that already got included are left on the ledger.
    #[instrument(skip_all, fields(multisig = %group, call = %call.describe()))]
    pub async fn execute(
        &self,
        group: &MultisigGroup,
        signers: &[&KeyPair],
        call: &OpaqueCall,
    ) -> Result<Timepoint, ProtocolError> {
        let signers = self.select_signers(group, signers)?;

        if group.threshold() == 1 {
            let submission = self.execute_single(group, signers[0], call).await?;
            return Ok(submission.timepoint);
        }

        let mut op = PendingMultisigOp::new(group, call);
        let (approvers, executor) = signers.split_at(signers.len() - 1);

        for approver in approvers {
            let timepoint = self.approve(&op, approver).await?;
            op.record_approval(timepoint);
            self.gate
                .proceed(&format!(
                    "approval {}/{} of {}",
                    op.approvals_submitted,
                    group.threshold() - 1,
                    call.describe()
                ))
                .await;
        }

        let timepoint = self.finalise(&op, executor[0]).await?;
        self.gate
            .proceed(&format!("execution of {}", call.describe()))
            .await;
        Ok(timepoint)
    }

    fn select_signers<'k>(
        &self,
        group: &MultisigGroup,
        signers: &[&'k KeyPair],
    ) -> Result<Vec<&'k KeyPair>, ProtocolError> {
        let threshold = group.threshold() as usize;
        if signers.len() < threshold {
            return Err(ProtocolError::InsufficientSigners {
                multisig: group.address(),
                threshold: group.threshold(),
                provided: signers.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(threshold);
        for signer in signers.iter().take(threshold) {
            let address = signer.address();
            if !group.contains(&address) {
                return Err(ProtocolError::SignerNotMember {
                    signer: address,
                    multisig: group.address(),
                });
            }
            if !seen.insert(address) {
                return Err(ProtocolError::DuplicateSigner { signer: address });
            }
            selected.push(*signer);
        }
        Ok(selected)
    }

    async fn execute_single(
        &self,
        group: &MultisigGroup,
        signer: &KeyPair,
        call: &OpaqueCall,
    ) -> Result<Submission, ProtocolError> {
        info!(
            "{} executes {} directly on behalf of {}",
            signer.name(),
            call.describe(),
            group.address()
        );
        let wrapped = RuntimeCall::Multisig(MultisigCall::AsMultiThreshold1 {
            other_signatories: group.other_signatories(&signer.address())?,
            call: call.clone(),
        });
        let submission = self.submitter.submit_call(signer, &wrapped).await?;
        self.gate
            .proceed(&format!("execution of {}", call.describe()))
            .await;
        Ok(submission)
    }

    async fn approve(
        &self,
        op: &PendingMultisigOp<'_>,
        signer: &KeyPair,
    ) -> Result<Timepoint, ProtocolError> {
        let call_hash = op.call.hash();
        debug!(
            "{} approves {call_hash} (round {}, referencing {:?})",
            signer.name(),
            op.approvals_submitted,
            op.first_timepoint
        );

        let approval = RuntimeCall::Multisig(MultisigCall::ApproveAsMulti {
            threshold: op.group.threshold(),
            other_signatories: op.group.other_signatories(&signer.address())?,
            maybe_timepoint: op.first_timepoint,
            call_hash,
            max_weight: self.max_weight,
        });
        let submission = self.submitter.submit_call(signer, &approval).await?;
        Ok(submission.timepoint)
    }

    async fn finalise(
        &self,
        op: &PendingMultisigOp<'_>,
        signer: &KeyPair,
    ) -> Result<Timepoint, ProtocolError> {
        info!(
            "{} executes {} after {} approval(s) first included at {:?}",
            signer.name(),
            op.call.describe(),
            op.approvals_submitted,
            op.first_timepoint
        );

        let execution = RuntimeCall::Multisig(MultisigCall::AsMulti {
            threshold: op.group.threshold(),
            other_signatories: op.group.other_signatories(&signer.address())?,
            maybe_timepoint: op.first_timepoint,
            call: op.call.clone(),
            store_call: false,
            max_weight: self.max_weight,
        });
        let submission = self.submitter.submit_call(signer, &execution).await?;
        Ok(submission.timepoint)
    }
}
