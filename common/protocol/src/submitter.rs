// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{OpaqueCall, RuntimeCall};
use crate::error::ProtocolError;
use crate::extrinsic::SignedExtrinsic;
use crate::ledger::{BlockHash, DispatchOutcome, InclusionReport, LedgerEvent, OrderingLog};
use crate::timepoint::Timepoint;
use msig_proxy_crypto::KeyPair;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Successful, included and applied submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub block_hash: BlockHash,
    pub timepoint: Timepoint,
    pub events: Vec<LedgerEvent>,
}

impl Submission {
    pub fn find_event(&self, module: &str, name: &str) -> Option<&LedgerEvent> {
        self.events.iter().find(|event| event.is(module, name))
    }
}

/// Signs single calls, hands them over to the ordering log and waits for their terminal outcome.
///
/// Submissions are never retried: every call to [`CallSubmitter::submit`] uses a freshly obtained nonce.
pub struct CallSubmitter<L> {
    ledger: Arc<L>,
}

impl<L> Clone for CallSubmitter<L> {
    fn clone(&self) -> Self {
        CallSubmitter {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L> CallSubmitter<L>
where
    L: OrderingLog,
{
    pub fn new(ledger: Arc<L>) -> Self {
        CallSubmitter { ledger }
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub async fn submit_call(
        &self,
        signer: &KeyPair,
        call: &RuntimeCall,
    ) -> Result<Submission, ProtocolError> {
        self.submit(signer, &call.to_opaque()?).await
    }

    #[instrument(skip_all, fields(signer = %signer.name(), call = %call.describe()))]
    pub async fn submit(
        &self,
        signer: &KeyPair,
        call: &OpaqueCall,
    ) -> Result<Submission, ProtocolError> {
        let description = call.describe();

        let nonce = self
            .ledger
            .next_nonce(signer.address())
            .await
            .map_err(|err| ProtocolError::from_ledger(&description, err))?;

        let extrinsic = SignedExtrinsic::sign(signer, nonce, call.clone());
        debug!(
            "submitting {description} ({}) with nonce {nonce}",
            call.hash()
        );

        let report = self
            .ledger
            .submit_signed(extrinsic)
            .await
            .map_err(|err| ProtocolError::from_ledger(&description, err))?;

        info!(
            "{description} got included in block {} at height {}",
            report.block_hash, report.height
        );
        for event in &report.events {
            info!("\t{event}");
        }

        if let DispatchOutcome::Failed(detail) = report.outcome {
            warn!("{description} failed to dispatch: {detail}");
            return Err(ProtocolError::DispatchRejected {
                call: description,
                block_hash: report.block_hash,
                height: report.height,
                detail,
            });
        }

        let timepoint = self.resolve_timepoint(&report, call, &description).await?;
        info!("{description} is at timepoint {timepoint}");

        Ok(Submission {
            block_hash: report.block_hash,
            timepoint,
            events: report.events,
        })
    }

    async fn resolve_timepoint(
        &self,
        report: &InclusionReport,
        call: &OpaqueCall,
        description: &str,
    ) -> Result<Timepoint, ProtocolError> {
        if let Some(index) = report.position {
            return Ok(Timepoint::new(report.height, index));
        }

        // if the same call got included more than once in this block there's no telling which one is ours
        warn!(
            "the ordering log did not report the position of our submission; scanning block {} instead",
            report.block_hash
        );
        let block = self
            .ledger
            .block_by_hash(report.block_hash)
            .await
            .map_err(|source| ProtocolError::InclusionLookupFailed {
                call: description.to_string(),
                height: report.height,
                block_hash: Some(report.block_hash),
                outcome: report.outcome.clone(),
                source,
            })?;

        let call_hash = call.hash();
        match block.positions_of(&call_hash).as_slice() {
            [index] => Ok(Timepoint::new(block.height, *index)),
            matches => Err(ProtocolError::TimepointAmbiguous {
                block_hash: report.block_hash,
                call_hash,
                matches: matches.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DispatchError, LedgerError};
    use crate::test_helpers::{ScriptedLedger, ScriptedResponse};

    fn remark(content: u8) -> OpaqueCall {
        RuntimeCall::opaque("system", "remark", vec![content])
            .to_opaque()
            .unwrap()
    }

    #[tokio::test]
    async fn reported_position_becomes_the_timepoint() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::included(100, Some(3)));

        let submitter = CallSubmitter::new(ledger.clone());
        let alice = KeyPair::from_dev_uri("//Alice");

        let submission = submitter.submit(&alice, &remark(1)).await.unwrap();
        assert_eq!(submission.timepoint, Timepoint::new(100, 3));

        let submitted = ledger.submitted();
        assert_eq!(submitted.len(), 1);
        assert!(submitted[0].verify());
        assert_eq!(submitted[0].sender(), alice.address());
    }

    #[tokio::test]
    async fn every_submission_uses_a_fresh_nonce() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::included(10, Some(0)));
        ledger.push(ScriptedResponse::included(11, Some(0)));

        let submitter = CallSubmitter::new(ledger.clone());
        let alice = KeyPair::from_dev_uri("//Alice");
        submitter.submit(&alice, &remark(1)).await.unwrap();
        submitter.submit(&alice, &remark(2)).await.unwrap();

        let nonces: Vec<_> = ledger.submitted().iter().map(|ext| ext.nonce).collect();
        assert_eq!(nonces, vec![0, 1]);
    }

    #[tokio::test]
    async fn hash_scan_is_used_without_a_reported_position() {
        let ledger = Arc::new(ScriptedLedger::new());
        let call = remark(1);
        ledger.push(ScriptedResponse::included(50, None).with_block_calls(vec![
            remark(9).hash(),
            call.hash(),
        ]));

        let submitter = CallSubmitter::new(ledger);
        let alice = KeyPair::from_dev_uri("//Alice");
        let submission = submitter.submit(&alice, &call).await.unwrap();
        assert_eq!(submission.timepoint, Timepoint::new(50, 1));
    }

    #[tokio::test]
    async fn identical_calls_in_one_block_are_ambiguous() {
        let ledger = Arc::new(ScriptedLedger::new());
        let call = remark(1);
        ledger.push(
            ScriptedResponse::included(50, None).with_block_calls(vec![call.hash(), call.hash()]),
        );

        let submitter = CallSubmitter::new(ledger);
        let alice = KeyPair::from_dev_uri("//Alice");
        let err = submitter.submit(&alice, &call).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TimepointAmbiguous { matches: 2, .. }
        ));
    }

    #[tokio::test]
    async fn missing_call_in_block_is_ambiguous() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::included(50, None).with_block_calls(vec![remark(2).hash()]));

        let submitter = CallSubmitter::new(ledger);
        let alice = KeyPair::from_dev_uri("//Alice");
        let err = submitter.submit(&alice, &remark(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::TimepointAmbiguous { matches: 0, .. }
        ));
    }

    #[tokio::test]
    async fn dispatch_failures_are_surfaced_verbatim() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::rejected(
            70,
            DispatchError::new("proxy", "Unannounced"),
        ));

        let submitter = CallSubmitter::new(ledger);
        let alice = KeyPair::from_dev_uri("//Alice");
        let err = submitter.submit(&alice, &remark(1)).await.unwrap_err();
        let ProtocolError::DispatchRejected { height, detail, .. } = err else {
            panic!("unexpected error: {err}")
        };
        assert_eq!(height, 70);
        assert!(detail.is("proxy", "Unannounced"));
    }

    #[tokio::test]
    async fn transport_and_pool_failures_are_distinguished() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::TransportFailure);
        ledger.push(ScriptedResponse::RefusedByPool("stale nonce".into()));

        let submitter = CallSubmitter::new(ledger);
        let alice = KeyPair::from_dev_uri("//Alice");

        let err = submitter.submit(&alice, &remark(1)).await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Transport {
                source: LedgerError::Transport { .. }
            }
        ));

        let err = submitter.submit(&alice, &remark(1)).await.unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidTransaction { reason, .. } if reason == "stale nonce"));
    }

    #[tokio::test]
    async fn failed_block_lookup_after_inclusion_is_not_a_transport_failure() {
        let ledger = Arc::new(ScriptedLedger::new());
        ledger.push(ScriptedResponse::included(100, None));
        ledger.fail_block_queries();

        let submitter = CallSubmitter::new(ledger.clone());
        let alice = KeyPair::from_dev_uri("//Alice");
        let err = submitter.submit(&alice, &remark(1)).await.unwrap_err();

        assert!(!err.is_transport());
        assert!(err.was_included());
        let ProtocolError::InclusionLookupFailed {
            height,
            block_hash,
            outcome,
            source,
            ..
        } = err
        else {
            panic!("unexpected error: {err}")
        };
        assert_eq!(height, 100);
        assert!(block_hash.is_some());
        assert!(outcome.is_applied());
        assert!(matches!(source, LedgerError::Transport { .. }));

        // the submission must not have been repeated
        assert_eq!(ledger.submitted().len(), 1);
    }
}
