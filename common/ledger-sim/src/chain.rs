// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::config::{SealingMode, SimulatedLedgerConfig};
use crate::runtime::{apply_extrinsic, ExtrinsicContext, RuntimeState};
use async_trait::async_trait;
use futures::{stream, StreamExt};
use msig_proxy_crypto::{Address, ContentHash};
use msig_proxy_protocol::ledger::{
    BlockContents, BlockHash, HeadStream, InclusionReport, LedgerError, OrderingLog,
};
use msig_proxy_protocol::SignedExtrinsic;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::time::Instant;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

const BLOCK_DOMAIN: &[u8] = b"msig-proxy/block";
const HEADS_CHANNEL_CAPACITY: usize = 64;

type InclusionResponder = oneshot::Sender<Result<InclusionReport, LedgerError>>;

struct PendingSubmission {
    extrinsic: SignedExtrinsic,
    responder: InclusionResponder,
}

struct ChainState {
    runtime: RuntimeState,
    height: u64,
    best_hash: BlockHash,
    blocks: HashMap<BlockHash, BlockContents>,
    pool: Vec<PendingSubmission>,
}

impl ChainState {
    fn pending_from(&self, account: &Address) -> u64 {
        self.pool
            .iter()
            .filter(|pending| pending.extrinsic.sender() == *account)
            .count() as u64
    }
}

fn block_hash(parent: &BlockHash, height: u64, extrinsics: &[PendingSubmission]) -> BlockHash {
    let height = height.to_le_bytes();
    let signatures: Vec<_> = extrinsics
        .iter()
        .map(|pending| pending.extrinsic.signature.to_bytes())
        .collect();

    let chunks = [parent.as_bytes().as_slice(), height.as_slice()]
        .into_iter()
        .chain(signatures.iter().map(|signature| signature.as_slice()));
    ContentHash::digest_with_domain(BLOCK_DOMAIN, chunks)
}

/// Header of a freshly sealed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealedBlock {
    pub hash: BlockHash,
    pub height: u64,
    pub extrinsics: usize,
}

/// In-process ordering log applying the multisig, proxy, balances and utility rules.
pub struct SimulatedLedger {
    config: SimulatedLedgerConfig,
    state: Mutex<ChainState>,
    heads: broadcast::Sender<u64>,
    cancel: CancellationToken,
}

impl SimulatedLedger {
    /// Creates the ledger, starting background block authoring if configured to do so.
    /// In that case this has to be called from within a tokio runtime.
    pub fn new(config: SimulatedLedgerConfig) -> Arc<Self> {
        let genesis_height = config.genesis_height;
        let genesis_hash = ContentHash::digest_with_domain(
            BLOCK_DOMAIN,
            [b"genesis".as_slice(), genesis_height.to_le_bytes().as_slice()],
        );
        let genesis = BlockContents {
            hash: genesis_hash,
            height: genesis_height,
            call_hashes: Vec::new(),
        };

        let state = ChainState {
            runtime: RuntimeState::with_endowments(config.endowed_accounts.iter().copied()),
            height: genesis_height,
            best_hash: genesis_hash,
            blocks: HashMap::from([(genesis_hash, genesis)]),
            pool: Vec::new(),
        };

        let (heads, _) = broadcast::channel(HEADS_CHANNEL_CAPACITY);
        let sealing = config.sealing;
        let ledger = Arc::new(SimulatedLedger {
            config,
            state: Mutex::new(state),
            heads,
            cancel: CancellationToken::new(),
        });

        if let SealingMode::Interval(block_time) = sealing {
            tokio::spawn(author_blocks(
                Arc::downgrade(&ledger),
                block_time,
                ledger.cancel.clone(),
            ));
        }
        ledger
    }

    /// Stops background block authoring. Submissions still waiting in the pool are never included.
    pub fn shutdown(&self) {
        self.cancel.cancel()
    }

    pub fn sealing_mode(&self) -> SealingMode {
        self.config.sealing
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pool.len()
    }

    pub async fn best_block(&self) -> (u64, BlockHash) {
        let state = self.state.lock().await;
        (state.height, state.best_hash)
    }

    /// Runs the closure against the current ledger state.
    pub async fn inspect<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RuntimeState) -> R,
    {
        f(&self.state.lock().await.runtime)
    }

    /// Seals every pooled submission into a new block and notifies the waiting submitters.
    pub async fn seal_block(&self) -> SealedBlock {
        let mut state = self.state.lock().await;
        let height = state.height + 1;
        let pool = std::mem::take(&mut state.pool);

        let mut call_hashes = Vec::with_capacity(pool.len());
        let mut receipts = Vec::with_capacity(pool.len());
        for (index, pending) in pool.iter().enumerate() {
            let ctx = ExtrinsicContext {
                height,
                index: index as u32,
            };
            receipts.push(apply_extrinsic(&mut state.runtime, ctx, &pending.extrinsic));
            call_hashes.push(pending.extrinsic.call_hash());
        }

        let hash = block_hash(&state.best_hash, height, &pool);
        state.blocks.insert(
            hash,
            BlockContents {
                hash,
                height,
                call_hashes,
            },
        );
        state.height = height;
        state.best_hash = hash;

        let extrinsics = pool.len();
        info!("sealed block {height} ({hash}) with {extrinsics} extrinsic(s)");

        for (index, (pending, receipt)) in pool.into_iter().zip(receipts).enumerate() {
            let report = InclusionReport {
                block_hash: hash,
                height,
                position: self.config.report_positions.then_some(index as u32),
                outcome: receipt.outcome,
                events: receipt.events,
            };
            if pending.responder.send(Ok(report)).is_err() {
                debug!("the submitter of extrinsic {index} in block {height} is no longer waiting");
            }
        }

        // no subscribers is fine
        let _ = self.heads.send(height);

        SealedBlock {
            hash,
            height,
            extrinsics,
        }
    }

    /// Seals `n` blocks, returning the resulting best height.
    pub async fn produce_blocks(&self, n: u64) -> u64 {
        let mut height = self.best_block().await.0;
        for _ in 0..n {
            height = self.seal_block().await.height;
        }
        height
    }
}

impl Drop for SimulatedLedger {
    fn drop(&mut self) {
        self.cancel.cancel()
    }
}

async fn author_blocks(ledger: Weak<SimulatedLedger>, block_time: Duration, cancel: CancellationToken) {
    info!("starting block authoring with block time of {block_time:?}");
    let mut interval = tokio::time::interval_at(Instant::now() + block_time, block_time);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!("block authoring: received shutdown");
                break;
            }
            _ = interval.tick() => {
                let Some(ledger) = ledger.upgrade() else {
                    break;
                };
                ledger.seal_block().await;
            }
        }
    }
    debug!("block authoring: exiting");
}

#[async_trait]
impl OrderingLog for SimulatedLedger {
    async fn submit_signed(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<InclusionReport, LedgerError> {
        if !extrinsic.verify() {
            return Err(LedgerError::invalid_transaction("bad signature"));
        }
        if let Err(err) = extrinsic.call.decode() {
            return Err(LedgerError::invalid_transaction(format!(
                "undecodable call: {err}"
            )));
        }

        let (responder, inclusion) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            let sender = extrinsic.sender();
            let expected = state.runtime.nonce(&sender) + state.pending_from(&sender);
            match extrinsic.nonce.cmp(&expected) {
                Ordering::Less => {
                    return Err(LedgerError::invalid_transaction(format!(
                        "stale nonce {} (expected {expected})",
                        extrinsic.nonce
                    )))
                }
                Ordering::Greater => {
                    return Err(LedgerError::invalid_transaction(format!(
                        "future nonce {} (expected {expected})",
                        extrinsic.nonce
                    )))
                }
                Ordering::Equal => {}
            }
            trace!("accepted {} from {sender} into the pool", extrinsic.call.describe());
            state.pool.push(PendingSubmission {
                extrinsic,
                responder,
            });
        }

        if self.config.sealing == SealingMode::Instant {
            self.seal_block().await;
        }

        inclusion.await.map_err(|_| {
            warn!("the simulated ledger shut down with our submission still pending");
            LedgerError::transport("the ledger shut down before including the submission")
        })?
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, LedgerError> {
        let state = self.state.lock().await;
        let current = state.height;
        let updates = BroadcastStream::new(self.heads.subscribe());
        drop(state);

        let updates = updates.map(|head| {
            head.map_err(|BroadcastStreamRecvError::Lagged(skipped)| {
                LedgerError::HeadsLagged { skipped }
            })
        });
        Ok(stream::once(async move { Ok(current) })
            .chain(updates)
            .boxed())
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockContents, LedgerError> {
        self.state
            .lock()
            .await
            .blocks
            .get(&hash)
            .cloned()
            .ok_or(LedgerError::UnknownBlock { hash })
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.runtime.nonce(&account) + state.pending_from(&account))
    }

    async fn current_height(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().await.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msig_proxy_crypto::KeyPair;
    use msig_proxy_protocol::call::{BalancesCall, RuntimeCall};
    use msig_proxy_protocol::ledger::DispatchOutcome;
    use msig_proxy_protocol::{CallSubmitter, OpaqueCall, ProtocolError};

    fn transfer(dest: Address, amount: u128) -> OpaqueCall {
        RuntimeCall::Balances(BalancesCall::TransferKeepAlive { dest, amount })
            .to_opaque()
            .unwrap()
    }

    #[tokio::test]
    async fn instant_sealing_includes_every_submission_in_its_own_block() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default()
                .with_genesis_height(99)
                .with_endowment(alice.address(), 1_000),
        );
        let submitter = CallSubmitter::new(ledger.clone());

        let first = submitter
            .submit(&alice, &transfer(bob.address(), 10))
            .await
            .unwrap();
        let second = submitter
            .submit(&alice, &transfer(bob.address(), 10))
            .await
            .unwrap();

        assert_eq!(first.timepoint.height, 100);
        assert_eq!(second.timepoint.height, 101);
        assert_eq!(second.timepoint.index, 0);
        assert!(first.find_event("balances", "Transfer").is_some());
        assert_eq!(ledger.inspect(|state| state.balance(&bob.address())).await, 20);
        assert_eq!(ledger.next_nonce(alice.address()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pool_rejects_bad_signatures_and_nonces() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default().with_endowment(alice.address(), 1_000),
        );
        let call = transfer(bob.address(), 1);

        let mut forged = SignedExtrinsic::sign(&alice, 0, call.clone());
        forged.signer = bob.identity();
        assert!(matches!(
            ledger.submit_signed(forged).await.unwrap_err(),
            LedgerError::InvalidTransaction { .. }
        ));

        let future = SignedExtrinsic::sign(&alice, 5, call.clone());
        assert!(matches!(
            ledger.submit_signed(future).await.unwrap_err(),
            LedgerError::InvalidTransaction { .. }
        ));

        ledger
            .submit_signed(SignedExtrinsic::sign(&alice, 0, call.clone()))
            .await
            .unwrap();
        let replayed = SignedExtrinsic::sign(&alice, 0, call);
        assert!(matches!(
            ledger.submit_signed(replayed).await.unwrap_err(),
            LedgerError::InvalidTransaction { reason } if reason.starts_with("stale nonce")
        ));
    }

    #[tokio::test]
    async fn manual_sealing_orders_pooled_submissions() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default()
                .with_sealing(SealingMode::Manual)
                .with_endowment(alice.address(), 1_000)
                .with_endowment(bob.address(), 1_000),
        );

        let first = tokio::spawn({
            let ledger = ledger.clone();
            let ext = SignedExtrinsic::sign(&alice, 0, transfer(bob.address(), 5));
            async move { ledger.submit_signed(ext).await }
        });
        while ledger.pending_count().await < 1 {
            tokio::task::yield_now().await;
        }
        let second = tokio::spawn({
            let ledger = ledger.clone();
            let ext = SignedExtrinsic::sign(&bob, 0, transfer(alice.address(), 5_000));
            async move { ledger.submit_signed(ext).await }
        });
        while ledger.pending_count().await < 2 {
            tokio::task::yield_now().await;
        }

        let sealed = ledger.seal_block().await;
        assert_eq!(sealed.extrinsics, 2);

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!(first.position, Some(0));
        assert_eq!(second.position, Some(1));
        assert_eq!(first.block_hash, sealed.hash);
        assert!(first.outcome.is_applied());
        assert!(matches!(
            second.outcome,
            DispatchOutcome::Failed(ref err) if err.is("balances", "InsufficientBalance")
        ));

        let block = ledger.block_by_hash(sealed.hash).await.unwrap();
        assert_eq!(block.call_hashes.len(), 2);
    }

    #[tokio::test]
    async fn hash_scan_fallback_detects_duplicate_calls() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default()
                .with_sealing(SealingMode::Manual)
                .without_positions(),
        );
        // the same zero-argument call from two different signers in the same block
        let remark = RuntimeCall::opaque("system", "remark", vec![])
            .to_opaque()
            .unwrap();

        let mut tasks = Vec::new();
        for (count, signer) in [alice, bob].into_iter().enumerate() {
            let submitter = CallSubmitter::new(ledger.clone());
            let remark = remark.clone();
            tasks.push(tokio::spawn(async move {
                submitter.submit(&signer, &remark).await
            }));
            while ledger.pending_count().await < count + 1 {
                tokio::task::yield_now().await;
            }
        }
        ledger.seal_block().await;

        for task in tasks {
            assert!(matches!(
                task.await.unwrap().unwrap_err(),
                ProtocolError::TimepointAmbiguous { matches: 2, .. }
            ));
        }
    }

    #[tokio::test]
    async fn head_subscriptions_start_at_the_current_height() {
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default()
                .with_sealing(SealingMode::Manual)
                .with_genesis_height(10),
        );
        let mut heads = ledger.subscribe_new_heads().await.unwrap();
        ledger.produce_blocks(2).await;

        assert_eq!(heads.next().await.unwrap().unwrap(), 10);
        assert_eq!(heads.next().await.unwrap().unwrap(), 11);
        assert_eq!(heads.next().await.unwrap().unwrap(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_sealing_authors_blocks_in_the_background() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let ledger = SimulatedLedger::new(
            SimulatedLedgerConfig::default()
                .with_sealing(SealingMode::Interval(Duration::from_secs(6)))
                .with_endowment(alice.address(), 1_000),
        );

        let started = Instant::now();
        let submission = CallSubmitter::new(ledger.clone())
            .submit(&alice, &transfer(bob.address(), 1))
            .await
            .unwrap();
        assert_eq!(submission.timepoint, msig_proxy_protocol::Timepoint::new(1, 0));
        assert!(started.elapsed() >= Duration::from_secs(6));

        ledger.shutdown();
    }
}
