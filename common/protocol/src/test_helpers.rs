// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{CallHash, RuntimeCall};
use crate::extrinsic::SignedExtrinsic;
use crate::ledger::{
    BlockContents, BlockHash, DispatchError, DispatchOutcome, HeadStream, InclusionReport,
    LedgerError, LedgerEvent, OrderingLog,
};
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use msig_proxy_crypto::Address;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub(crate) enum ScriptedResponse {
    Included {
        height: u64,
        position: Option<u32>,
        outcome: DispatchOutcome,
        events: Vec<LedgerEvent>,
        block_calls: Option<Vec<CallHash>>,
    },
    TransportFailure,
    RefusedByPool(String),
}

impl ScriptedResponse {
    pub(crate) fn included(height: u64, position: Option<u32>) -> Self {
        ScriptedResponse::Included {
            height,
            position,
            outcome: DispatchOutcome::Applied,
            events: Vec::new(),
            block_calls: None,
        }
    }

    pub(crate) fn rejected(height: u64, error: DispatchError) -> Self {
        ScriptedResponse::Included {
            height,
            position: Some(0),
            outcome: DispatchOutcome::Failed(error),
            events: Vec::new(),
            block_calls: None,
        }
    }

    pub(crate) fn with_block_calls(mut self, calls: Vec<CallHash>) -> Self {
        if let ScriptedResponse::Included { block_calls, .. } = &mut self {
            *block_calls = Some(calls)
        }
        self
    }

    pub(crate) fn with_event(mut self, event: LedgerEvent) -> Self {
        if let ScriptedResponse::Included { events, .. } = &mut self {
            events.push(event)
        }
        self
    }
}

#[derive(Default)]
struct ScriptedState {
    responses: VecDeque<ScriptedResponse>,
    submitted: Vec<SignedExtrinsic>,
    blocks: HashMap<BlockHash, BlockContents>,
    nonces: HashMap<Address, u64>,
    heads: Vec<u64>,
    height: u64,
    failing_block_queries: bool,
}

/// In-memory ordering log replaying pre-programmed outcomes while recording every submission.
#[derive(Default)]
pub(crate) struct ScriptedLedger {
    state: Mutex<ScriptedState>,
}

impl ScriptedLedger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, response: ScriptedResponse) {
        self.state.lock().unwrap().responses.push_back(response)
    }

    pub(crate) fn set_heads(&self, heads: Vec<u64>) {
        self.state.lock().unwrap().heads = heads
    }

    pub(crate) fn fail_block_queries(&self) {
        self.state.lock().unwrap().failing_block_queries = true
    }

    pub(crate) fn submitted(&self) -> Vec<SignedExtrinsic> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn submitted_calls(&self) -> Vec<RuntimeCall> {
        self.submitted()
            .iter()
            .map(|extrinsic| extrinsic.call.decode().unwrap())
            .collect()
    }

    pub(crate) fn remaining_responses(&self) -> usize {
        self.state.lock().unwrap().responses.len()
    }
}

#[async_trait]
impl OrderingLog for ScriptedLedger {
    async fn submit_signed(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<InclusionReport, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let sender = extrinsic.sender();
        let call_hash = extrinsic.call_hash();
        state.submitted.push(extrinsic);

        let Some(response) = state.responses.pop_front() else {
            return Err(LedgerError::transport("no scripted response left"));
        };

        match response {
            ScriptedResponse::TransportFailure => {
                Err(LedgerError::transport("connection reset by peer"))
            }
            ScriptedResponse::RefusedByPool(reason) => Err(LedgerError::invalid_transaction(reason)),
            ScriptedResponse::Included {
                height,
                position,
                outcome,
                events,
                block_calls,
            } => {
                *state.nonces.entry(sender).or_default() += 1;
                state.height = state.height.max(height);

                let call_hashes = block_calls.unwrap_or_else(|| {
                    let filler = position.unwrap_or_default();
                    (0..filler)
                        .map(|i| CallHash::digest(format!("filler-{height}-{i}")))
                        .chain(std::iter::once(call_hash))
                        .collect()
                });
                let block_hash = BlockHash::digest(format!("block-{height}-{}", state.blocks.len()));
                state.blocks.insert(
                    block_hash,
                    BlockContents {
                        hash: block_hash,
                        height,
                        call_hashes,
                    },
                );

                Ok(InclusionReport {
                    block_hash,
                    height,
                    position,
                    outcome,
                    events,
                })
            }
        }
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, LedgerError> {
        let heads = self.state.lock().unwrap().heads.clone();
        Ok(stream::iter(heads.into_iter().map(Ok)).boxed())
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockContents, LedgerError> {
        let state = self.state.lock().unwrap();
        if state.failing_block_queries {
            return Err(LedgerError::transport(
                "connection reset while fetching block",
            ));
        }
        state
            .blocks
            .get(&hash)
            .cloned()
            .ok_or(LedgerError::UnknownBlock { hash })
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, LedgerError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&account)
            .copied()
            .unwrap_or_default())
    }

    async fn current_height(&self) -> Result<u64, LedgerError> {
        Ok(self.state.lock().unwrap().height)
    }
}
