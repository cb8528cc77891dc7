// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::CometLedgerError;
use crate::helpers::{
    call_hash_of, decode_nonce, to_block_hash, to_dispatch_outcome, to_ledger_event,
    to_tendermint_hash, unresolved_inclusion,
};
use crate::subscriber;
use async_trait::async_trait;
use msig_proxy_crypto::Address;
use msig_proxy_protocol::{
    BlockContents, BlockHash, HeadStream, InclusionReport, LedgerError, OrderingLog,
    SignedExtrinsic,
};
use tendermint::block::Height;
use tendermint::Hash;
use tendermint_rpc::{Client, HttpClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};
use url::Url;

pub const NONCE_QUERY_PATH: &str = "/msig-proxy/nonce";

/// Ordering log backed by a CometBFT node whose application runs the multisig and proxy modules.
pub struct CometLedger {
    rpc_client: HttpClient,
    websocket_endpoint: Url,
    cancel: CancellationToken,
}

impl CometLedger {
    pub fn new(rpc_endpoint: &Url, websocket_endpoint: Url) -> Result<Self, CometLedgerError> {
        let rpc_client = HttpClient::new(rpc_endpoint.as_str()).map_err(|source| {
            CometLedgerError::HttpConnectionFailure {
                url: rpc_endpoint.to_string(),
                source: Box::new(source),
            }
        })?;

        Ok(CometLedger {
            rpc_client,
            websocket_endpoint,
            cancel: CancellationToken::new(),
        })
    }

    /// Stops every websocket driver spawned for head subscriptions.
    pub fn shutdown(&self) {
        self.cancel.cancel()
    }

    async fn block_hash_at(&self, height: Height) -> Result<BlockHash, CometLedgerError> {
        let block = self.rpc_client.block(height).await.map_err(|source| {
            CometLedgerError::BlockQueryFailure {
                height: height.value(),
                source: Box::new(source),
            }
        })?;
        to_block_hash(block.block_id.hash)
    }

    async fn position_of(&self, tx_hash: Hash) -> Result<u32, CometLedgerError> {
        let tx = self
            .rpc_client
            .tx(tx_hash, false)
            .await
            .map_err(|source| CometLedgerError::TxResultsQueryFailure {
                hash: tx_hash,
                source: Box::new(source),
            })?;
        Ok(tx.index)
    }

    async fn latest_height(&self) -> Result<u64, CometLedgerError> {
        let status = self
            .rpc_client
            .status()
            .await
            .map_err(|source| CometLedgerError::StatusQueryFailure {
                source: Box::new(source),
            })?;
        Ok(status.sync_info.latest_block_height.value())
    }
}

impl Drop for CometLedger {
    fn drop(&mut self) {
        self.cancel.cancel()
    }
}

#[async_trait]
impl OrderingLog for CometLedger {
    #[instrument(skip_all, fields(signer = %extrinsic.sender(), nonce = extrinsic.nonce))]
    async fn submit_signed(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<InclusionReport, LedgerError> {
        let raw = extrinsic
            .encode()
            .map_err(|err| LedgerError::invalid_transaction(err.to_string()))?;

        let response = self
            .rpc_client
            .broadcast_tx_commit(raw)
            .await
            .map_err(|source| CometLedgerError::BroadcastFailure {
                source: Box::new(source),
            })?;

        if response.check_tx.code.is_err() {
            return Err(LedgerError::invalid_transaction(format!(
                "{}.{}: {}",
                response.check_tx.codespace,
                response.check_tx.code.value(),
                response.check_tx.log
            )));
        }

        debug!(
            "tx {} got committed at height {}",
            response.hash, response.height
        );

        let result = response.tx_result;
        let outcome = to_dispatch_outcome(result.code, &result.codespace, &result.log);

        // the tx is committed from this point on
        let block_hash = match self.block_hash_at(response.height).await {
            Ok(block_hash) => block_hash,
            Err(err) => {
                warn!(
                    "could not look up the block containing tx {}: {err}",
                    response.hash
                );
                return Err(unresolved_inclusion(response.height, outcome, err));
            }
        };
        let position = match self.position_of(response.hash).await {
            Ok(index) => Some(index),
            Err(err) => {
                warn!("could not look up the position of tx {}: {err}", response.hash);
                None
            }
        };

        Ok(InclusionReport {
            block_hash,
            height: response.height.value(),
            position,
            outcome,
            events: result.events.iter().map(to_ledger_event).collect(),
        })
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, LedgerError> {
        let current = self.latest_height().await?;
        let heads =
            subscriber::subscribe_new_heads(&self.websocket_endpoint, current, self.cancel.clone())
                .await?;
        Ok(heads)
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockContents, LedgerError> {
        let response = self
            .rpc_client
            .block_by_hash(to_tendermint_hash(hash))
            .await
            .map_err(|source| CometLedgerError::BlockByHashQueryFailure {
                hash,
                source: Box::new(source),
            })?;

        let Some(block) = response.block else {
            return Err(LedgerError::UnknownBlock { hash });
        };

        Ok(BlockContents {
            hash,
            height: block.header.height.value(),
            call_hashes: block.data.iter().map(|tx| call_hash_of(tx)).collect(),
        })
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, LedgerError> {
        trace!("performing query on abci path {NONCE_QUERY_PATH}");
        let response = self
            .rpc_client
            .abci_query(
                Some(NONCE_QUERY_PATH.to_string()),
                account.to_bytes().to_vec(),
                None,
                false,
            )
            .await
            .map_err(|source| CometLedgerError::AbciQueryFailure {
                path: NONCE_QUERY_PATH.to_string(),
                source: Box::new(source),
            })?;

        if response.code.is_err() {
            return Err(CometLedgerError::AbciQueryRejected {
                path: NONCE_QUERY_PATH.to_string(),
                code: response.code.value(),
                log: response.log,
            }
            .into());
        }
        Ok(decode_nonce(&response.value)?)
    }

    async fn current_height(&self) -> Result<u64, LedgerError> {
        Ok(self.latest_height().await?)
    }
}
