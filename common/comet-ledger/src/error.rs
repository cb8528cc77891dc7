// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use msig_proxy_protocol::{BlockHash, LedgerError};
use tendermint::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CometLedgerError {
    #[error("failed to establish rpc connection to {url}: {source}")]
    HttpConnectionFailure {
        url: String,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("failed to establish websocket connection to {url}: {source}")]
    WebSocketConnectionFailure {
        url: String,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("failed to create chain subscription: {source}")]
    ChainSubscriptionFailure {
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("failed to broadcast transaction: {source}")]
    BroadcastFailure {
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("could not obtain tx results for tx: {hash}: {source}")]
    TxResultsQueryFailure {
        hash: Hash,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("could not obtain basic block information at height: {height}: {source}")]
    BlockQueryFailure {
        height: u64,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("could not obtain block {hash}: {source}")]
    BlockByHashQueryFailure {
        hash: BlockHash,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("could not obtain current node status: {source}")]
    StatusQueryFailure {
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("abci query on '{path}' failed: {source}")]
    AbciQueryFailure {
        path: String,
        #[source]
        source: Box<tendermint_rpc::Error>,
    },

    #[error("abci query on '{path}' returned code {code}: {log}")]
    AbciQueryRejected { path: String, code: u32, log: String },

    #[error("received a subscription event that isn't a new block ({kind})")]
    InvalidSubscriptionEvent { kind: String },

    #[error("received a block hash that isn't a 32-byte sha256 digest")]
    UnsupportedBlockHash,

    #[error("expected an 8-byte little endian nonce, got {len} bytes")]
    MalformedNonce { len: usize },
}

impl From<CometLedgerError> for LedgerError {
    fn from(err: CometLedgerError) -> Self {
        match err {
            err @ (CometLedgerError::InvalidSubscriptionEvent { .. }
            | CometLedgerError::UnsupportedBlockHash
            | CometLedgerError::MalformedNonce { .. }
            | CometLedgerError::AbciQueryRejected { .. }) => LedgerError::malformed(err.to_string()),
            err => LedgerError::transport(err),
        }
    }
}
