// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::CallHash;
use crate::extrinsic::SignedExtrinsic;
use async_trait::async_trait;
use futures::stream::BoxStream;
use msig_proxy_crypto::{Address, ContentHash};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

pub type BlockHash = ContentHash;

/// Stream of block heights as new heads get observed.
/// The first item is always the best height known at subscription time.
pub type HeadStream = BoxStream<'static, Result<u64, LedgerError>>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed to communicate with the ordering log: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("the ordering log refused to accept the transaction: {reason}")]
    InvalidTransaction { reason: String },

    #[error("block {hash} is not known to the ordering log")]
    UnknownBlock { hash: BlockHash },

    #[error("received malformed data from the ordering log: {message}")]
    Malformed { message: String },

    /// The subscriber fell behind and missed some head notifications. Later heads are still delivered.
    #[error("the head subscription lagged behind and skipped {skipped} notifications")]
    HeadsLagged { skipped: u64 },

    /// The transaction is part of the ordering log, but the details of its inclusion are unknown.
    /// Resubmitting it would duplicate its effects.
    #[error("the transaction got included at height {height} ({outcome}), but its inclusion details could not be retrieved: {source}")]
    InclusionUnresolved {
        height: u64,
        outcome: DispatchOutcome,
        #[source]
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    pub fn transport<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        LedgerError::Transport {
            source: source.into(),
        }
    }

    pub fn invalid_transaction(reason: impl Into<String>) -> Self {
        LedgerError::InvalidTransaction {
            reason: reason.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        LedgerError::Malformed {
            message: message.into(),
        }
    }
}

/// Logical rejection of an included action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchError {
    pub module: String,
    pub name: String,
    pub detail: Option<String>,
}

impl DispatchError {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        DispatchError {
            module: module.into(),
            name: name.into(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is(&self, module: &str, name: &str) -> bool {
        self.module == module && self.name == name
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied,
    Failed(DispatchError),
}

impl DispatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchOutcome::Applied)
    }
}

impl Display for DispatchOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Applied => write!(f, "applied"),
            DispatchOutcome::Failed(err) => write!(f, "failed with {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub module: String,
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl LedgerEvent {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        LedgerEvent {
            module: module.into(),
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn is(&self, module: &str, name: &str) -> bool {
        self.module == module && self.name == name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Display for LedgerEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)?;
        if !self.attributes.is_empty() {
            let attributes = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " {{ {attributes} }}")?;
        }
        Ok(())
    }
}

/// Terminal result of a single submission as reported by the ordering log.
#[derive(Debug, Clone)]
pub struct InclusionReport {
    pub block_hash: BlockHash,
    pub height: u64,

    /// Position of the submission within the block, if the transport is able to report it directly.
    pub position: Option<u32>,

    pub outcome: DispatchOutcome,
    pub events: Vec<LedgerEvent>,
}

/// Ordered content of a single block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContents {
    pub hash: BlockHash,
    pub height: u64,

    /// Hashes of the calls carried by every included extrinsic, in inclusion order.
    pub call_hashes: Vec<CallHash>,
}

impl BlockContents {
    pub fn positions_of(&self, call_hash: &CallHash) -> Vec<u32> {
        self.call_hashes
            .iter()
            .enumerate()
            .filter(|(_, hash)| *hash == call_hash)
            .map(|(index, _)| index as u32)
            .collect()
    }
}

/// The append-only ordering log every protocol operation is eventually expressed against.
#[async_trait]
pub trait OrderingLog: Send + Sync {
    /// Transmits the extrinsic and waits until the log reports its terminal outcome.
    async fn submit_signed(&self, extrinsic: SignedExtrinsic)
        -> Result<InclusionReport, LedgerError>;

    async fn subscribe_new_heads(&self) -> Result<HeadStream, LedgerError>;

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockContents, LedgerError>;

    /// Next usable nonce for the account, including submissions that are still pending.
    async fn next_nonce(&self, account: Address) -> Result<u64, LedgerError>;

    async fn current_height(&self) -> Result<u64, LedgerError>;
}

#[async_trait]
impl<T> OrderingLog for Arc<T>
where
    T: OrderingLog + ?Sized,
{
    async fn submit_signed(
        &self,
        extrinsic: SignedExtrinsic,
    ) -> Result<InclusionReport, LedgerError> {
        (**self).submit_signed(extrinsic).await
    }

    async fn subscribe_new_heads(&self) -> Result<HeadStream, LedgerError> {
        (**self).subscribe_new_heads().await
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<BlockContents, LedgerError> {
        (**self).block_by_hash(hash).await
    }

    async fn next_nonce(&self, account: Address) -> Result<u64, LedgerError> {
        (**self).next_nonce(account).await
    }

    async fn current_height(&self) -> Result<u64, LedgerError> {
        (**self).current_height().await
    }
}
