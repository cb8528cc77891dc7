// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProtocolError;
use crate::ledger::{HeadStream, LedgerError, OrderingLog};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Suspends callers until the ordering log reaches a given height.
///
/// It never times out on its own; wrap the future in a timeout if that's required.
pub struct DelayWaiter<L> {
    ledger: Arc<L>,
}

impl<L> Clone for DelayWaiter<L> {
    fn clone(&self) -> Self {
        DelayWaiter {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L> DelayWaiter<L>
where
    L: OrderingLog,
{
    pub fn new(ledger: Arc<L>) -> Self {
        DelayWaiter { ledger }
    }

    /// Resolves with the first observed height that is at least `target`.
    #[instrument(skip(self))]
    pub async fn await_height(&self, target: u64) -> Result<u64, ProtocolError> {
        let heads = self
            .ledger
            .subscribe_new_heads()
            .await
            .map_err(|source| ProtocolError::Transport { source })?;
        wait_for_height(heads, target).await
    }
}

/// Consumes head notifications until one reaches `target`.
/// Duplicate or out of order heights are fine, anything after the first match is ignored.
///
/// Skipped notifications of a lagging subscription are tolerated since every later head is
/// higher anyway. Any other stream error aborts the wait.
pub async fn wait_for_height(mut heads: HeadStream, target: u64) -> Result<u64, ProtocolError> {
    while let Some(head) = heads.next().await {
        match head {
            Ok(height) if height >= target => {
                info!("observed height {height}, reached the target of {target}");
                return Ok(height);
            }
            Ok(height) => debug!("observed height {height}, waiting for {target}"),
            Err(LedgerError::HeadsLagged { skipped }) => {
                warn!("missed {skipped} head notifications while waiting for {target}")
            }
            Err(source) => return Err(ProtocolError::Transport { source }),
        }
    }
    Err(ProtocolError::HeadStreamClosed { target })
}
