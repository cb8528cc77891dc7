// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::CometLedgerError;
use msig_proxy_crypto::ContentHash;
use msig_proxy_protocol::{
    BlockHash, CallHash, DispatchError, DispatchOutcome, LedgerError, LedgerEvent,
    SignedExtrinsic,
};
use tendermint::abci::{self, Code};
use tendermint::block::Height;
use tendermint::Hash;
use tendermint_rpc::event::{Event, EventData};
use tracing::warn;

pub(crate) fn to_block_hash(hash: Hash) -> Result<BlockHash, CometLedgerError> {
    match hash {
        Hash::Sha256(digest) => Ok(ContentHash::from_bytes(digest)),
        Hash::None => Err(CometLedgerError::UnsupportedBlockHash),
    }
}

pub(crate) fn to_tendermint_hash(hash: BlockHash) -> Hash {
    Hash::Sha256(hash.to_bytes())
}

// ledger modules emit their events as `module.Name`
pub(crate) fn to_ledger_event(event: &abci::Event) -> LedgerEvent {
    let (module, name) = event
        .kind
        .split_once('.')
        .unwrap_or((event.kind.as_str(), ""));

    let mut converted = LedgerEvent::new(module, name);
    for attribute in &event.attributes {
        let (Ok(key), Ok(value)) = (attribute.key_str(), attribute.value_str()) else {
            warn!("ignoring non-utf8 attribute of the '{}' event", event.kind);
            continue;
        };
        converted = converted.with_attribute(key, value);
    }
    converted
}

pub(crate) fn to_dispatch_outcome(code: Code, codespace: &str, log: &str) -> DispatchOutcome {
    if code.is_ok() {
        return DispatchOutcome::Applied;
    }
    let error = DispatchError::new(codespace, code.value().to_string());
    if log.is_empty() {
        DispatchOutcome::Failed(error)
    } else {
        DispatchOutcome::Failed(error.with_detail(log))
    }
}

/// Failure to resolve the details of an already committed transaction.
pub(crate) fn unresolved_inclusion(
    height: Height,
    outcome: DispatchOutcome,
    err: CometLedgerError,
) -> LedgerError {
    LedgerError::InclusionUnresolved {
        height: height.value(),
        outcome,
        source: Box::new(err.into()),
    }
}

/// Hash of the call carried by a raw block transaction.
/// Transactions that aren't signed extrinsics get a digest of their raw bytes, which never
/// matches any call.
pub(crate) fn call_hash_of(raw_tx: &[u8]) -> CallHash {
    match SignedExtrinsic::decode(raw_tx) {
        Ok(extrinsic) => extrinsic.call_hash(),
        Err(_) => ContentHash::digest(raw_tx),
    }
}

pub(crate) fn decode_nonce(value: &[u8]) -> Result<u64, CometLedgerError> {
    let bytes: [u8; 8] = value
        .try_into()
        .map_err(|_| CometLedgerError::MalformedNonce { len: value.len() })?;
    Ok(u64::from_le_bytes(bytes))
}

pub(crate) fn head_height(event: Event) -> Result<u64, CometLedgerError> {
    let block = match event.data {
        EventData::NewBlock { block, .. } => block,
        EventData::LegacyNewBlock { block, .. } => block,
        EventData::Tx { .. } => {
            return Err(CometLedgerError::InvalidSubscriptionEvent {
                kind: "Tx".to_string(),
            })
        }
        EventData::GenericJsonEvent(_) => {
            return Err(CometLedgerError::InvalidSubscriptionEvent {
                kind: "GenericJsonEvent".to_string(),
            })
        }
    };

    let Some(block) = block else {
        return Err(CometLedgerError::InvalidSubscriptionEvent {
            kind: "NewBlock without block data".to_string(),
        });
    };
    Ok(block.header.height.value())
}
