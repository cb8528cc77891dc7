// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProtocolError;
use crate::timepoint::Timepoint;
use msig_proxy_crypto::{Address, ContentHash};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

pub type CallHash = ContentHash;
pub type Weight = u64;
pub type Balance = u128;

/// Restricts which calls a proxy delegate may dispatch on behalf of the proxied account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProxyType {
    Any,
    NonTransfer,
    Staking,
    CancelProxy,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Any => "Any",
            ProxyType::NonTransfer => "NonTransfer",
            ProxyType::Staking => "Staking",
            ProxyType::CancelProxy => "CancelProxy",
        }
    }
}

impl Display for ProxyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Any" | "any" => Ok(ProxyType::Any),
            "NonTransfer" | "non_transfer" => Ok(ProxyType::NonTransfer),
            "Staking" | "staking" => Ok(ProxyType::Staking),
            "CancelProxy" | "cancel_proxy" => Ok(ProxyType::CancelProxy),
            other => Err(ProtocolError::UnknownProxyType {
                raw: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultisigCall {
    ApproveAsMulti {
        threshold: u16,
        other_signatories: Vec<Address>,
        maybe_timepoint: Option<Timepoint>,
        call_hash: CallHash,
        max_weight: Weight,
    },
    AsMulti {
        threshold: u16,
        other_signatories: Vec<Address>,
        maybe_timepoint: Option<Timepoint>,
        call: OpaqueCall,
        store_call: bool,
        max_weight: Weight,
    },
    AsMultiThreshold1 {
        other_signatories: Vec<Address>,
        call: OpaqueCall,
    },
    CancelAsMulti {
        threshold: u16,
        other_signatories: Vec<Address>,
        timepoint: Timepoint,
        call_hash: CallHash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyCall {
    CreatePure {
        proxy_type: ProxyType,
        delay: u64,
        index: u16,
    },
    AddProxy {
        delegate: Address,
        proxy_type: ProxyType,
        delay: u64,
    },
    RemoveProxy {
        delegate: Address,
        proxy_type: ProxyType,
        delay: u64,
    },
    Proxy {
        real: Address,
        force_proxy_type: Option<ProxyType>,
        call: OpaqueCall,
    },
    Announce {
        real: Address,
        call_hash: CallHash,
    },
    ProxyAnnounced {
        delegate: Address,
        real: Address,
        force_proxy_type: Option<ProxyType>,
        call: OpaqueCall,
    },
    RejectAnnouncement {
        delegate: Address,
        call_hash: CallHash,
    },
    RemoveAnnouncement {
        real: Address,
        call_hash: CallHash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancesCall {
    TransferKeepAlive { dest: Address, amount: Balance },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UtilityCall {
    BatchAll { calls: Vec<OpaqueCall> },
}

/// An action understood by the ledger.
///
/// Only the multisig, proxy, balances and utility modules are modelled explicitly.
/// Anything else (bonding, session keys, validator preferences, ...) travels as [`RuntimeCall::Opaque`]
/// and is identified purely by its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeCall {
    Multisig(MultisigCall),
    Proxy(ProxyCall),
    Balances(BalancesCall),
    Utility(UtilityCall),
    Opaque {
        module: String,
        method: String,
        #[serde(with = "serde_bytes")]
        args: Vec<u8>,
    },
}

impl RuntimeCall {
    pub fn opaque(module: impl Into<String>, method: impl Into<String>, args: Vec<u8>) -> Self {
        RuntimeCall::Opaque {
            module: module.into(),
            method: method.into(),
            args,
        }
    }

    pub fn module(&self) -> &str {
        match self {
            RuntimeCall::Multisig(_) => "multisig",
            RuntimeCall::Proxy(_) => "proxy",
            RuntimeCall::Balances(_) => "balances",
            RuntimeCall::Utility(_) => "utility",
            RuntimeCall::Opaque { module, .. } => module,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            RuntimeCall::Multisig(call) => match call {
                MultisigCall::ApproveAsMulti { .. } => "approve_as_multi",
                MultisigCall::AsMulti { .. } => "as_multi",
                MultisigCall::AsMultiThreshold1 { .. } => "as_multi_threshold_1",
                MultisigCall::CancelAsMulti { .. } => "cancel_as_multi",
            },
            RuntimeCall::Proxy(call) => match call {
                ProxyCall::CreatePure { .. } => "create_pure",
                ProxyCall::AddProxy { .. } => "add_proxy",
                ProxyCall::RemoveProxy { .. } => "remove_proxy",
                ProxyCall::Proxy { .. } => "proxy",
                ProxyCall::Announce { .. } => "announce",
                ProxyCall::ProxyAnnounced { .. } => "proxy_announced",
                ProxyCall::RejectAnnouncement { .. } => "reject_announcement",
                ProxyCall::RemoveAnnouncement { .. } => "remove_announcement",
            },
            RuntimeCall::Balances(BalancesCall::TransferKeepAlive { .. }) => "transfer_keep_alive",
            RuntimeCall::Utility(UtilityCall::BatchAll { .. }) => "batch_all",
            RuntimeCall::Opaque { method, .. } => method,
        }
    }

    /// `module.method` representation used in logs and errors.
    pub fn label(&self) -> String {
        format!("{}.{}", self.module(), self.method())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_opaque(&self) -> Result<OpaqueCall, ProtocolError> {
        Ok(OpaqueCall::from_encoded(self.encode()?))
    }
}

/// Fully encoded [`RuntimeCall`].
///
/// Approvers only ever need its [`hash`](OpaqueCall::hash), while the final executor of a multisig
/// operation has to provide the complete encoding matching the previously approved hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueCall {
    #[serde(with = "serde_bytes")]
    encoded: Vec<u8>,
}

impl OpaqueCall {
    pub fn from_encoded(encoded: Vec<u8>) -> Self {
        OpaqueCall { encoded }
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn into_encoded(self) -> Vec<u8> {
        self.encoded
    }

    pub fn encoded_len(&self) -> usize {
        self.encoded.len()
    }

    pub fn hash(&self) -> CallHash {
        ContentHash::digest(&self.encoded)
    }

    pub fn decode(&self) -> Result<RuntimeCall, ProtocolError> {
        RuntimeCall::decode(&self.encoded)
    }

    /// Best effort `module.method` description of the wrapped call.
    pub fn describe(&self) -> String {
        match self.decode() {
            Ok(call) => call.label(),
            Err(_) => format!("<opaque {}>", self.hash()),
        }
    }
}

impl Debug for OpaqueCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueCall")
            .field("hash", &self.hash())
            .field("len", &self.encoded.len())
            .finish()
    }
}

impl TryFrom<&RuntimeCall> for OpaqueCall {
    type Error = ProtocolError;

    fn try_from(call: &RuntimeCall) -> Result<Self, Self::Error> {
        call.to_opaque()
    }
}
