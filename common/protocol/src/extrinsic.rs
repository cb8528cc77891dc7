// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{CallHash, OpaqueCall};
use crate::error::ProtocolError;
use msig_proxy_crypto::{Address, Identity, KeyPair, Signature};
use serde::{Deserialize, Serialize};

const SIGNING_DOMAIN: &[u8] = b"msig-proxy/extrinsic";

/// A call signed by its submitter, exactly as handed over to the ordering log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedExtrinsic {
    pub signer: Identity,
    pub nonce: u64,
    pub call: OpaqueCall,
    pub signature: Signature,
}

fn signing_payload(nonce: u64, call: &OpaqueCall) -> Vec<u8> {
    let encoded = call.encoded();
    let mut payload = Vec::with_capacity(SIGNING_DOMAIN.len() + 8 + encoded.len());
    payload.extend_from_slice(SIGNING_DOMAIN);
    payload.extend_from_slice(&nonce.to_le_bytes());
    payload.extend_from_slice(encoded);
    payload
}

impl SignedExtrinsic {
    pub fn sign(keys: &KeyPair, nonce: u64, call: OpaqueCall) -> Self {
        let signature = keys.sign(signing_payload(nonce, &call));
        SignedExtrinsic {
            signer: keys.identity(),
            nonce,
            call,
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.signer
            .verify(signing_payload(self.nonce, &self.call), &self.signature)
            .is_ok()
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    pub fn call_hash(&self) -> CallHash {
        self.call.hash()
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
