// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::asymmetric::identity::IdentityRecoveryError;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const ADDRESS_LENGTH: usize = 32;

/// On-ledger account identifier.
///
/// Regular accounts use the bytes of their owner's public key, while keyless accounts,
/// such as multisig or pure proxy accounts, use a domain-separated hash of whatever defines them.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; ADDRESS_LENGTH] {
        self.0
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, IdentityRecoveryError> {
        Ok(Address(bytes.try_into()?))
    }

    pub fn to_base58_string(self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn from_base58_string<I: AsRef<[u8]>>(val: I) -> Result<Self, IdentityRecoveryError> {
        let bytes = bs58::decode(val)
            .into_vec()
            .map_err(|source| IdentityRecoveryError::MalformedIdentityString { source })?;
        Self::try_from_slice(&bytes)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.to_base58_string(), f)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.to_base58_string(), f)
    }
}

impl FromStr for Address {
    type Err = IdentityRecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_base58_string(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
