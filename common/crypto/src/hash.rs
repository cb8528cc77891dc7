// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};
use std::fmt::{self, Debug, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const CONTENT_HASH_LENGTH: usize = 32;

/// sha256 digest of some content, e.g. an encoded call or a block.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContentHash([u8; CONTENT_HASH_LENGTH]);

impl ContentHash {
    pub fn digest<M: AsRef<[u8]>>(content: M) -> Self {
        ContentHash(Sha256::digest(content.as_ref()).into())
    }

    /// Hashes the concatenation of all provided chunks, prefixed with the given domain separator.
    pub fn digest_with_domain<'a, I>(domain: &[u8], chunks: I) -> Self
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        for chunk in chunks {
            hasher.update(chunk);
        }
        ContentHash(hasher.finalize().into())
    }

    pub const fn from_bytes(bytes: [u8; CONTENT_HASH_LENGTH]) -> Self {
        ContentHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONTENT_HASH_LENGTH] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; CONTENT_HASH_LENGTH] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Debug for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash(0x{})", self.to_hex())
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
