// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

pub mod address;
pub mod asymmetric;
pub mod hash;

pub use address::{Address, ADDRESS_LENGTH};
pub use asymmetric::identity::{Identity, IdentityRecoveryError, KeyPair, PrivateKey, Signature};
pub use hash::ContentHash;
