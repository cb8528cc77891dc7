// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::address::Address;
pub use ed25519_dalek::SignatureError;
use ed25519_dalek::{SecretKey, Signer, SigningKey, Verifier};
pub use ed25519_dalek::{PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[cfg(feature = "serde")]
use serde::de::Error as SerdeError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
#[cfg(feature = "serde")]
use serde_bytes::{ByteBuf as SerdeByteBuf, Bytes as SerdeBytes};

const DEV_KEY_DOMAIN: &[u8] = b"msig-proxy/dev-key";

#[derive(Debug, Error)]
pub enum IdentityRecoveryError {
    #[error(transparent)]
    MalformedBytes(#[from] SignatureError),

    #[error(transparent)]
    BytesLengthError(#[from] std::array::TryFromSliceError),

    #[error("the base58 representation of the identity was malformed - {source}")]
    MalformedIdentityString {
        #[source]
        source: bs58::decode::Error,
    },

    #[error("the base58 representation of the private key was malformed - {source}")]
    MalformedPrivateKeyString {
        #[source]
        source: bs58::decode::Error,
    },

    #[error("the base58 representation of the signature was malformed - {source}")]
    MalformedSignatureString {
        #[source]
        source: bs58::decode::Error,
    },
}

/// ed25519 keypair of a single key holder, alongside a human readable name used in logs.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    private_key: PrivateKey,

    // nothing secret about public key
    #[zeroize(skip)]
    public_key: Identity,

    #[zeroize(skip)]
    name: String,
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    pub fn from_secret(secret: SecretKey, name: impl Into<String>) -> Self {
        let signing_key = SigningKey::from(secret);

        KeyPair {
            private_key: PrivateKey(signing_key.to_bytes()),
            public_key: Identity(signing_key.verifying_key()),
            name: name.into(),
        }
    }

    /// Deterministically derives a development keypair from an uri such as `//Alice`.
    /// Those keys are public knowledge and must never hold anything of value.
    pub fn from_dev_uri(uri: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DEV_KEY_DOMAIN);
        hasher.update(uri.as_bytes());
        let secret: SecretKey = hasher.finalize().into();

        let name = uri.trim_start_matches('/');
        let name = if name.is_empty() { uri } else { name };
        KeyPair::from_secret(secret, name)
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn identity(&self) -> Identity {
        self.public_key
    }

    pub fn address(&self) -> Address {
        self.public_key.address()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sign<M: AsRef<[u8]>>(&self, message: M) -> Signature {
        self.private_key.sign(message)
    }
}

/// Public ed25519 key of a key holder. Its bytes double as the holder's on-ledger address.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Identity(ed25519_dalek::VerifyingKey);

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // each public key has unique bytes representation which can be used
        // for the hash implementation
        self.to_bytes().hash(state)
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.to_base58_string(), f)
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.to_base58_string(), f)
    }
}

impl Identity {
    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.to_bytes()
    }

    pub fn from_bytes(b: &[u8]) -> Result<Self, IdentityRecoveryError> {
        Ok(Identity(ed25519_dalek::VerifyingKey::from_bytes(
            b.try_into()?,
        )?))
    }

    pub fn address(self) -> Address {
        Address::from_bytes(self.to_bytes())
    }

    pub fn to_base58_string(self) -> String {
        bs58::encode(self.to_bytes()).into_string()
    }

    pub fn from_base58_string<I: AsRef<[u8]>>(val: I) -> Result<Self, IdentityRecoveryError> {
        let bytes = bs58::decode(val)
            .into_vec()
            .map_err(|source| IdentityRecoveryError::MalformedIdentityString { source })?;
        Self::from_bytes(&bytes)
    }

    pub fn verify<M: AsRef<[u8]>>(
        &self,
        message: M,
        signature: &Signature,
    ) -> Result<(), SignatureError> {
        self.0.verify(message.as_ref(), &signature.0)
    }
}

impl From<Identity> for Address {
    fn from(identity: Identity) -> Self {
        identity.address()
    }
}

impl FromStr for Identity {
    type Err = IdentityRecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::from_base58_string(s)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SerdeBytes::new(self.0.as_bytes()).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'d> Deserialize<'d> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let bytes = <SerdeByteBuf>::deserialize(deserializer)?;
        Identity::from_bytes(bytes.as_ref()).map_err(SerdeError::custom)
    }
}

/// ed25519 EdDSA Private Key
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(SecretKey);

impl<'a> From<&'a PrivateKey> for Identity {
    fn from(pk: &'a PrivateKey) -> Self {
        Identity(SigningKey::from_bytes(&pk.0).verifying_key())
    }
}

impl FromStr for PrivateKey {
    type Err = IdentityRecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrivateKey::from_base58_string(s)
    }
}

impl PrivateKey {
    pub fn identity(&self) -> Identity {
        self.into()
    }

    pub fn to_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.0
    }

    pub fn from_bytes(b: &[u8]) -> Result<Self, IdentityRecoveryError> {
        Ok(PrivateKey(b.try_into()?))
    }

    pub fn to_base58_string(&self) -> String {
        bs58::encode(&self.to_bytes()).into_string()
    }

    pub fn from_base58_string<I: AsRef<[u8]>>(val: I) -> Result<Self, IdentityRecoveryError> {
        let bytes = bs58::decode(val)
            .into_vec()
            .map_err(|source| IdentityRecoveryError::MalformedPrivateKeyString { source })?;
        Self::from_bytes(&bytes)
    }

    pub fn sign<M: AsRef<[u8]>>(&self, message: M) -> Signature {
        let signing_key: SigningKey = self.0.into();
        Signature(signing_key.sign(message.as_ref()))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn to_base58_string(&self) -> String {
        bs58::encode(&self.to_bytes()).into_string()
    }

    pub fn from_base58_string<I: AsRef<[u8]>>(val: I) -> Result<Self, IdentityRecoveryError> {
        let bytes = bs58::decode(val)
            .into_vec()
            .map_err(|source| IdentityRecoveryError::MalformedSignatureString { source })?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentityRecoveryError> {
        Ok(Signature(ed25519_dalek::Signature::from_bytes(
            bytes.try_into()?,
        )))
    }
}

impl FromStr for Signature {
    type Err = IdentityRecoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::from_base58_string(s)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SerdeBytes::new(&self.to_bytes()).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'d> Deserialize<'d> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let bytes = <SerdeByteBuf>::deserialize(deserializer)?;
        Signature::from_bytes(bytes.as_ref()).map_err(SerdeError::custom)
    }
}
