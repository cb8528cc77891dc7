// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::ProtocolError;
use msig_proxy_crypto::{Address, ContentHash};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

const MULTISIG_ACCOUNT_DOMAIN: &[u8] = b"modlpy/utilisuba";

pub const MAX_SIGNATORIES: usize = 100;

fn canonicalise<I, A>(members: I) -> Result<Vec<Address>, ProtocolError>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    let mut seen = BTreeSet::new();
    for member in members {
        let member = member.into();
        if !seen.insert(member) {
            return Err(ProtocolError::DuplicateMember { member });
        }
    }
    if seen.len() > MAX_SIGNATORIES {
        return Err(ProtocolError::TooManyMembers {
            members: seen.len(),
            max: MAX_SIGNATORIES,
        });
    }
    Ok(seen.into_iter().collect())
}

fn account_for(sorted_members: &[Address], threshold: u16) -> Address {
    let count = (sorted_members.len() as u32).to_le_bytes();
    let threshold = threshold.to_le_bytes();

    let chunks = std::iter::once(count.as_slice())
        .chain(sorted_members.iter().map(|member| member.as_bytes().as_slice()))
        .chain(std::iter::once(threshold.as_slice()));

    Address::from_bytes(ContentHash::digest_with_domain(MULTISIG_ACCOUNT_DOMAIN, chunks).to_bytes())
}

/// Derives the multisig account of the provided members for the given threshold.
///
/// Members are canonicalised by sorting before hashing, so their order is irrelevant.
pub fn derive<I, A>(members: I, threshold: u16) -> Result<Address, ProtocolError>
where
    I: IntoIterator<Item = A>,
    A: Into<Address>,
{
    MultisigGroup::new(members, threshold).map(|group| group.address)
}

/// Set of key holders that must jointly approve any action taken by their derived account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigGroup {
    members: Vec<Address>,
    threshold: u16,
    address: Address,
}

impl MultisigGroup {
    pub fn new<I, A>(members: I, threshold: u16) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let members = canonicalise(members)?;
        if threshold < 2 || threshold as usize > members.len() {
            return Err(ProtocolError::InvalidThreshold {
                threshold,
                members: members.len(),
            });
        }
        Ok(Self::from_canonical(members, threshold))
    }

    /// Group in which any single member may act on behalf of everyone.
    pub fn any_of<I, A>(members: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        let members = canonicalise(members)?;
        if members.len() < 2 {
            return Err(ProtocolError::InvalidThreshold {
                threshold: 1,
                members: members.len(),
            });
        }
        Ok(Self::from_canonical(members, 1))
    }

    fn from_canonical(members: Vec<Address>, threshold: u16) -> Self {
        let address = account_for(&members, threshold);
        MultisigGroup {
            members,
            threshold,
            address,
        }
    }

    /// Members in ascending order.
    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn contains(&self, member: &Address) -> bool {
        self.members.binary_search(member).is_ok()
    }

    /// All members except the signer, in the canonical order the ledger expects.
    pub fn other_signatories(&self, signer: &Address) -> Result<Vec<Address>, ProtocolError> {
        if !self.contains(signer) {
            return Err(ProtocolError::SignerNotMember {
                signer: *signer,
                multisig: self.address,
            });
        }
        Ok(self
            .members
            .iter()
            .filter(|member| *member != signer)
            .copied()
            .collect())
    }
}

impl Display for MultisigGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}-of-{})",
            self.address,
            self.threshold,
            self.members.len()
        )
    }
}

/// Account a multisig with the given signatories would be using, without any threshold validation.
/// This is what the ledger computes when it receives an approval.
pub fn multisig_account_id(signatories: &[Address], threshold: u16) -> Address {
    let mut sorted = signatories.to_vec();
    sorted.sort();
    account_for(&sorted, threshold)
}
