// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Group, Groups};
use crate::error::MsigProxyCliError;
use msig_proxy_crypto::KeyPair;
use msig_proxy_protocol::MultisigGroup;

pub(crate) fn dev_key(uri: &str) -> Result<KeyPair, MsigProxyCliError> {
    match uri.strip_prefix("//") {
        Some(name) if !name.is_empty() && !name.starts_with('/') => Ok(KeyPair::from_dev_uri(uri)),
        _ => Err(MsigProxyCliError::UnknownDevKey {
            uri: uri.to_string(),
        }),
    }
}

pub(crate) fn dev_keys(uris: &[String]) -> Result<Vec<KeyPair>, MsigProxyCliError> {
    uris.iter().map(|uri| dev_key(uri)).collect()
}

/// Threshold 1 groups use the dedicated single approval derivation.
pub(crate) fn multisig_group(
    members: &[KeyPair],
    threshold: u16,
) -> Result<MultisigGroup, MsigProxyCliError> {
    let addresses = members.iter().map(KeyPair::address);
    let group = if threshold == 1 {
        MultisigGroup::any_of(addresses)?
    } else {
        MultisigGroup::new(addresses, threshold)?
    };
    Ok(group)
}

pub(crate) struct SigningGroup {
    pub(crate) group: MultisigGroup,
    pub(crate) signers: Vec<KeyPair>,
}

impl SigningGroup {
    fn from_config(config: &Group) -> Result<Self, MsigProxyCliError> {
        let members = dev_keys(&config.members)?;
        Ok(SigningGroup {
            group: multisig_group(&members, config.threshold)?,
            signers: dev_keys(&config.signers)?,
        })
    }

    pub(crate) fn signers(&self) -> Vec<&KeyPair> {
        self.signers.iter().collect()
    }
}

/// Every key holder taking part in the scenario.
pub(crate) struct Parties {
    pub(crate) spawner: KeyPair,
    pub(crate) funder: KeyPair,
    pub(crate) staking: SigningGroup,
    pub(crate) cancellation: SigningGroup,
}

impl Parties {
    pub(crate) fn from_config(config: &Groups) -> Result<Self, MsigProxyCliError> {
        Ok(Parties {
            spawner: dev_key(&config.spawner)?,
            funder: dev_key(&config.funder)?,
            staking: SigningGroup::from_config(&config.staking)?,
            cancellation: SigningGroup::from_config(&config.cancellation)?,
        })
    }
}
