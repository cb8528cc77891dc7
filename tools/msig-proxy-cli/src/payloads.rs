// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! Staking actions the scenario announces on behalf of the proxied account.
//! The ledger dispatches them as opaque calls, so their arguments only need a stable encoding.

use crate::error::MsigProxyCliError;
use msig_proxy_crypto::Address;
use msig_proxy_protocol::call::{Balance, UtilityCall};
use msig_proxy_protocol::{OpaqueCall, RuntimeCall};
use serde::Serialize;

/// 10% expressed in parts per billion.
pub(crate) const INITIAL_COMMISSION: u32 = 100_000_000;

/// The commission the unexpected announcement tries to switch to.
pub(crate) const HOSTILE_COMMISSION: u32 = 1_000_000_000;

const SESSION_KEY_COUNT: usize = 6;

#[derive(Serialize)]
enum RewardDestination {
    Staked,
}

#[derive(Serialize)]
struct Bond {
    controller: [u8; 32],
    value: Balance,
    payee: RewardDestination,
}

#[derive(Serialize)]
struct SetKeys {
    keys: Vec<[u8; 32]>,
    proof: Vec<u8>,
}

#[derive(Serialize)]
struct ValidatorPrefs {
    commission: u32,
    blocked: bool,
}

fn opaque<T: Serialize>(
    module: &'static str,
    method: &'static str,
    args: &T,
) -> Result<RuntimeCall, MsigProxyCliError> {
    let encoded = bincode::serialize(args).map_err(|source| {
        MsigProxyCliError::ArgumentEncodingFailure {
            call: method,
            source,
        }
    })?;
    Ok(RuntimeCall::opaque(module, method, encoded))
}

pub(crate) fn validate(commission: u32) -> Result<RuntimeCall, MsigProxyCliError> {
    opaque(
        "staking",
        "validate",
        &ValidatorPrefs {
            commission,
            blocked: false,
        },
    )
}

/// `batch_all(staking.bond, session.set_keys, staking.validate)` turning the proxied account
/// into a validator.
pub(crate) fn become_validator(
    controller: Address,
    value: Balance,
    session_key_owners: (Address, Address),
) -> Result<OpaqueCall, MsigProxyCliError> {
    let bond = opaque(
        "staking",
        "bond",
        &Bond {
            controller: controller.to_bytes(),
            value,
            payee: RewardDestination::Staked,
        },
    )?;

    let (first, rest) = session_key_owners;
    let keys = std::iter::once(first.to_bytes())
        .chain(std::iter::repeat(rest.to_bytes()).take(SESSION_KEY_COUNT - 1))
        .collect();
    let set_keys = opaque(
        "session",
        "set_keys",
        &SetKeys {
            keys,
            proof: Vec::new(),
        },
    )?;

    let calls = [bond, set_keys, validate(INITIAL_COMMISSION)?]
        .iter()
        .map(RuntimeCall::to_opaque)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RuntimeCall::Utility(UtilityCall::BatchAll { calls }).to_opaque()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msig_proxy_crypto::KeyPair;

    #[test]
    fn validator_batch_carries_three_staking_calls() {
        let ferdie = KeyPair::from_dev_uri("//Ferdie").address();
        let alice = KeyPair::from_dev_uri("//Alice").address();
        let dave = KeyPair::from_dev_uri("//Dave").address();

        let batch = become_validator(ferdie, 123_456_789_012_345, (alice, dave)).unwrap();
        let RuntimeCall::Utility(UtilityCall::BatchAll { calls }) = batch.decode().unwrap() else {
            panic!("expected a batch")
        };
        let labels: Vec<_> = calls
            .iter()
            .map(|call| call.decode().unwrap().label())
            .collect();
        assert_eq!(
            labels,
            ["staking.bond", "session.set_keys", "staking.validate"]
        );
    }

    #[test]
    fn changing_the_commission_changes_the_call_hash() {
        let initial = validate(INITIAL_COMMISSION).unwrap().to_opaque().unwrap();
        let hostile = validate(HOSTILE_COMMISSION).unwrap().to_opaque().unwrap();
        assert_ne!(initial.hash(), hostile.hash());
    }
}
