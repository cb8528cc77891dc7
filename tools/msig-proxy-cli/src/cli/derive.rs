// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::MsigProxyCliError;
use crate::keys::{dev_keys, multisig_group};
use msig_proxy_crypto::Address;

#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    /// Development key uris of the group members, e.g. //Alice //Dave //Bob
    #[clap(required = true, num_args = 1..)]
    members: Vec<String>,

    /// Number of members required to approve an action.
    #[clap(long, short)]
    threshold: u16,
}

fn derive_address(args: &Args) -> Result<Address, MsigProxyCliError> {
    let members = dev_keys(&args.members)?;
    Ok(multisig_group(&members, args.threshold)?.address())
}

pub(crate) fn execute(args: Args) -> Result<(), MsigProxyCliError> {
    let address = derive_address(&args)?;
    println!("{address}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::dev_key;
    use msig_proxy_protocol::{derive, ProtocolError};

    fn args(members: &[&str], threshold: u16) -> Args {
        Args {
            members: members.iter().map(|m| m.to_string()).collect(),
            threshold,
        }
    }

    #[test]
    fn member_order_does_not_change_the_address() {
        let expected = derive(
            ["//Alice", "//Dave", "//Bob"].map(|uri| dev_key(uri).unwrap().address()),
            2,
        )
        .unwrap();

        assert_eq!(
            derive_address(&args(&["//Alice", "//Dave", "//Bob"], 2)).unwrap(),
            expected
        );
        assert_eq!(
            derive_address(&args(&["//Bob", "//Alice", "//Dave"], 2)).unwrap(),
            expected
        );
    }

    #[test]
    fn impossible_thresholds_are_rejected() {
        assert!(matches!(
            derive_address(&args(&["//Alice", "//Bob"], 3)),
            Err(MsigProxyCliError::ProtocolFailure(
                ProtocolError::InvalidThreshold { .. }
            ))
        ));
        assert!(derive_address(&args(&["//Alice", "//Bob"], 1)).is_ok());
    }
}
