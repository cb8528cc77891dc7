// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{Balance, BalancesCall, ProxyCall, ProxyType, RuntimeCall};
use crate::error::ProtocolError;
use crate::group::MultisigGroup;
use crate::ledger::OrderingLog;
use crate::submitter::{CallSubmitter, Submission};
use crate::workflow::WorkflowConfig;
use msig_proxy_crypto::{Address, KeyPair};
use tracing::info;

pub const PURE_CREATED_MODULE: &str = "proxy";
pub const PURE_CREATED_EVENT: &str = "PureCreated";
pub const PURE_ACCOUNT_ATTRIBUTE: &str = "pure";

/// Sets up the accounts and proxy relationships the delayed proxy workflow operates on.
pub struct Provisioner<L> {
    submitter: CallSubmitter<L>,
    config: WorkflowConfig,
}

impl<L> Provisioner<L>
where
    L: OrderingLog,
{
    pub fn new(submitter: CallSubmitter<L>, config: WorkflowConfig) -> Self {
        Provisioner { submitter, config }
    }

    /// Creates a new keyless account with `spawner` registered as its proxy.
    pub async fn create_pure_proxy(
        &self,
        spawner: &KeyPair,
        proxy_type: ProxyType,
        delay: u64,
        index: u16,
    ) -> Result<Address, ProtocolError> {
        let call = RuntimeCall::Proxy(ProxyCall::CreatePure {
            proxy_type,
            delay,
            index,
        });
        let submission = self.submitter.submit_call(spawner, &call).await?;
        let pure = pure_account_from_events(&submission)?;
        info!("{} created pure proxy account {pure}", spawner.name());
        Ok(pure)
    }

    pub async fn fund(
        &self,
        from: &KeyPair,
        dest: Address,
        amount: Balance,
    ) -> Result<Submission, ProtocolError> {
        info!("{} transfers {amount} to {dest}", from.name());
        let call = RuntimeCall::Balances(BalancesCall::TransferKeepAlive { dest, amount });
        self.submitter.submit_call(from, &call).await
    }

    /// Funds the group's derived account with the configured amount so that it exists on the ledger.
    pub async fn create_and_endow_multisig(
        &self,
        group: &MultisigGroup,
        funder: &KeyPair,
    ) -> Result<Address, ProtocolError> {
        info!("endowing multisig {group}");
        self.fund(funder, group.address(), self.config.funding_amount)
            .await?;
        Ok(group.address())
    }

    /// The spawner, acting as the `Any` proxy of the pure account, registers another delegate for it.
    pub async fn add_proxy_via_pure(
        &self,
        spawner: &KeyPair,
        pure: Address,
        delegate: Address,
        proxy_type: ProxyType,
        delay: u64,
    ) -> Result<Submission, ProtocolError> {
        info!("adding {delegate} as a {proxy_type} proxy of {pure} with delay {delay}");
        let add_proxy = RuntimeCall::Proxy(ProxyCall::AddProxy {
            delegate,
            proxy_type,
            delay,
        });
        let call = RuntimeCall::Proxy(ProxyCall::Proxy {
            real: pure,
            force_proxy_type: Some(ProxyType::Any),
            call: add_proxy.to_opaque()?,
        });
        self.submitter.submit_call(spawner, &call).await
    }
}

fn pure_account_from_events(submission: &Submission) -> Result<Address, ProtocolError> {
    let event = submission
        .find_event(PURE_CREATED_MODULE, PURE_CREATED_EVENT)
        .ok_or_else(|| ProtocolError::MissingEvent {
            module: PURE_CREATED_MODULE.to_string(),
            name: PURE_CREATED_EVENT.to_string(),
        })?;

    let raw = event.attribute(PURE_ACCOUNT_ATTRIBUTE).unwrap_or_default();
    raw.parse().map_err(|_| ProtocolError::MalformedEvent {
        module: PURE_CREATED_MODULE.to_string(),
        name: PURE_CREATED_EVENT.to_string(),
        attribute: PURE_ACCOUNT_ATTRIBUTE.to_string(),
        value: raw.to_string(),
    })
}
