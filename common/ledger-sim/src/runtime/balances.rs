// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use super::{error, DispatchResult, Dispatcher, Origin};
use msig_proxy_crypto::Address;
use msig_proxy_protocol::call::Balance;
use msig_proxy_protocol::ledger::LedgerEvent;

const MODULE: &str = "balances";

pub const EXISTENTIAL_DEPOSIT: Balance = 1;

impl Dispatcher<'_> {
    pub(super) fn transfer_keep_alive(
        &mut self,
        origin: Origin,
        dest: Address,
        amount: Balance,
    ) -> DispatchResult {
        let available = self.state.balance(&origin.who);
        let Some(remaining) = available.checked_sub(amount) else {
            return Err(error(MODULE, "InsufficientBalance")
                .with_detail(format!("{} holds {available}, tried to send {amount}", origin.who)));
        };
        if remaining < EXISTENTIAL_DEPOSIT {
            return Err(error(MODULE, "KeepAlive"));
        }

        self.state.balances.insert(origin.who, remaining);
        *self.state.balances.entry(dest).or_default() += amount;
        self.deposit_event(
            LedgerEvent::new(MODULE, "Transfer")
                .with_attribute("from", origin.who)
                .with_attribute("to", dest)
                .with_attribute("amount", amount),
        );
        Ok(())
    }
}
