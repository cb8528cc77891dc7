// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use super::{error, is_superset, DispatchResult, Dispatcher, Origin};
use msig_proxy_crypto::{Address, ContentHash};
use msig_proxy_protocol::call::{CallHash, OpaqueCall, ProxyCall, ProxyType, RuntimeCall};
use msig_proxy_protocol::ledger::LedgerEvent;
use msig_proxy_protocol::DispatchError;

const MODULE: &str = "proxy";

const PURE_ACCOUNT_DOMAIN: &[u8] = b"modlpy/proxy____";

pub const MAX_PROXIES: usize = 32;
pub const MAX_PENDING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyDefinition {
    pub delegate: Address,
    pub proxy_type: ProxyType,
    pub delay: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementRecord {
    pub real: Address,
    pub call_hash: CallHash,
    pub height: u64,
}

/// Account of a pure proxy; unique per spawner, creation extrinsic, type and disambiguation index.
pub fn pure_account(
    spawner: &Address,
    proxy_type: ProxyType,
    index: u16,
    height: u64,
    ext_index: u32,
) -> Address {
    let height = height.to_le_bytes();
    let ext_index = ext_index.to_le_bytes();
    let index = index.to_le_bytes();
    let digest = ContentHash::digest_with_domain(
        PURE_ACCOUNT_DOMAIN,
        [
            spawner.as_bytes().as_slice(),
            proxy_type.as_str().as_bytes(),
            index.as_slice(),
            height.as_slice(),
            ext_index.as_slice(),
        ],
    );
    Address::from_bytes(digest.to_bytes())
}

impl Dispatcher<'_> {
    fn find_proxy(
        &self,
        real: &Address,
        delegate: &Address,
        force_proxy_type: Option<ProxyType>,
    ) -> Result<ProxyDefinition, DispatchError> {
        self.state
            .proxies(real)
            .iter()
            .find(|def| {
                def.delegate == *delegate
                    && force_proxy_type.map_or(true, |forced| forced == def.proxy_type)
            })
            .copied()
            .ok_or_else(|| error(MODULE, "NotProxy"))
    }

    // dispatches `call` as `real`, restricted to what the proxy relationship permits
    fn do_proxy(
        &mut self,
        def: ProxyDefinition,
        real: Address,
        call: &OpaqueCall,
    ) -> DispatchResult {
        let decoded = call
            .decode()
            .map_err(|err| error("system", "UndecodableCall").with_detail(err.to_string()))?;

        // a delegate can't hand out more than it has itself
        if let RuntimeCall::Proxy(
            ProxyCall::AddProxy { proxy_type, .. } | ProxyCall::RemoveProxy { proxy_type, .. },
        ) = &decoded
        {
            if !is_superset(def.proxy_type, *proxy_type) {
                return Err(error(MODULE, "NoPermission"));
            }
        }

        self.dispatch(Origin::proxied(real, def.proxy_type), call)?;
        self.deposit_event(
            LedgerEvent::new(MODULE, "ProxyExecuted")
                .with_attribute("real", real)
                .with_attribute("delegate", def.delegate)
                .with_attribute("call", decoded.label()),
        );
        Ok(())
    }

    pub(super) fn create_pure(
        &mut self,
        origin: Origin,
        proxy_type: ProxyType,
        delay: u64,
        index: u16,
    ) -> DispatchResult {
        let pure = pure_account(
            &origin.who,
            proxy_type,
            index,
            self.ctx.height,
            self.ctx.index,
        );
        if self.state.proxies.contains_key(&pure) {
            return Err(error(MODULE, "Duplicate"));
        }
        self.state.proxies.insert(
            pure,
            vec![ProxyDefinition {
                delegate: origin.who,
                proxy_type,
                delay,
            }],
        );
        self.deposit_event(
            LedgerEvent::new(MODULE, "PureCreated")
                .with_attribute("pure", pure)
                .with_attribute("who", origin.who)
                .with_attribute("proxy_type", proxy_type)
                .with_attribute("disambiguation_index", index),
        );
        Ok(())
    }

    pub(super) fn add_proxy(
        &mut self,
        origin: Origin,
        delegate: Address,
        proxy_type: ProxyType,
        delay: u64,
    ) -> DispatchResult {
        let proxies = self.state.proxies.entry(origin.who).or_default();
        if proxies
            .iter()
            .any(|def| def.delegate == delegate && def.proxy_type == proxy_type)
        {
            return Err(error(MODULE, "Duplicate"));
        }
        if proxies.len() >= MAX_PROXIES {
            return Err(error(MODULE, "TooMany"));
        }
        proxies.push(ProxyDefinition {
            delegate,
            proxy_type,
            delay,
        });
        self.deposit_event(
            LedgerEvent::new(MODULE, "ProxyAdded")
                .with_attribute("delegator", origin.who)
                .with_attribute("delegatee", delegate)
                .with_attribute("proxy_type", proxy_type)
                .with_attribute("delay", delay),
        );
        Ok(())
    }

    pub(super) fn remove_proxy(
        &mut self,
        origin: Origin,
        delegate: Address,
        proxy_type: ProxyType,
        delay: u64,
    ) -> DispatchResult {
        let target = ProxyDefinition {
            delegate,
            proxy_type,
            delay,
        };
        let proxies = self.state.proxies.entry(origin.who).or_default();
        let Some(position) = proxies.iter().position(|def| *def == target) else {
            return Err(error(MODULE, "NotFound"));
        };
        proxies.remove(position);
        self.deposit_event(
            LedgerEvent::new(MODULE, "ProxyRemoved")
                .with_attribute("delegator", origin.who)
                .with_attribute("delegatee", delegate)
                .with_attribute("proxy_type", proxy_type)
                .with_attribute("delay", delay),
        );
        Ok(())
    }

    pub(super) fn proxy(
        &mut self,
        origin: Origin,
        real: Address,
        force_proxy_type: Option<ProxyType>,
        call: &OpaqueCall,
    ) -> DispatchResult {
        let def = self.find_proxy(&real, &origin.who, force_proxy_type)?;
        if def.delay != 0 {
            return Err(error(MODULE, "Unannounced")
                .with_detail(format!("delegate has a delay of {} blocks", def.delay)));
        }
        self.do_proxy(def, real, call)
    }

    pub(super) fn announce(
        &mut self,
        origin: Origin,
        real: Address,
        call_hash: CallHash,
    ) -> DispatchResult {
        self.find_proxy(&real, &origin.who, None)?;

        let height = self.ctx.height;
        let pending = self.state.announcements.entry(origin.who).or_default();
        if pending.len() >= MAX_PENDING {
            return Err(error(MODULE, "TooMany"));
        }
        pending.push(AnnouncementRecord {
            real,
            call_hash,
            height,
        });
        self.deposit_event(
            LedgerEvent::new(MODULE, "Announced")
                .with_attribute("real", real)
                .with_attribute("proxy", origin.who)
                .with_attribute("call_hash", call_hash),
        );
        Ok(())
    }

    pub(super) fn proxy_announced(
        &mut self,
        delegate: Address,
        real: Address,
        force_proxy_type: Option<ProxyType>,
        call: &OpaqueCall,
    ) -> DispatchResult {
        let def = self.find_proxy(&real, &delegate, force_proxy_type)?;
        let call_hash = call.hash();
        let now = self.ctx.height;

        let pending = self.state.announcements.entry(delegate).or_default();
        let before = pending.len();
        pending.retain(|announcement| {
            !(announcement.real == real
                && announcement.call_hash == call_hash
                && announcement.height + def.delay <= now)
        });
        if pending.len() == before {
            return Err(error(MODULE, "Unannounced")
                .with_detail(format!("no matured announcement of {call_hash} at height {now}")));
        }

        self.do_proxy(def, real, call)
    }

    pub(super) fn reject_announcement(
        &mut self,
        origin: Origin,
        delegate: Address,
        call_hash: CallHash,
    ) -> DispatchResult {
        let pending = self.state.announcements.entry(delegate).or_default();
        let before = pending.len();
        pending.retain(|announcement| {
            !(announcement.real == origin.who && announcement.call_hash == call_hash)
        });
        if pending.len() == before {
            return Err(error(MODULE, "NotFound"));
        }
        self.deposit_event(
            LedgerEvent::new(MODULE, "AnnouncementRejected")
                .with_attribute("real", origin.who)
                .with_attribute("delegate", delegate)
                .with_attribute("call_hash", call_hash),
        );
        Ok(())
    }

    pub(super) fn remove_announcement(
        &mut self,
        origin: Origin,
        real: Address,
        call_hash: CallHash,
    ) -> DispatchResult {
        let pending = self.state.announcements.entry(origin.who).or_default();
        let before = pending.len();
        pending.retain(|announcement| {
            !(announcement.real == real && announcement.call_hash == call_hash)
        });
        if pending.len() == before {
            return Err(error(MODULE, "NotFound"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{ExtrinsicContext, RuntimeState};
    use super::*;
    use msig_proxy_crypto::KeyPair;
    use msig_proxy_protocol::call::{BalancesCall, ProxyCall};

    fn ctx(height: u64) -> ExtrinsicContext {
        ExtrinsicContext { height, index: 0 }
    }

    fn opaque(call: RuntimeCall) -> OpaqueCall {
        call.to_opaque().unwrap()
    }

    struct Setup {
        state: RuntimeState,
        real: Address,
        spawner: Address,
        delegate: Address,
    }

    // `spawner` is the `Any` proxy of a fresh pure account,
    // `delegate` its `Staking` proxy with a delay of 5 blocks
    fn setup() -> Setup {
        let spawner = KeyPair::from_dev_uri("//Eve").address();
        let delegate = KeyPair::from_dev_uri("//Alice").address();
        let mut state = RuntimeState::default();

        let mut dispatcher = Dispatcher::new(&mut state, ctx(1));
        dispatcher
            .create_pure(Origin::signed(spawner), ProxyType::Any, 0, 0)
            .unwrap();
        let real: Address = dispatcher.into_events()[0]
            .attribute("pure")
            .unwrap()
            .parse()
            .unwrap();

        let mut dispatcher = Dispatcher::new(&mut state, ctx(2));
        let add = opaque(RuntimeCall::Proxy(ProxyCall::AddProxy {
            delegate,
            proxy_type: ProxyType::Staking,
            delay: 5,
        }));
        dispatcher
            .proxy(Origin::signed(spawner), real, Some(ProxyType::Any), &add)
            .unwrap();

        Setup {
            state,
            real,
            spawner,
            delegate,
        }
    }

    #[test]
    fn pure_accounts_are_unique_per_creation() {
        let eve = KeyPair::from_dev_uri("//Eve").address();
        let a = pure_account(&eve, ProxyType::Any, 0, 1, 0);
        assert_ne!(a, pure_account(&eve, ProxyType::Any, 1, 1, 0));
        assert_ne!(a, pure_account(&eve, ProxyType::Any, 0, 2, 0));
        assert_ne!(a, pure_account(&eve, ProxyType::Staking, 0, 1, 0));
        assert_eq!(a, pure_account(&eve, ProxyType::Any, 0, 1, 0));
    }

    #[test]
    fn delegates_with_a_delay_must_announce() {
        let mut s = setup();
        assert_eq!(s.state.proxies(&s.real).len(), 2);

        let bond = opaque(RuntimeCall::opaque("staking", "bond", vec![1]));
        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(10));
        let err = dispatcher
            .proxy(Origin::signed(s.delegate), s.real, None, &bond)
            .unwrap_err();
        assert!(err.is(MODULE, "Unannounced"));

        dispatcher
            .announce(Origin::signed(s.delegate), s.real, bond.hash())
            .unwrap();

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(14));
        let err = dispatcher
            .proxy_announced(s.delegate, s.real, Some(ProxyType::Staking), &bond)
            .unwrap_err();
        assert!(err.is(MODULE, "Unannounced"));

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(15));
        dispatcher
            .proxy_announced(s.delegate, s.real, Some(ProxyType::Staking), &bond)
            .unwrap();
        let events = dispatcher.into_events();
        assert!(events.iter().any(|e| e.is("staking", "CallDispatched")));
        assert!(s.state.announcements(&s.delegate).is_empty());
    }

    #[test]
    fn rejected_announcements_can_not_be_executed() {
        let mut s = setup();
        let bond = opaque(RuntimeCall::opaque("staking", "bond", vec![1]));

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(200));
        dispatcher
            .announce(Origin::signed(s.delegate), s.real, bond.hash())
            .unwrap();

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(203));
        dispatcher
            .reject_announcement(Origin::signed(s.real), s.delegate, bond.hash())
            .unwrap();
        let err = dispatcher
            .reject_announcement(Origin::signed(s.real), s.delegate, bond.hash())
            .unwrap_err();
        assert!(err.is(MODULE, "NotFound"));

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(206));
        let err = dispatcher
            .proxy_announced(s.delegate, s.real, None, &bond)
            .unwrap_err();
        assert!(err.is(MODULE, "Unannounced"));
    }

    #[test]
    fn proxied_calls_are_filtered_by_type() {
        let mut s = setup();
        let transfer = opaque(RuntimeCall::Balances(BalancesCall::TransferKeepAlive {
            dest: s.spawner,
            amount: 1,
        }));

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(10));
        dispatcher
            .announce(Origin::signed(s.delegate), s.real, transfer.hash())
            .unwrap();
        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(20));
        let err = dispatcher
            .proxy_announced(s.delegate, s.real, None, &transfer)
            .unwrap_err();
        assert!(err.is("system", "CallFiltered"));
    }

    #[test]
    fn delegates_can_not_escalate_their_permissions() {
        let mut s = setup();
        let stranger = KeyPair::from_dev_uri("//Ferdie").address();
        let add_any = opaque(RuntimeCall::Proxy(ProxyCall::AddProxy {
            delegate: stranger,
            proxy_type: ProxyType::Any,
            delay: 0,
        }));

        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(10));
        let err = dispatcher
            .proxy(Origin::signed(stranger), s.real, None, &add_any)
            .unwrap_err();
        assert!(err.is(MODULE, "NotProxy"));

        dispatcher
            .announce(Origin::signed(s.delegate), s.real, add_any.hash())
            .unwrap();
        let mut dispatcher = Dispatcher::new(&mut s.state, ctx(20));
        let err = dispatcher
            .proxy_announced(s.delegate, s.real, None, &add_any)
            .unwrap_err();
        assert!(err.is(MODULE, "NoPermission"));
    }
}
