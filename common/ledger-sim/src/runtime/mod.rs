// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use msig_proxy_crypto::Address;
use msig_proxy_protocol::call::{
    Balance, BalancesCall, MultisigCall, OpaqueCall, ProxyCall, ProxyType, RuntimeCall,
    UtilityCall,
};
use msig_proxy_protocol::ledger::{DispatchError, DispatchOutcome, LedgerEvent};
use msig_proxy_protocol::SignedExtrinsic;
use std::collections::HashMap;
use tracing::{debug, trace};

pub(crate) mod balances;
pub(crate) mod multisig;
pub(crate) mod proxy;

pub use multisig::PendingMultisig;
pub use proxy::{AnnouncementRecord, ProxyDefinition};

pub(crate) type DispatchResult = Result<(), DispatchError>;

// modules a `Staking` proxy is allowed to touch
const STAKING_MODULES: &[&str] = &["staking", "session", "fast_unstake", "nomination_pools"];

pub(crate) fn error(module: &str, name: &str) -> DispatchError {
    DispatchError::new(module, name)
}

/// Position of the extrinsic currently being applied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExtrinsicContext {
    pub height: u64,
    pub index: u32,
}

/// Account a call is dispatched as, optionally restricted by the type of the proxy relationship it came through.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Origin {
    pub who: Address,
    pub filter: Option<ProxyType>,
}

impl Origin {
    pub(crate) fn signed(who: Address) -> Self {
        Origin { who, filter: None }
    }

    pub(crate) fn proxied(who: Address, proxy_type: ProxyType) -> Self {
        Origin {
            who,
            filter: Some(proxy_type),
        }
    }

    fn allows(&self, call: &RuntimeCall) -> bool {
        self.filter
            .map(|proxy_type| proxy_type_allows(proxy_type, call))
            .unwrap_or(true)
    }
}

pub(crate) fn proxy_type_allows(proxy_type: ProxyType, call: &RuntimeCall) -> bool {
    match proxy_type {
        ProxyType::Any => true,
        ProxyType::NonTransfer => !matches!(call, RuntimeCall::Balances(_)),
        ProxyType::Staking => match call {
            RuntimeCall::Utility(_) => true,
            RuntimeCall::Opaque { module, .. } => STAKING_MODULES.contains(&module.as_str()),
            _ => false,
        },
        ProxyType::CancelProxy => matches!(
            call,
            RuntimeCall::Proxy(ProxyCall::RejectAnnouncement { .. })
                | RuntimeCall::Utility(_)
                | RuntimeCall::Multisig(_)
        ),
    }
}

/// Whether a delegate of type `this` may hand out or revoke relationships of type `other`.
pub(crate) fn is_superset(this: ProxyType, other: ProxyType) -> bool {
    match (this, other) {
        (ProxyType::Any, _) => true,
        (_, ProxyType::Any) => false,
        (ProxyType::NonTransfer, _) => true,
        (this, other) => this == other,
    }
}

/// Complete ledger state. Cheap enough to clone for transactional dispatch of a single extrinsic.
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    pub(crate) balances: HashMap<Address, Balance>,
    pub(crate) nonces: HashMap<Address, u64>,
    pub(crate) multisigs: HashMap<(Address, msig_proxy_protocol::CallHash), PendingMultisig>,
    pub(crate) proxies: HashMap<Address, Vec<ProxyDefinition>>,
    pub(crate) announcements: HashMap<Address, Vec<AnnouncementRecord>>,
}

impl RuntimeState {
    pub fn with_endowments<I>(endowments: I) -> Self
    where
        I: IntoIterator<Item = (Address, Balance)>,
    {
        RuntimeState {
            balances: endowments.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn balance(&self, account: &Address) -> Balance {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn nonce(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or_default()
    }

    pub fn proxies(&self, real: &Address) -> &[ProxyDefinition] {
        self.proxies.get(real).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn announcements(&self, delegate: &Address) -> &[AnnouncementRecord] {
        self.announcements
            .get(delegate)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn pending_multisig(
        &self,
        multisig: &Address,
        call_hash: &msig_proxy_protocol::CallHash,
    ) -> Option<&PendingMultisig> {
        self.multisigs.get(&(*multisig, *call_hash))
    }
}

/// Outcome of applying a single extrinsic.
#[derive(Debug, Clone)]
pub(crate) struct Receipt {
    pub outcome: DispatchOutcome,
    pub events: Vec<LedgerEvent>,
}

/// Applies the extrinsic on top of the state. A failed dispatch reverts everything apart from the nonce bump.
pub(crate) fn apply_extrinsic(
    state: &mut RuntimeState,
    ctx: ExtrinsicContext,
    extrinsic: &SignedExtrinsic,
) -> Receipt {
    let sender = extrinsic.sender();
    let snapshot = state.clone();

    let mut dispatcher = Dispatcher::new(state, ctx);
    let result = dispatcher.dispatch(Origin::signed(sender), &extrinsic.call);
    let mut events = dispatcher.into_events();

    let outcome = match result {
        Ok(()) => {
            events.push(LedgerEvent::new("system", "ExtrinsicSuccess"));
            DispatchOutcome::Applied
        }
        Err(err) => {
            debug!("extrinsic {} from {sender} failed: {err}", ctx.index);
            *state = snapshot;
            events = vec![
                LedgerEvent::new("system", "ExtrinsicFailed").with_attribute("error", &err)
            ];
            DispatchOutcome::Failed(err)
        }
    };
    *state.nonces.entry(sender).or_default() += 1;

    Receipt { outcome, events }
}

pub(crate) struct Dispatcher<'a> {
    pub(crate) state: &'a mut RuntimeState,
    pub(crate) ctx: ExtrinsicContext,
    events: Vec<LedgerEvent>,
}

impl<'a> Dispatcher<'a> {
    pub(crate) fn new(state: &'a mut RuntimeState, ctx: ExtrinsicContext) -> Self {
        Dispatcher {
            state,
            ctx,
            events: Vec::new(),
        }
    }

    pub(crate) fn into_events(self) -> Vec<LedgerEvent> {
        self.events
    }

    pub(crate) fn deposit_event(&mut self, event: LedgerEvent) {
        trace!("deposited {event}");
        self.events.push(event)
    }

    pub(crate) fn dispatch(&mut self, origin: Origin, call: &OpaqueCall) -> DispatchResult {
        let decoded = call
            .decode()
            .map_err(|err| error("system", "UndecodableCall").with_detail(err.to_string()))?;
        self.dispatch_call(origin, &decoded)
    }

    fn dispatch_call(&mut self, origin: Origin, call: &RuntimeCall) -> DispatchResult {
        if !origin.allows(call) {
            return Err(error("system", "CallFiltered").with_detail(call.label()));
        }
        trace!("dispatching {} as {}", call.label(), origin.who);

        match call {
            RuntimeCall::Multisig(call) => self.dispatch_multisig(origin, call),
            RuntimeCall::Proxy(call) => self.dispatch_proxy(origin, call),
            RuntimeCall::Balances(BalancesCall::TransferKeepAlive { dest, amount }) => {
                self.transfer_keep_alive(origin, *dest, *amount)
            }
            RuntimeCall::Utility(UtilityCall::BatchAll { calls }) => self.batch_all(origin, calls),
            RuntimeCall::Opaque { module, method, args } => {
                self.deposit_event(
                    LedgerEvent::new(module.as_str(), "CallDispatched")
                        .with_attribute("origin", origin.who)
                        .with_attribute("method", method)
                        .with_attribute("args_len", args.len()),
                );
                Ok(())
            }
        }
    }

    fn dispatch_multisig(&mut self, origin: Origin, call: &MultisigCall) -> DispatchResult {
        match call {
            MultisigCall::ApproveAsMulti {
                threshold,
                other_signatories,
                maybe_timepoint,
                call_hash,
                max_weight,
            } => self.approve_as_multi(
                origin,
                *threshold,
                other_signatories,
                *maybe_timepoint,
                *call_hash,
                *max_weight,
            ),
            MultisigCall::AsMulti {
                threshold,
                other_signatories,
                maybe_timepoint,
                call,
                max_weight,
                ..
            } => self.as_multi(
                origin,
                *threshold,
                other_signatories,
                *maybe_timepoint,
                call,
                *max_weight,
            ),
            MultisigCall::AsMultiThreshold1 {
                other_signatories,
                call,
            } => self.as_multi_threshold_1(origin, other_signatories, call),
            MultisigCall::CancelAsMulti {
                threshold,
                other_signatories,
                timepoint,
                call_hash,
            } => self.cancel_as_multi(origin, *threshold, other_signatories, *timepoint, *call_hash),
        }
    }

    fn dispatch_proxy(&mut self, origin: Origin, call: &ProxyCall) -> DispatchResult {
        match call {
            ProxyCall::CreatePure {
                proxy_type,
                delay,
                index,
            } => self.create_pure(origin, *proxy_type, *delay, *index),
            ProxyCall::AddProxy {
                delegate,
                proxy_type,
                delay,
            } => self.add_proxy(origin, *delegate, *proxy_type, *delay),
            ProxyCall::RemoveProxy {
                delegate,
                proxy_type,
                delay,
            } => self.remove_proxy(origin, *delegate, *proxy_type, *delay),
            ProxyCall::Proxy {
                real,
                force_proxy_type,
                call,
            } => self.proxy(origin, *real, *force_proxy_type, call),
            ProxyCall::Announce { real, call_hash } => self.announce(origin, *real, *call_hash),
            ProxyCall::ProxyAnnounced {
                delegate,
                real,
                force_proxy_type,
                call,
            } => self.proxy_announced(*delegate, *real, *force_proxy_type, call),
            ProxyCall::RejectAnnouncement {
                delegate,
                call_hash,
            } => self.reject_announcement(origin, *delegate, *call_hash),
            ProxyCall::RemoveAnnouncement { real, call_hash } => {
                self.remove_announcement(origin, *real, *call_hash)
            }
        }
    }

    fn batch_all(&mut self, origin: Origin, calls: &[OpaqueCall]) -> DispatchResult {
        for (index, call) in calls.iter().enumerate() {
            self.dispatch(origin, call).map_err(|err| {
                let detail = format!(
                    "batch interrupted at call {index}{}",
                    err.detail
                        .as_deref()
                        .map(|inner| format!(": {inner}"))
                        .unwrap_or_default()
                );
                err.with_detail(detail)
            })?;
        }
        self.deposit_event(
            LedgerEvent::new("utility", "BatchCompleted").with_attribute("calls", calls.len()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msig_proxy_crypto::KeyPair;

    fn opaque(call: RuntimeCall) -> OpaqueCall {
        call.to_opaque().unwrap()
    }

    #[test]
    fn proxy_types_filter_calls() {
        let bond = RuntimeCall::opaque("staking", "bond", vec![]);
        let remark = RuntimeCall::opaque("system", "remark", vec![]);
        let transfer = RuntimeCall::Balances(BalancesCall::TransferKeepAlive {
            dest: Address::from_bytes([1; 32]),
            amount: 1,
        });
        let reject = RuntimeCall::Proxy(ProxyCall::RejectAnnouncement {
            delegate: Address::from_bytes([1; 32]),
            call_hash: opaque(bond.clone()).hash(),
        });

        assert!(proxy_type_allows(ProxyType::Any, &transfer));
        assert!(!proxy_type_allows(ProxyType::NonTransfer, &transfer));
        assert!(proxy_type_allows(ProxyType::NonTransfer, &remark));
        assert!(proxy_type_allows(ProxyType::Staking, &bond));
        assert!(!proxy_type_allows(ProxyType::Staking, &remark));
        assert!(!proxy_type_allows(ProxyType::Staking, &reject));
        assert!(proxy_type_allows(ProxyType::CancelProxy, &reject));
        assert!(!proxy_type_allows(ProxyType::CancelProxy, &bond));
    }

    #[test]
    fn failed_extrinsics_only_bump_the_nonce() {
        let alice = KeyPair::from_dev_uri("//Alice");
        let bob = KeyPair::from_dev_uri("//Bob");
        let mut state = RuntimeState::with_endowments([(alice.address(), 1_000)]);

        // the first transfer succeeds, the second one fails and must not leave anything behind
        let batch = RuntimeCall::Utility(UtilityCall::BatchAll {
            calls: vec![
                opaque(RuntimeCall::Balances(BalancesCall::TransferKeepAlive {
                    dest: bob.address(),
                    amount: 100,
                })),
                opaque(RuntimeCall::Balances(BalancesCall::TransferKeepAlive {
                    dest: bob.address(),
                    amount: 10_000,
                })),
            ],
        });
        let extrinsic = SignedExtrinsic::sign(&alice, 0, opaque(batch));
        let receipt = apply_extrinsic(
            &mut state,
            ExtrinsicContext {
                height: 1,
                index: 0,
            },
            &extrinsic,
        );

        let DispatchOutcome::Failed(err) = receipt.outcome else {
            panic!("the batch should have failed")
        };
        assert!(err.is("balances", "InsufficientBalance"));
        assert!(err
            .detail
            .as_deref()
            .is_some_and(|detail| detail.starts_with("batch interrupted at call 1")));
        assert_eq!(state.balance(&alice.address()), 1_000);
        assert_eq!(state.balance(&bob.address()), 0);
        assert_eq!(state.nonce(&alice.address()), 1);
        assert!(receipt.events[0].is("system", "ExtrinsicFailed"));
    }
}
