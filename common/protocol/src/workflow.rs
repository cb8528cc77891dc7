// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::call::{Balance, CallHash, OpaqueCall, ProxyCall, ProxyType, RuntimeCall, Weight};
use crate::coordinator::{MultisigCoordinator, DEFAULT_MAX_WEIGHT};
use crate::delay::DelayWaiter;
use crate::error::ProtocolError;
use crate::gate::StepGate;
use crate::group::MultisigGroup;
use crate::ledger::OrderingLog;
use crate::submitter::CallSubmitter;
use crate::timepoint::Timepoint;
use msig_proxy_crypto::{Address, KeyPair};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const DEFAULT_FUNDING_AMOUNT: Balance = 123_456_789_012_345;
pub const DEFAULT_ANNOUNCE_DELAY: u64 = 5;

/// Parameters of the protocol that used to be hardcoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on the weight of calls dispatched by multisig executions.
    pub max_weight: Weight,

    /// Amount transferred to newly created accounts so that they exist on the ledger.
    pub funding_amount: Balance,

    /// Number of blocks an announced call has to wait before it can be executed.
    pub announce_delay: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            max_weight: DEFAULT_MAX_WEIGHT,
            funding_amount: DEFAULT_FUNDING_AMOUNT,
            announce_delay: DEFAULT_ANNOUNCE_DELAY,
        }
    }
}

/// A multisig group registered as a proxy of the proxied account.
#[derive(Debug, Clone)]
pub struct ProxyDelegate {
    pub group: MultisigGroup,
    pub proxy_type: ProxyType,
    pub delay: u64,
}

impl ProxyDelegate {
    pub fn new(group: MultisigGroup, proxy_type: ProxyType, delay: u64) -> Self {
        ProxyDelegate {
            group,
            proxy_type,
            delay,
        }
    }

    pub fn address(&self) -> Address {
        self.group.address()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementState {
    Unannounced,
    Announced {
        announced_at: Timepoint,
        executable_from: u64,
    },
    DelayElapsed {
        announced_at: Timepoint,
        observed_height: u64,
    },
    Executed {
        announced_at: Timepoint,
        executed_at: Timepoint,
    },
    Cancelled {
        announced_at: Timepoint,
        cancelled_at: Timepoint,
    },
}

impl AnnouncementState {
    pub fn name(&self) -> &'static str {
        match self {
            AnnouncementState::Unannounced => "unannounced",
            AnnouncementState::Announced { .. } => "announced",
            AnnouncementState::DelayElapsed { .. } => "delay-elapsed",
            AnnouncementState::Executed { .. } => "executed",
            AnnouncementState::Cancelled { .. } => "cancelled",
        }
    }

    pub fn announced_at(&self) -> Option<Timepoint> {
        match *self {
            AnnouncementState::Unannounced => None,
            AnnouncementState::Announced { announced_at, .. }
            | AnnouncementState::DelayElapsed { announced_at, .. }
            | AnnouncementState::Executed { announced_at, .. }
            | AnnouncementState::Cancelled { announced_at, .. } => Some(announced_at),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnnouncementState::Executed { .. } | AnnouncementState::Cancelled { .. }
        )
    }
}

/// A single action going through the announce, delay and execute (or cancel) sequence.
#[derive(Debug, Clone)]
pub struct Announcement {
    action: OpaqueCall,
    state: AnnouncementState,
}

impl Announcement {
    pub fn new(action: OpaqueCall) -> Self {
        Announcement {
            action,
            state: AnnouncementState::Unannounced,
        }
    }

    /// Announcement somebody else has already put on the ledger, e.g. one observed by a cancellation group.
    pub fn observed(action: OpaqueCall, announced_at: Timepoint, delay: u64) -> Self {
        Announcement {
            action,
            state: AnnouncementState::Announced {
                announced_at,
                executable_from: announced_at.height + delay,
            },
        }
    }

    pub fn action(&self) -> &OpaqueCall {
        &self.action
    }

    pub fn call_hash(&self) -> CallHash {
        self.action.hash()
    }

    pub fn state(&self) -> AnnouncementState {
        self.state
    }

    pub fn executable_from(&self) -> Option<u64> {
        match self.state {
            AnnouncementState::Announced {
                executable_from, ..
            } => Some(executable_from),
            _ => None,
        }
    }

    fn invalid(&self, attempted: &'static str) -> ProtocolError {
        ProtocolError::InvalidTransition {
            attempted,
            state: self.state.name(),
        }
    }
}

/// Announce, delay and execute sequence of a staking multisig acting through its proxy relationship,
/// together with the veto path of an independent cancellation multisig.
pub struct DelayedProxyWorkflow<L> {
    coordinator: MultisigCoordinator<L>,
    waiter: DelayWaiter<L>,
    proxied: Address,
    staking: ProxyDelegate,
    cancellation: ProxyDelegate,
}

impl<L> DelayedProxyWorkflow<L>
where
    L: OrderingLog,
{
    pub fn new(
        ledger: Arc<L>,
        config: WorkflowConfig,
        proxied: Address,
        staking: ProxyDelegate,
        cancellation: ProxyDelegate,
    ) -> Self {
        DelayedProxyWorkflow {
            coordinator: MultisigCoordinator::new(
                CallSubmitter::new(Arc::clone(&ledger)),
                config.max_weight,
            ),
            waiter: DelayWaiter::new(ledger),
            proxied,
            staking,
            cancellation,
        }
    }

    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn StepGate>) -> Self {
        self.coordinator = self.coordinator.with_gate(gate);
        self
    }

    pub fn proxied(&self) -> Address {
        self.proxied
    }

    pub fn staking(&self) -> &ProxyDelegate {
        &self.staking
    }

    pub fn cancellation(&self) -> &ProxyDelegate {
        &self.cancellation
    }

    /// Has the staking multisig announce the hash of the action on behalf of the proxied account.
    #[instrument(skip_all, fields(call_hash = %announcement.call_hash()))]
    pub async fn announce(
        &self,
        announcement: &mut Announcement,
        signers: &[&KeyPair],
    ) -> Result<Timepoint, ProtocolError> {
        if announcement.state != AnnouncementState::Unannounced {
            return Err(announcement.invalid("announce"));
        }

        let call = RuntimeCall::Proxy(ProxyCall::Announce {
            real: self.proxied,
            call_hash: announcement.call_hash(),
        });
        let announced_at = self
            .coordinator
            .execute_call(&self.staking.group, signers, &call)
            .await?;

        let executable_from = announced_at.height + self.staking.delay;
        info!(
            "{} got announced at {announced_at}; it can be executed from height {executable_from}",
            announcement.action.describe()
        );
        announcement.state = AnnouncementState::Announced {
            announced_at,
            executable_from,
        };
        Ok(announced_at)
    }

    /// Suspends until the announcement delay has passed.
    pub async fn await_delay(&self, announcement: &mut Announcement) -> Result<u64, ProtocolError> {
        let AnnouncementState::Announced {
            announced_at,
            executable_from,
        } = announcement.state
        else {
            return Err(announcement.invalid("await the delay of"));
        };

        info!("waiting for height {executable_from}");
        let observed_height = self.waiter.await_height(executable_from).await?;
        announcement.state = AnnouncementState::DelayElapsed {
            announced_at,
            observed_height,
        };
        Ok(observed_height)
    }

    /// Executes the announced action through the staking multisig.
    /// Fails with a dispatch rejection if the announcement got rejected in the meantime.
    #[instrument(skip_all, fields(call_hash = %announcement.call_hash()))]
    pub async fn execute(
        &self,
        announcement: &mut Announcement,
        signers: &[&KeyPair],
    ) -> Result<Timepoint, ProtocolError> {
        let AnnouncementState::DelayElapsed { announced_at, .. } = announcement.state else {
            return Err(announcement.invalid("execute"));
        };

        let call = RuntimeCall::Proxy(ProxyCall::ProxyAnnounced {
            delegate: self.staking.address(),
            real: self.proxied,
            force_proxy_type: Some(self.staking.proxy_type),
            call: announcement.action.clone(),
        });
        let executed_at = match self
            .coordinator
            .execute_call(&self.staking.group, signers, &call)
            .await
        {
            Ok(timepoint) => timepoint,
            Err(err) => {
                warn!("failed to execute the announced call: {err}");
                return Err(err);
            }
        };

        info!(
            "{} got executed at {executed_at}",
            announcement.action.describe()
        );
        announcement.state = AnnouncementState::Executed {
            announced_at,
            executed_at,
        };
        Ok(executed_at)
    }

    /// Has the cancellation multisig reject the announcement through its own proxy relationship.
    #[instrument(skip_all, fields(call_hash = %announcement.call_hash()))]
    pub async fn cancel(
        &self,
        announcement: &mut Announcement,
        signers: &[&KeyPair],
    ) -> Result<Timepoint, ProtocolError> {
        let announced_at = match announcement.state {
            AnnouncementState::Announced { announced_at, .. }
            | AnnouncementState::DelayElapsed { announced_at, .. } => announced_at,
            _ => return Err(announcement.invalid("cancel")),
        };

        let rejection = RuntimeCall::Proxy(ProxyCall::RejectAnnouncement {
            delegate: self.staking.address(),
            call_hash: announcement.call_hash(),
        });
        let call = RuntimeCall::Proxy(ProxyCall::Proxy {
            real: self.proxied,
            force_proxy_type: Some(self.cancellation.proxy_type),
            call: rejection.to_opaque()?,
        });
        let cancelled_at = self
            .coordinator
            .execute_call(&self.cancellation.group, signers, &call)
            .await?;

        info!(
            "announcement of {} got rejected at {cancelled_at}",
            announcement.action.describe()
        );
        announcement.state = AnnouncementState::Cancelled {
            announced_at,
            cancelled_at,
        };
        Ok(cancelled_at)
    }

    /// Announces the action, waits out the delay and executes it.
    pub async fn announce_and_execute(
        &self,
        announcement: &mut Announcement,
        signers: &[&KeyPair],
    ) -> Result<Timepoint, ProtocolError> {
        self.announce(announcement, signers).await?;
        self.await_delay(announcement).await?;
        self.execute(announcement, signers).await
    }
}
