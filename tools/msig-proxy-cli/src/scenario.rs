// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::MsigProxyCliError;
use crate::keys::Parties;
use crate::payloads::{self, HOSTILE_COMMISSION};
use msig_proxy_crypto::Address;
use msig_proxy_protocol::{
    Announcement, AnnouncementState, CallSubmitter, DelayedProxyWorkflow, OrderingLog,
    Provisioner, ProxyDelegate, ProxyType, StepGate, Timepoint, WorkflowConfig,
};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Outcome of a complete scenario run.
#[derive(Debug)]
pub(crate) struct ScenarioReport {
    pub(crate) proxied: Address,
    pub(crate) staking_multisig: Address,
    pub(crate) cancellation_multisig: Address,
    pub(crate) executed: AnnouncementState,
    pub(crate) rejected: AnnouncementState,
}

impl Display for ScenarioReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "proxied account:       {}", self.proxied)?;
        writeln!(f, "staking multisig:      {}", self.staking_multisig)?;
        writeln!(f, "cancellation multisig: {}", self.cancellation_multisig)?;
        writeln!(f, "validator setup:       {}", describe(&self.executed))?;
        write!(f, "commission change:     {}", describe(&self.rejected))
    }
}

fn describe(state: &AnnouncementState) -> String {
    match state {
        AnnouncementState::Executed {
            announced_at,
            executed_at,
        } => format!("announced at {announced_at}, executed at {executed_at}"),
        AnnouncementState::Cancelled {
            announced_at,
            cancelled_at,
        } => format!("announced at {announced_at}, rejected at {cancelled_at}"),
        other => other.name().to_string(),
    }
}

/// The complete demonstration: provisioning of the proxied account and its two multisig proxies,
/// a legitimate announcement that gets executed after the delay and an unexpected one that gets
/// rejected by the cancellation group.
pub(crate) struct Scenario<L> {
    ledger: Arc<L>,
    config: WorkflowConfig,
    parties: Parties,
    gate: Arc<dyn StepGate>,
}

impl<L> Scenario<L>
where
    L: OrderingLog,
{
    pub(crate) fn new(
        ledger: Arc<L>,
        config: WorkflowConfig,
        parties: Parties,
        gate: Arc<dyn StepGate>,
    ) -> Self {
        Scenario {
            ledger,
            config,
            parties,
            gate,
        }
    }

    async fn provision(&self) -> Result<Address, MsigProxyCliError> {
        let provisioner = Provisioner::new(CallSubmitter::new(Arc::clone(&self.ledger)), self.config);
        let Parties {
            spawner,
            funder,
            staking,
            cancellation,
        } = &self.parties;

        let pure = provisioner
            .create_pure_proxy(spawner, ProxyType::Any, 0, 0)
            .await?;
        provisioner
            .fund(funder, pure, self.config.funding_amount)
            .await?;
        self.gate.proceed("creation and funding of the pure proxy account").await;

        provisioner
            .create_and_endow_multisig(&cancellation.group, funder)
            .await?;
        let added = provisioner
            .add_proxy_via_pure(
                spawner,
                pure,
                cancellation.group.address(),
                ProxyType::CancelProxy,
                0,
            )
            .await?;
        info!("cancellation multisig added as proxy at {}", added.timepoint);
        self.gate.proceed("registration of the cancellation multisig").await;

        provisioner
            .create_and_endow_multisig(&staking.group, funder)
            .await?;
        let added = provisioner
            .add_proxy_via_pure(
                spawner,
                pure,
                staking.group.address(),
                ProxyType::Staking,
                self.config.announce_delay,
            )
            .await?;
        info!("staking multisig added as proxy at {}", added.timepoint);
        self.gate.proceed("registration of the staking multisig").await;

        Ok(pure)
    }

    fn workflow(&self, pure: Address) -> DelayedProxyWorkflow<L> {
        DelayedProxyWorkflow::new(
            Arc::clone(&self.ledger),
            self.config,
            pure,
            ProxyDelegate::new(
                self.parties.staking.group.clone(),
                ProxyType::Staking,
                self.config.announce_delay,
            ),
            ProxyDelegate::new(
                self.parties.cancellation.group.clone(),
                ProxyType::CancelProxy,
                0,
            ),
        )
        .with_gate(Arc::clone(&self.gate))
    }

    async fn become_validator(
        &self,
        workflow: &DelayedProxyWorkflow<L>,
    ) -> Result<AnnouncementState, MsigProxyCliError> {
        let session_key_owners = match self.parties.staking.signers.as_slice() {
            [first, second, ..] => (first.address(), second.address()),
            [only] => (only.address(), only.address()),
            [] => (self.parties.funder.address(), self.parties.funder.address()),
        };
        let action = payloads::become_validator(
            self.parties.funder.address(),
            self.config.funding_amount,
            session_key_owners,
        )?;

        let mut announcement = Announcement::new(action);
        let signers = self.parties.staking.signers();
        workflow.announce_and_execute(&mut announcement, &signers).await?;
        Ok(announcement.state())
    }

    async fn reject_unexpected_announcement(
        &self,
        workflow: &DelayedProxyWorkflow<L>,
    ) -> Result<(AnnouncementState, Timepoint), MsigProxyCliError> {
        let action = payloads::validate(HOSTILE_COMMISSION)?.to_opaque()?;
        let mut announcement = Announcement::new(action);
        let announced_at = workflow
            .announce(&mut announcement, &self.parties.staking.signers())
            .await?;

        // in a real deployment a watchdog inspecting the announcements of the staking multisig
        // would notice this one doesn't match any expected action
        warn!(
            "detected an announcement of an unknown call {} at {announced_at}, initiating its cancellation",
            announcement.call_hash()
        );

        let cancelled_at = workflow
            .cancel(&mut announcement, &self.parties.cancellation.signers())
            .await?;
        Ok((announcement.state(), cancelled_at))
    }

    #[instrument(skip(self))]
    pub(crate) async fn run(&self) -> Result<ScenarioReport, MsigProxyCliError> {
        let pure = self.provision().await?;
        let workflow = self.workflow(pure);

        let executed = self.become_validator(&workflow).await?;
        self.gate.proceed("execution of the announced validator setup").await;

        let (rejected, cancelled_at) = self.reject_unexpected_announcement(&workflow).await?;
        info!("the unexpected announcement got rejected at {cancelled_at}");

        Ok(ScenarioReport {
            proxied: pure,
            staking_multisig: workflow.staking().address(),
            cancellation_multisig: workflow.cancellation().address(),
            executed,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Groups;
    use msig_proxy_ledger_sim::{SealingMode, SimulatedLedger, SimulatedLedgerConfig};
    use msig_proxy_protocol::NoPacing;
    use std::time::Duration;

    const ENDOWMENT: u128 = 1_000_000_000_000_000_000;

    fn simulated(parties: &Parties, report_positions: bool) -> Arc<SimulatedLedger> {
        let config = SimulatedLedgerConfig::default()
            .with_sealing(SealingMode::Interval(Duration::from_millis(50)))
            .with_endowment(parties.spawner.address(), ENDOWMENT)
            .with_endowment(parties.funder.address(), ENDOWMENT);
        SimulatedLedger::new(if report_positions {
            config
        } else {
            config.without_positions()
        })
    }

    async fn run_scenario(report_positions: bool) {
        let parties = Parties::from_config(&Groups::default()).unwrap();
        let ledger = simulated(&parties, report_positions);
        let scenario = Scenario::new(
            ledger.clone(),
            WorkflowConfig::default(),
            parties,
            Arc::new(NoPacing),
        );

        let report = scenario.run().await.unwrap();
        ledger.shutdown();

        let AnnouncementState::Executed {
            announced_at,
            executed_at,
        } = report.executed
        else {
            panic!("validator setup was not executed: {:?}", report.executed)
        };
        assert!(executed_at.height > announced_at.height + 5);
        assert!(matches!(report.rejected, AnnouncementState::Cancelled { .. }));
        assert_ne!(report.staking_multisig, report.cancellation_multisig);
    }

    #[tokio::test(start_paused = true)]
    async fn reference_scenario_completes() {
        run_scenario(true).await
    }

    #[tokio::test(start_paused = true)]
    async fn reference_scenario_completes_with_hash_scanning() {
        run_scenario(false).await
    }
}
