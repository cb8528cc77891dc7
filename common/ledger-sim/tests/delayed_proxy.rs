// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use msig_proxy_crypto::KeyPair;
use msig_proxy_ledger_sim::{SimulatedLedger, SimulatedLedgerConfig};
use msig_proxy_protocol::call::{ProxyCall, UtilityCall};
use msig_proxy_protocol::{
    Announcement, AnnouncementState, CallSubmitter, DelayedProxyWorkflow, MultisigCoordinator,
    MultisigGroup, OpaqueCall, ProtocolError, ProxyDelegate, ProxyType, Provisioner, RuntimeCall,
    WorkflowConfig,
};
use std::sync::Arc;

const ENDOWMENT: u128 = 1_000_000_000_000_000_000;

struct Scenario {
    ledger: Arc<SimulatedLedger>,
    workflow: DelayedProxyWorkflow<SimulatedLedger>,
    config: WorkflowConfig,
    alice: KeyPair,
    bob: KeyPair,
    charlie: KeyPair,
}

fn dev(name: &str) -> KeyPair {
    KeyPair::from_dev_uri(&format!("//{name}"))
}

// pure proxy spawned by Eve and funded by Ferdie,
// {Charlie, Dave, Ferdie} as its 1-of-3 cancel proxy,
// {Alice, Dave, Bob} as its 2-of-3 staking proxy with the announcement delay
async fn provision(config: SimulatedLedgerConfig) -> Scenario {
    let [alice, bob, charlie, dave, eve, ferdie] =
        ["Alice", "Bob", "Charlie", "Dave", "Eve", "Ferdie"].map(dev);

    let ledger = SimulatedLedger::new(
        config
            .with_endowment(eve.address(), ENDOWMENT)
            .with_endowment(ferdie.address(), ENDOWMENT),
    );
    let workflow_config = WorkflowConfig::default();
    let provisioner = Provisioner::new(CallSubmitter::new(ledger.clone()), workflow_config);

    let pure = provisioner
        .create_pure_proxy(&eve, ProxyType::Any, 0, 0)
        .await
        .unwrap();
    provisioner
        .fund(&ferdie, pure, workflow_config.funding_amount)
        .await
        .unwrap();

    let cancellation =
        MultisigGroup::any_of([charlie.address(), dave.address(), ferdie.address()]).unwrap();
    provisioner
        .create_and_endow_multisig(&cancellation, &ferdie)
        .await
        .unwrap();
    provisioner
        .add_proxy_via_pure(&eve, pure, cancellation.address(), ProxyType::CancelProxy, 0)
        .await
        .unwrap();

    let staking = MultisigGroup::new([alice.address(), dave.address(), bob.address()], 2).unwrap();
    provisioner
        .create_and_endow_multisig(&staking, &ferdie)
        .await
        .unwrap();
    provisioner
        .add_proxy_via_pure(
            &eve,
            pure,
            staking.address(),
            ProxyType::Staking,
            workflow_config.announce_delay,
        )
        .await
        .unwrap();

    let workflow = DelayedProxyWorkflow::new(
        ledger.clone(),
        workflow_config,
        pure,
        ProxyDelegate::new(staking, ProxyType::Staking, workflow_config.announce_delay),
        ProxyDelegate::new(cancellation, ProxyType::CancelProxy, 0),
    );

    Scenario {
        ledger,
        workflow,
        config: workflow_config,
        alice,
        bob,
        charlie,
    }
}

fn staking_payload() -> OpaqueCall {
    let calls = [
        RuntimeCall::opaque("staking", "bond", vec![1; 16]),
        RuntimeCall::opaque("session", "set_keys", vec![2; 32]),
        RuntimeCall::opaque("staking", "validate", vec![0; 4]),
    ]
    .iter()
    .map(|call| call.to_opaque().unwrap())
    .collect();
    RuntimeCall::Utility(UtilityCall::BatchAll { calls })
        .to_opaque()
        .unwrap()
}

#[tokio::test]
async fn announced_payload_executes_once_the_delay_has_passed() {
    let s = provision(SimulatedLedgerConfig::default()).await;
    let signers = [&s.alice, &s.bob];
    let payload = staking_payload();

    let mut announcement = Announcement::new(payload.clone());
    let announced_at = s.workflow.announce(&mut announcement, &signers).await.unwrap();
    let staking = s.workflow.staking().address();
    let recorded = s
        .ledger
        .inspect(|state| state.announcements(&staking).to_vec())
        .await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].height, announced_at.height);
    assert_eq!(recorded[0].call_hash, payload.hash());

    // going straight for the execution is rejected by the ledger itself
    let premature = RuntimeCall::Proxy(ProxyCall::ProxyAnnounced {
        delegate: staking,
        real: s.workflow.proxied(),
        force_proxy_type: None,
        call: payload.clone(),
    });
    let coordinator =
        MultisigCoordinator::new(CallSubmitter::new(s.ledger.clone()), s.config.max_weight);
    let err = coordinator
        .execute_call(&s.workflow.staking().group, &signers, &premature)
        .await
        .unwrap_err();
    assert!(err
        .dispatch_error()
        .is_some_and(|detail| detail.is("proxy", "Unannounced")));

    let (elapsed, _) = tokio::join!(s.workflow.await_delay(&mut announcement), async {
        for _ in 0..s.config.announce_delay {
            tokio::task::yield_now().await;
            s.ledger.seal_block().await;
        }
    });
    assert!(elapsed.unwrap() >= announced_at.height + s.config.announce_delay);

    // the premature attempt left its approval behind, but it was for a different call
    let executed_at = s.workflow.execute(&mut announcement, &signers).await.unwrap();
    assert!(matches!(
        announcement.state(),
        AnnouncementState::Executed { .. }
    ));
    assert!(executed_at.height > announced_at.height + s.config.announce_delay);
    assert!(s
        .ledger
        .inspect(|state| state.announcements(&staking).is_empty())
        .await);
}

#[tokio::test]
async fn cancellation_before_the_delay_forecloses_execution() {
    let s = provision(SimulatedLedgerConfig::default()).await;
    let signers = [&s.alice, &s.bob];
    let payload = staking_payload();

    // the two rounds of the announcement should land at heights 199 and 200
    let (height, _) = s.ledger.best_block().await;
    s.ledger.produce_blocks(198 - height).await;

    let mut announcement = Announcement::new(payload.clone());
    let announced_at = s.workflow.announce(&mut announcement, &signers).await.unwrap();
    assert_eq!(announced_at.height, 200);
    assert_eq!(announcement.executable_from(), Some(205));

    s.ledger.produce_blocks(2).await;
    let mut observed = Announcement::observed(payload, announced_at, s.config.announce_delay);
    let cancelled_at = s
        .workflow
        .cancel(&mut observed, &[&s.charlie])
        .await
        .unwrap();
    assert_eq!(cancelled_at.height, 203);

    s.ledger.produce_blocks(2).await;
    assert_eq!(s.workflow.await_delay(&mut announcement).await.unwrap(), 205);

    let err = s
        .workflow
        .execute(&mut announcement, &signers)
        .await
        .unwrap_err();
    let ProtocolError::DispatchRejected { detail, height, .. } = &err else {
        panic!("unexpected error: {err}")
    };
    assert!(detail.is("proxy", "Unannounced"));
    assert!(*height > 205);
    assert!(matches!(
        announcement.state(),
        AnnouncementState::DelayElapsed { .. }
    ));
}

#[tokio::test]
async fn provisioning_works_without_reported_positions() {
    let s = provision(SimulatedLedgerConfig::default().without_positions()).await;
    let proxies = s
        .ledger
        .inspect(|state| state.proxies(&s.workflow.proxied()).to_vec())
        .await;

    assert_eq!(proxies.len(), 3);
    assert!(proxies
        .iter()
        .any(|def| def.delegate == s.workflow.cancellation().address()
            && def.proxy_type == ProxyType::CancelProxy
            && def.delay == 0));
    assert!(proxies
        .iter()
        .any(|def| def.delegate == s.workflow.staking().address()
            && def.proxy_type == ProxyType::Staking
            && def.delay == s.config.announce_delay));
}
