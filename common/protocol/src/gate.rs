// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

/// Hook awaited between consecutive protocol steps, e.g. to let an operator follow a demo run.
#[async_trait]
pub trait StepGate: Send + Sync {
    async fn proceed(&self, completed_step: &str);
}

/// Gate that never holds anything back.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

#[async_trait]
impl StepGate for NoPacing {
    async fn proceed(&self, _completed_step: &str) {}
}
