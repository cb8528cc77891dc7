// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ConfigOverridableArgs;
use crate::config::Config;

pub trait ConfigOverride {
    fn override_config(self, config: &mut Config);
}

impl ConfigOverride for ConfigOverridableArgs {
    fn override_config(self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.ledger.backend = backend
        }

        if let Some(rpc_url) = self.rpc_url {
            config.ledger.rpc_url = rpc_url
        }

        if let Some(websocket_url) = self.websocket_url {
            config.ledger.websocket_url = websocket_url
        }

        if let Some(block_time) = self.block_time {
            config.simulated.block_time = block_time
        }

        if self.without_positions {
            config.simulated.report_positions = false
        }

        if let Some(announce_delay) = self.announce_delay {
            config.protocol.announce_delay = announce_delay
        }

        if self.interactive {
            config.pacing.interactive = true
        }
    }
}
