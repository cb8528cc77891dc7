// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

// While using normal toml marshalling would have been way simpler with less overhead,
// it's useful to have comments attached to the saved config file to explain behaviour of
// particular fields.
// Note: any changes to the template must be reflected in the appropriate structs.
pub(crate) const CONFIG_TEMPLATE: &str = r#"
# This is a TOML config file.
# For more information, see https://github.com/toml-lang/toml

[ledger]
# Ordering log to run against. Either 'simulated' (in-process) or 'comet' (a CometBFT node).
backend = '{{ ledger.backend }}'

# Url to the rpc endpoint of the CometBFT node, for example `http://127.0.0.1:26657`
rpc_url = '{{ ledger.rpc_url }}'

# Url to the websocket endpoint of the CometBFT node, for example `ws://127.0.0.1:26657/websocket`
websocket_url = '{{ ledger.websocket_url }}'

[simulated]
# Interval at which the simulated ledger produces new blocks.
block_time = '{{ simulated.block_time }}'

# Whether inclusion reports tell the position of a submission within its block.
# When disabled, timepoints get recovered by scanning the including block.
report_positions = {{ simulated.report_positions }}

# Height of the genesis block of the simulated ledger.
genesis_height = {{ simulated.genesis_height }}

[protocol]
# Upper bound on the weight of calls dispatched by multisig executions.
max_weight = {{ protocol.max_weight }}

# Amount transferred to every newly created account so that it exists on the ledger.
funding_amount = {{ protocol.funding_amount }}

# Number of blocks an announced call has to wait before it can be executed.
announce_delay = {{ protocol.announce_delay }}

[groups]
# Development key that spawns the pure proxy account.
spawner = '{{ groups.spawner }}'

# Development key that funds the pure proxy account and both multisig accounts.
funder = '{{ groups.funder }}'

[groups.staking]
# Members of the multisig that announces and executes staking actions.
members = [
{{#each groups.staking.members }}
    '{{this}}',
{{/each}}
]

threshold = {{ groups.staking.threshold }}

# Members signing on behalf of the group, in signing order.
signers = [
{{#each groups.staking.signers }}
    '{{this}}',
{{/each}}
]

[groups.cancellation]
# Members of the multisig that is allowed to reject announcements.
members = [
{{#each groups.cancellation.members }}
    '{{this}}',
{{/each}}
]

threshold = {{ groups.cancellation.threshold }}

# Members signing on behalf of the group, in signing order.
signers = [
{{#each groups.cancellation.signers }}
    '{{this}}',
{{/each}}
]

[pacing]
# Wait for enter to be pressed after every step.
interactive = {{ pacing.interactive }}
"#;
