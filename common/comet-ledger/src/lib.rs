// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

//! [`OrderingLog`](msig_proxy_protocol::OrderingLog) implementation talking to a CometBFT node
//! over its rpc and websocket endpoints.

mod client;
pub mod error;
mod helpers;
mod subscriber;

pub use client::{CometLedger, NONCE_QUERY_PATH};
pub use error::CometLedgerError;
