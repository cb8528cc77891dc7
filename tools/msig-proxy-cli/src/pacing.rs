// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use msig_proxy_protocol::StepGate;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

const SEPARATOR_WIDTH: usize = 80;

/// Holds the scenario back until the operator presses enter.
pub(crate) struct EnterToContinue<R = Stdin> {
    input: Mutex<BufReader<R>>,
}

impl EnterToContinue {
    pub(crate) fn new() -> Self {
        Self::with_input(tokio::io::stdin())
    }
}

impl<R> EnterToContinue<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn with_input(input: R) -> Self {
        EnterToContinue {
            input: Mutex::new(BufReader::new(input)),
        }
    }
}

#[async_trait]
impl<R> StepGate for EnterToContinue<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn proceed(&self, completed_step: &str) {
        println!("{}", "━".repeat(SEPARATOR_WIDTH));
        println!("completed: {completed_step}");
        println!("Press enter to continue:");

        let mut line = String::new();
        let mut input = self.input.lock().await;
        match input.read_line(&mut line).await {
            Ok(0) => warn!("reached the end of the input, continuing without pausing"),
            Ok(_) => {}
            Err(err) => warn!("failed to read from the input: {err}"),
        }
    }
}
