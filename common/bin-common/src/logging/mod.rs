// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use std::io::IsTerminal;

#[cfg(feature = "basic_tracing")]
use tracing_subscriber::{filter::LevelFilter, EnvFilter, Layer};

// node rpc and websocket internals are way too chatty at `INFO`
#[cfg(feature = "basic_tracing")]
const QUIETENED_TARGETS: &[&str] = &[
    "tendermint_rpc=warn",
    "async_tungstenite=warn",
    "tungstenite=warn",
];

/// Filter honouring `RUST_LOG` when it's set, and `INFO` with quietened rpc internals otherwise.
#[cfg(feature = "basic_tracing")]
pub fn default_tracing_env_filter() -> EnvFilter {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(QUIETENED_TARGETS.join(",")),
    }
}

// compact lines on stderr, so that stdout only carries command output
#[cfg(feature = "basic_tracing")]
fn stderr_fmt_layer<S>() -> impl Layer<S> + Send + Sync + 'static
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
}

#[cfg(feature = "basic_tracing")]
pub fn setup_tracing_logger() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(stderr_fmt_layer())
        .with(default_tracing_env_filter())
        .init()
}

pub fn banner(crate_name: &str, crate_version: &str) -> String {
    format!(
        r#"

                      _
      _ __ ___  ___(_) __ _       _ __  _ __ _____  ___   _
     | '_ ` _ \/ __| |/ _` |_____| '_ \| '__/ _ \ \/ / | | |
     | | | | | \__ \ | (_| |_____| |_) | | | (_) >  <| |_| |
     |_| |_| |_|___/_|\__, |     | .__/|_|  \___/_/\_\\__, |
                      |___/      |_|                  |___/

             ({crate_name} - version {crate_version})

    "#
    )
}

/// Prints the banner unless stdout is redirected, e.g. when piping the derived addresses.
pub fn maybe_print_banner(crate_name: &str, crate_version: &str) {
    if std::io::stdout().is_terminal() {
        println!("{}", banner(crate_name, crate_version))
    }
}
