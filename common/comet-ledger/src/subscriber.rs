// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::error::CometLedgerError;
use crate::helpers::head_height;
use futures::{stream, StreamExt};
use msig_proxy_protocol::{HeadStream, LedgerError};
use tendermint_rpc::query::EventType;
use tendermint_rpc::{SubscriptionClient, WebSocketClient, WebSocketClientDriver};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

/// Opens a fresh `NewBlock` subscription, with its websocket driver running in a separate task.
/// The first item of the returned stream is `current`.
pub(crate) async fn subscribe_new_heads(
    websocket_endpoint: &Url,
    current: u64,
    cancel: CancellationToken,
) -> Result<HeadStream, CometLedgerError> {
    let (client, driver) = WebSocketClient::new(websocket_endpoint.as_str())
        .await
        .map_err(|source| CometLedgerError::WebSocketConnectionFailure {
            url: websocket_endpoint.to_string(),
            source: Box::new(source),
        })?;

    let driver_cancel = cancel.child_token();
    tokio::spawn(run_websocket_driver(driver, driver_cancel.clone()));

    info!("creating chain subscription");
    let subscription = match client.subscribe(EventType::NewBlock.into()).await {
        Ok(subscription) => subscription,
        Err(source) => {
            driver_cancel.cancel();
            return Err(CometLedgerError::ChainSubscriptionFailure {
                source: Box::new(source),
            });
        }
    };

    // the client has to outlive the subscription and the driver has to stop with it
    let keepalive = (client, driver_cancel.drop_guard());
    let heads = subscription.map(move |event| {
        let _ = &keepalive;
        match event {
            Ok(event) => head_height(event).map_err(LedgerError::from),
            Err(source) => Err(LedgerError::transport(source)),
        }
    });

    Ok(stream::once(async move { Ok(current) }).chain(heads).boxed())
}

pub(crate) async fn run_websocket_driver(driver: WebSocketClientDriver, cancel: CancellationToken) {
    info!("starting websocket driver");
    tokio::select! {
        _ = cancel.cancelled() => {
            info!("received cancellation token")
        }
        res = driver.run() => {
            match res {
                Ok(_) => info!("our websocket driver has finished execution"),
                Err(err) => error!("our websocket driver has errored out: {err}"),
            }
            cancel.cancel()
        }
    }
}
