// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use msig_proxy_comet_ledger::CometLedgerError;
use msig_proxy_protocol::ProtocolError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MsigProxyCliError {
    #[error(
        "failed to load config file using path '{}'. detailed message: {source}", path.display()
    )]
    ConfigLoadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "failed to save config file using path '{}'. detailed message: {source}", path.display()
    )]
    ConfigSaveFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("there already exists a config file at: {}. if you want to overwrite its content, use --force flag", path.display())]
    ExistingConfig { path: PathBuf },

    #[error("'{uri}' is not a valid development key uri. expected something like '//Alice'")]
    UnknownDevKey { uri: String },

    #[error("{signer} is listed as a signer of the {group} group, but it's not one of its members")]
    SignerOutsideGroup { signer: String, group: &'static str },

    #[error("the provided configuration is invalid: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to encode the arguments of {call}: {source}")]
    ArgumentEncodingFailure {
        call: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error(transparent)]
    ProtocolFailure(#[from] ProtocolError),

    #[error(transparent)]
    CometLedgerFailure(#[from] CometLedgerError),
}
