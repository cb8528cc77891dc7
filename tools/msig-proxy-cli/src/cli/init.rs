// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use crate::cli::ConfigOverridableArgs;
use crate::config::Config;
use crate::error::MsigProxyCliError;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, clap::Args)]
pub(crate) struct Args {
    #[command(flatten)]
    config_override: ConfigOverridableArgs,

    /// Specifies custom location for the configuration file.
    #[clap(long)]
    custom_config_path: Option<PathBuf>,

    /// Overwrite existing configuration file.
    #[clap(long, short)]
    force: bool,
}

pub(crate) fn execute(args: Args) -> Result<(), MsigProxyCliError> {
    let path = args
        .custom_config_path
        .clone()
        .unwrap_or_else(Config::default_location);

    if path.exists() && !args.force {
        return Err(MsigProxyCliError::ExistingConfig { path });
    }

    let config = Config::default().with_override(args.config_override);
    config.ensure_is_valid()?;

    config
        .save_to_path(&path)
        .map_err(|source| MsigProxyCliError::ConfigSaveFailure {
            path: path.clone(),
            source,
        })?;

    info!("saved the configuration file to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: PathBuf, force: bool) -> Args {
        Args {
            config_override: ConfigOverridableArgs {
                announce_delay: Some(7),
                ..Default::default()
            },
            custom_config_path: Some(path),
            force,
        }
    }

    #[test]
    fn existing_config_is_only_replaced_when_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("config.toml");

        execute(args(path.clone(), false)).unwrap();
        let saved = Config::read_from_toml_file(&path).unwrap();
        assert_eq!(saved.protocol.announce_delay, 7);

        assert!(matches!(
            execute(args(path.clone(), false)),
            Err(MsigProxyCliError::ExistingConfig { .. })
        ));
        execute(args(path, true)).unwrap();
    }
}
