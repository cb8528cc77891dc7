// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use handlebars::{Handlebars, TemplateRenderError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::{fs, io};
use tracing::{debug, info};

#[cfg(feature = "dirs")]
use std::path::PathBuf;

pub const MSIG_PROXY_DIR: &str = ".msig-proxy";
pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_CONFIG_FILENAME: &str = "config.toml";

/// Environment variable that, when set, replaces `$HOME` as the root of the default directories.
pub const HOME_DIR_ENV: &str = "MSIG_PROXY_HOME_DIR";

/// A serializable config whose on-disk form is rendered through a commented handlebars template.
pub trait ConfigTemplate: Serialize + Sized {
    fn template(&self) -> &'static str;

    fn format_to_string(&self) -> Result<String, TemplateRenderError> {
        let mut reg = Handlebars::new();
        // values are written into toml, not html
        reg.register_escape_fn(handlebars::no_escape);
        reg.render_template(self.template(), self)
    }

    fn format_to_writer<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let rendered = self
            .format_to_string()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        writer.write_all(rendered.as_bytes())
    }
}

#[cfg(feature = "dirs")]
pub fn must_get_home() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_DIR_ENV) {
        return PathBuf::from(home);
    }

    #[allow(clippy::expect_used)]
    dirs::home_dir().expect("failed to evaluate $HOME value")
}

pub fn save_formatted_config_to_file<C, P>(config: &C, path: P) -> io::Result<()>
where
    C: ConfigTemplate,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    info!("saving config file to {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    config.format_to_writer(&mut file)
}

pub fn read_config_from_toml_file<C, P>(path: P) -> io::Result<C>
where
    C: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!("attempting to load configuration file from {}", path.display());

    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|toml_err| io::Error::new(io::ErrorKind::InvalidData, toml_err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Dummy {
        name: String,
        threshold: u16,
        members: Vec<String>,
        section: Section,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Section {
        enabled: bool,
    }

    impl ConfigTemplate for Dummy {
        fn template(&self) -> &'static str {
            r#"
# a comment that survives
name = '{{ name }}'

threshold = {{ threshold }}

members = [
{{#each members }}
    '{{this}}',
{{/each}}
]

[section]
enabled = {{ section.enabled }}
"#
        }
    }

    fn dummy() -> Dummy {
        Dummy {
            name: "staking <group>".to_string(),
            threshold: 2,
            members: vec!["//Alice".to_string(), "//Bob".to_string()],
            section: Section { enabled: true },
        }
    }

    #[test]
    fn rendered_template_is_not_html_escaped() {
        let rendered = dummy().format_to_string().unwrap();
        assert!(rendered.contains("# a comment that survives"));
        assert!(rendered.contains("name = 'staking <group>'"));
    }

    #[test]
    fn saved_config_can_be_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILENAME);

        let config = dummy();
        save_formatted_config_to_file(&config, &path).unwrap();
        let loaded: Dummy = read_config_from_toml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_files_are_reported_as_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILENAME);
        fs::write(&path, "threshold = 'two'").unwrap();

        let err = read_config_from_toml_file::<Dummy, _>(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
