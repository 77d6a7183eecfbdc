//! Configuration file loading.

use crate::config::Config;
use crate::config::types::RawConfig;
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::path::Path;

/// Load configuration from a YAML or TOML file.
///
/// Files ending in `.toml` are parsed as TOML, everything else as YAML.
/// Unknown keys are ignored; missing required keys are reported together.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let raw = parse_raw(path, &contents)?;
    Config::try_from(raw)
}

fn parse_raw(path: &Path, contents: &str) -> Result<RawConfig> {
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OsStr::new("toml")));

    if is_toml {
        toml::from_str(contents).map_err(|e| Error::ConfigParseToml {
            path: path.to_path_buf(),
            source: e,
        })
    } else {
        serde_yaml::from_str(contents).map_err(|e| Error::ConfigParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
