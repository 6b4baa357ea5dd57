//! Configuration file loading.

use std::{fs, path::Path};

use crate::Config;
use crate::error::ConfigError;

/// Config file syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    /// JSON with `//` and `/* */` comments allowed.
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match ext {
            "toml" => Ok(Self::Toml),
            "json" | "jsonc" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn parse(self, data: &str) -> Result<Config, ConfigError> {
        match self {
            Self::Toml => Ok(toml::from_str(data)?),
            Self::Json => {
                let stripped = json_comments::StripComments::new(data.as_bytes());
                Ok(serde_json::from_reader(stripped)?)
            }
            Self::Yaml => Ok(serde_yaml::from_str(data)?),
        }
    }
}

/// Read and parse a config file. The format is checked before the file is read.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let data = fs::read_to_string(path)?;
    format.parse(&data)
}
