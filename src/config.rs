use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

use crate::{app::Cli, autoplay::AutoplayConfig};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub autoplay: AutoplayConfig,
}

impl Config {
    pub fn read(file: &mut impl Read) -> anyhow::Result<Self> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("Failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("Failed to parse config file")?;
        config.autoplay.validate()?;
        Ok(config)
    }

    pub fn read_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut file = File::open(path).context("Failed to open config file")?;
        Self::read(&mut file)
    }

    pub fn from_cli_args(args: &Cli) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(config_path) => Self::read_path(config_path)?,
            None => {
                let default_config = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_config.exists() {
                    log::info!("Using default config file {DEFAULT_CONFIG_PATH}");
                    Self::read_path(default_config)?
                } else {
                    log::info!("No config file found; using default config");
                    Config::default()
                }
            }
        };
        if let Some(threshold) = args.threshold {
            config.autoplay.threshold = threshold;
        }
        if let Some(debounce_ms) = args.debounce_ms {
            config.autoplay.debounce_ms = debounce_ms;
        }
        config
            .autoplay
            .validate()
            .context("Invalid autoplay settings")?;
        Ok(config)
    }
}
