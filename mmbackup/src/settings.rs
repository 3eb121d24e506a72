use std::{
    env,
    path::{Path, PathBuf},
};

use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::cli::{Args, Scheme};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub url: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<Scheme>,
    pub secrets: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub ignore_direct_messages: Option<bool>,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

// Function to get the XDG_CONFIG_HOME path
fn get_xdg_config_path() -> Option<PathBuf> {
    // First check XDG_CONFIG_HOME environment variable
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    // If XDG_CONFIG_HOME is not set, fall back to $HOME/.config
    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

pub fn load_settings_from(config_path: &Path) -> anyhow::Result<Settings> {
    Config::builder()
        .add_source(File::from(config_path).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

pub fn load_settings() -> anyhow::Result<Settings> {
    if let Some(xdg_config) = get_xdg_config_path() {
        let config_path = xdg_config.join(CONFIG_FILE_NAME).join("config.toml");
        if config_path.exists() {
            return load_settings_from(&config_path);
        }
    }

    Ok(Settings::default())
}

/// Fill the arguments not given on the command line from `settings`.
pub fn apply_settings(args: &Args, settings: Settings) -> Args {
    let mut new_args = args.clone();

    macro_rules! apply_if_none {
        ($args:expr, $field:ident, $config:expr) => {
            if $args.$field.is_none() {
                $args.$field = $config.$field;
            }
        };
    }

    apply_if_none!(new_args, url, settings);
    apply_if_none!(new_args, port, settings);
    apply_if_none!(new_args, scheme, settings);
    apply_if_none!(new_args, secrets, settings);
    apply_if_none!(new_args, output_dir, settings);

    if settings.ignore_direct_messages == Some(true) {
        new_args.ignore_direct_messages = true;
    }

    new_args
}

pub fn merge_settings_with_args(args: &Args) -> anyhow::Result<Args> {
    let new_args = apply_settings(args, load_settings()?);

    debug!("merged config: {:?}", new_args);

    Ok(new_args)
}
