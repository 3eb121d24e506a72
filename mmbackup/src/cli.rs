use std::{fmt, path::PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_SECRETS: &str = "secrets.json";

/// Fetch all visible posts from a Mattermost server. Attachments are written
/// to disk as they are found, posts are kept in memory until the archive is
/// written.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Mattermost server host name (or full URL)
    #[arg(short, long, env = "MATTERMOST_URL")]
    pub url: Option<String>,

    /// Port number for the server [default: 443]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Scheme used to reach the server [default: https]
    #[arg(long)]
    pub scheme: Option<Scheme>,

    /// Path to the JSON file containing the user credentials [default: secrets.json]
    #[arg(short, long)]
    pub secrets: Option<PathBuf>,

    /// Ignore direct and group messages, only back up channels visible to you
    #[arg(short = 'd', long)]
    pub ignore_direct_messages: bool,

    /// Directory receiving the archive and the attachments [default: .]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// User to back up, "me" being the logged in account
    #[arg(long = "user", value_name = "USER_ID", default_value = "me")]
    pub users: Vec<String>,

    /// Show detailed debugging information, same as --log-level debug
    #[arg(short, long)]
    pub verbose: bool,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

impl Args {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme.unwrap_or_default()
    }

    pub fn secrets(&self) -> PathBuf {
        self.secrets
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn level_filter(&self) -> LevelFilter {
        let level: LevelFilter = self.log_level.into();
        if self.verbose {
            level.max(LevelFilter::Debug)
        } else {
            level
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}
