use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::maildir::{AccessTimePolicy, DEFAULT_THRESHOLD};

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Mismatch threshold in seconds (default: one hour)
    pub threshold_secs: u64,
    /// What to do with the access time when rewriting mtime
    pub access_time: AccessTimePolicy,
    /// Maildir roots used when none are given on the command line
    pub roots: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_THRESHOLD.as_secs(),
            access_time: AccessTimePolicy::default(),
            roots: Vec::new(),
        }
    }
}

impl Config {
    /// Default location: `<config_dir>/maildir-mtime/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("maildir-mtime/config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/maildir-mtime/config.toml"))
    }

    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load config from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("config error: {} [{}]", e, path.display()),
                },
                Err(e) => eprintln!("config error: {} [{}]", e, path.display()),
            }
        }

        Self::default()
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }

    /// Configured roots with `~` expanded
    pub fn expanded_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .map(|r| PathBuf::from(shellexpand::tilde(r).into_owned()))
            .collect()
    }
}
