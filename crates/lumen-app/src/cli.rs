//! CLI argument definitions for the Lumen study assistant.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Lumen: ask questions about your course material and summarize text notes.
#[derive(Parser, Debug)]
#[command(name = "lumen", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the reasoning service (e.g. http://127.0.0.1:4943/api).
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Answer from the built-in mock backend instead of the network.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Text document to summarize on startup.
    #[arg(long = "upload", value_name = "PATH")]
    pub upload: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > LUMEN_CONFIG env var > ~/.lumen/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LUMEN_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the reasoning service base URL.
    ///
    /// Priority: --base-url flag > LUMEN_BASE_URL env var > config file value.
    pub fn resolve_base_url(&self, config_base_url: &str) -> String {
        if let Some(ref url) = self.base_url {
            return url.clone();
        }
        match std::env::var("LUMEN_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => config_base_url.to_string(),
        }
    }

    /// Resolve the log level: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    pub fn resolve_offline(&self, config_offline: bool) -> bool {
        self.offline || config_offline
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".lumen").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".lumen").join("config.toml");
    }
    PathBuf::from("config.toml")
}
