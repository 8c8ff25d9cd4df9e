use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::remote::{
    client::{DEFAULT_AUTH_URL, DEFAULT_HISTORY_URL, DEFAULT_SHORTENER_URL, Endpoints},
    error::RemoteError,
};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "shortlink",
    version,
    about = "Command-line client for the shortlink URL shortening service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Auth service base URL
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Shortener service base URL
    #[arg(long, global = true)]
    pub shortener_url: Option<String>,

    /// History service base URL
    #[arg(long, global = true)]
    pub history_url: Option<String>,

    /// Session cookie file
    #[arg(long, global = true)]
    pub session_file: Option<String>,

    /// Append a JSONL journal of form transitions to this file
    #[arg(long, global = true)]
    pub trace_file: Option<String>,

    /// Path to config file (default: shortlink.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account (logs you in on success)
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm_password: String,
    },

    /// Log in and store the session cookies
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Shorten a URL
    Shorten {
        /// URL to shorten
        url: String,

        /// Link lifetime in days (30, 90 or 365; logged-in users only)
        #[arg(short, long)]
        expiration: Option<u32>,
    },

    /// Show the links you have shortened
    History,

    /// Forget the stored session
    Logout,

    /// Show whether a session is stored
    Status,

    /// Fill in and submit a form interactively
    Shell {
        /// Form to open: register, login, shorten or history
        #[arg(default_value = "shorten")]
        form: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `shortlink.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_session_file")]
    pub session_file: String,

    #[serde(default)]
    pub trace_file: Option<String>,

    #[serde(default = "default_expiration")]
    pub default_expiration_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            request_timeout_secs: default_timeout(),
            session_file: default_session_file(),
            trace_file: None,
            default_expiration_days: default_expiration(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_auth")]
    pub auth: String,

    #[serde(default = "default_shortener")]
    pub shortener: String,

    #[serde(default = "default_history")]
    pub history: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            auth: default_auth(),
            shortener: default_shortener(),
            history: default_history(),
        }
    }
}

// Serde default helpers
fn default_timeout() -> u64 { 10 }
fn default_session_file() -> String { ".shortlink-session.json".to_string() }
fn default_expiration() -> u32 { 30 }
fn default_auth() -> String { DEFAULT_AUTH_URL.to_string() }
fn default_shortener() -> String { DEFAULT_SHORTENER_URL.to_string() }
fn default_history() -> String { DEFAULT_HISTORY_URL.to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("shortlink.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "ignoring malformed config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config merging (CLI > config file > defaults)
// ============================================================================

impl AppConfig {
    /// Apply the global CLI overrides on top of the file config.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.auth_url {
            self.endpoints.auth = url.clone();
        }
        if let Some(url) = &cli.shortener_url {
            self.endpoints.shortener = url.clone();
        }
        if let Some(url) = &cli.history_url {
            self.endpoints.history = url.clone();
        }
        if let Some(path) = &cli.session_file {
            self.session_file = path.clone();
        }
        if cli.trace_file.is_some() {
            self.trace_file = cli.trace_file.clone();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn build_endpoints(&self) -> Result<Endpoints, RemoteError> {
        Endpoints::from_bases(
            &self.endpoints.auth,
            &self.endpoints.shortener,
            &self.endpoints.history,
        )
    }
}
