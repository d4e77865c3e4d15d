//! Relay configuration.
//!
//! Configuration is loaded from environment variables. Every variable is
//! optional; unset variables fall back to the defaults below.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use thiserror::Error;

/// Default WebSocket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Default capacity of the server command mailbox.
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// How the server resolves the two ambiguous session behaviors.
///
/// The defaults keep the observed behavior: a duplicate meeting code
/// replaces the live meeting, and a kicked participant keeps its entry
/// until it disconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Reject `start_meeting` for a code that is already active.
    pub reject_duplicate_codes: bool,
    /// Remove the kicked connection's registry entry immediately.
    pub clear_kicked_entry: bool,
}

/// Meeting relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// WebSocket server bind address (default: "127.0.0.1:8080").
    pub bind_address: String,

    /// Server command mailbox capacity (default: 256).
    pub command_buffer: usize,

    /// Per-connection outbound queue capacity (default: 32).
    pub outbound_buffer: usize,

    /// Session behavior switches.
    pub policy: SessionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            policy: SessionPolicy::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("RELAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let command_buffer = parse_buffer(vars, "RELAY_COMMAND_BUFFER", DEFAULT_COMMAND_BUFFER)?;
        let outbound_buffer =
            parse_buffer(vars, "RELAY_OUTBOUND_BUFFER", DEFAULT_OUTBOUND_BUFFER)?;

        let policy = SessionPolicy {
            reject_duplicate_codes: parse_var(vars, "RELAY_REJECT_DUPLICATE_CODES", false)?,
            clear_kicked_entry: parse_var(vars, "RELAY_CLEAR_KICKED_ENTRY", false)?,
        };

        Ok(Self {
            bind_address,
            command_buffer,
            outbound_buffer,
            policy,
        })
    }
}

fn parse_var<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw}"))),
        None => Ok(default),
    }
}

// tokio::sync::mpsc::channel panics on zero capacity
fn parse_buffer(
    vars: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = parse_var(vars, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue(format!("{key} must be greater than zero")));
    }
    Ok(value)
}
