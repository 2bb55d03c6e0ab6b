//! Runtime configuration
//!
//! ## Configuration (Environment Variables)
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CONCAT_TRACE_STACKS` | `false` | Emit a trace event on every stack/stash mutation |
//! | `CONCAT_TRACE_EFFECTS` | `false` | Emit a trace event on every effect dispatch |
//! | `CONCAT_STACK_CAPACITY` | `64` | Initial capacity of both stacks |
//!
//! The same keys (lower case, without the prefix) can be given in a TOML
//! file:
//!
//! ```toml
//! trace_stacks = true
//! stack_capacity = 256
//! ```
//!
//! Unparseable environment values fall back to the default, and so does a
//! `CONCAT_STACK_CAPACITY` above [`MAX_STACK_CAPACITY`]. In a TOML file an
//! oversized capacity is an error.

use crate::error::RuntimeError;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_STACK_CAPACITY: usize = 64;

/// Largest accepted `stack_capacity`
pub const MAX_STACK_CAPACITY: usize = 1 << 20;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Trace every mutation of the operand stack and the stash
    pub trace_stacks: bool,
    /// Trace effect binding and dispatch
    pub trace_effects: bool,
    /// Initial capacity of both stacks
    pub stack_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            trace_stacks: false,
            trace_effects: false,
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let trace_stacks = env_flag("CONCAT_TRACE_STACKS").unwrap_or(defaults.trace_stacks);
        let trace_effects = env_flag("CONCAT_TRACE_EFFECTS").unwrap_or(defaults.trace_effects);
        let stack_capacity = std::env::var("CONCAT_STACK_CAPACITY")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n <= MAX_STACK_CAPACITY)
            .unwrap_or(defaults.stack_capacity);

        Self {
            trace_stacks,
            trace_effects,
            stack_capacity,
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| RuntimeError::Config(format!("Failed to parse runtime config: {}", e)))?;
        if config.stack_capacity > MAX_STACK_CAPACITY {
            return Err(RuntimeError::Config(format!(
                "stack_capacity {} exceeds the maximum of {}",
                config.stack_capacity, MAX_STACK_CAPACITY
            )));
        }
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .and_then(|s| match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
