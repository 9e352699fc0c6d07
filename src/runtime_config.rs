//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for routebind's runtime
//! behavior.
//!
//! ## Environment Variables
//!
//! ### `ROUTEBIND_ROUTES_FILE`
//!
//! Path to a YAML or JSON route file. The CLI uses it when `--file` is not
//! given, and [`DispatcherBuilder::runtime_config`](crate::dispatcher::DispatcherBuilder::runtime_config)
//! loads it into the table being built.
//!
//! Default: unset
//!
//! ### `ROUTEBIND_SLOW_MATCH_US`
//!
//! Route matches taking longer than this many microseconds are logged at
//! warn level. Accepts decimal (`1000`) or hexadecimal (`0x3e8`).
//!
//! Default: `1000` (1 ms)
//!
//! ## Usage
//!
//! ```rust
//! use routebind::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Slow match threshold: {:?}", config.slow_match);
//! ```
//!
//! ## Example Configuration
//!
//! ```bash
//! export ROUTEBIND_ROUTES_FILE=config/routes.yaml
//! export ROUTEBIND_SLOW_MATCH_US=250
//! routebind routes
//! ```

use crate::router::DEFAULT_SLOW_MATCH;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup using [`RuntimeConfig::from_env()`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Route file to load declarations from, if any
    pub routes_file: Option<PathBuf>,
    /// Threshold above which a route match is logged as slow (default: 1 ms)
    pub slow_match: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            routes_file: None,
            slow_match: DEFAULT_SLOW_MATCH,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let routes_file = lookup("ROUTEBIND_ROUTES_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let slow_match = lookup("ROUTEBIND_SLOW_MATCH_US")
            .and_then(|val| parse_micros(val.trim()))
            .map_or(DEFAULT_SLOW_MATCH, Duration::from_micros);
        RuntimeConfig {
            routes_file,
            slow_match,
        }
    }
}

fn parse_micros(val: &str) -> Option<u64> {
    if let Some(hex) = val.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
