//! Engine configuration.
//!
//! Two knobs: how long a hold lives and how many units one purchase may
//! claim. Values come from the environment with sensible defaults, so a
//! host can tune them without a config file.

use chrono::Duration;

/// Default hold lifetime: 10 minutes.
pub const DEFAULT_HOLD_TTL_SECS: i64 = 600;

/// Default per-purchase unit limit.
pub const DEFAULT_MAX_UNITS_PER_PURCHASE: u32 = 8;

/// Tunable parameters of the admission engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Seconds a hold survives before lapsing if never committed.
    pub hold_ttl_secs: i64,
    /// Maximum units a single purchase may claim.
    pub max_units_per_purchase: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hold_ttl_secs: DEFAULT_HOLD_TTL_SECS,
            max_units_per_purchase: DEFAULT_MAX_UNITS_PER_PURCHASE,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    ///
    /// - `TURNSTILE_HOLD_TTL_SECS`: hold lifetime in seconds
    /// - `TURNSTILE_MAX_UNITS_PER_PURCHASE`: per-purchase unit limit
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            hold_ttl_secs: std::env::var("TURNSTILE_HOLD_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HOLD_TTL_SECS),
            max_units_per_purchase: std::env::var("TURNSTILE_MAX_UNITS_PER_PURCHASE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_UNITS_PER_PURCHASE),
        }
    }

    /// The hold lifetime as a [`chrono::Duration`].
    #[must_use]
    pub fn hold_ttl(&self) -> Duration {
        Duration::seconds(self.hold_ttl_secs)
    }
}
