use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::access::RouteGroup;

/// Feature flags controlling which optional integrations are active.
///
/// Loaded from `config.toml` at server startup. Every field defaults to
/// `false` so that a missing or incomplete config file disables all
/// optional features.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureFlags {
    #[serde(default)]
    pub telemetry: bool,
    #[serde(default)]
    pub rate_limit: bool,
}

/// Sliding-window limits for `/api/*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    120
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Route guard table as written in `config.toml`.
///
/// ```toml
/// [guard.routes]
/// "/kits" = "kit"
/// "/observer" = "observer"
///
/// [guard.roles]
/// writer = ["kit", "ai_writing"]
/// ```
///
/// Role keys are parsed by the server; unknown role names are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GuardConfig {
    #[serde(default)]
    pub routes: BTreeMap<String, RouteGroup>,
    #[serde(default)]
    pub roles: BTreeMap<String, Vec<RouteGroup>>,
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// `None` keeps the built-in guard table.
    #[serde(default)]
    pub guard: Option<GuardConfig>,
}
