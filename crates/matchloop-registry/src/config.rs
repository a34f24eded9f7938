//! Registry configuration.

use matchloop_tick::TickConfig;
use serde::{Deserialize, Serialize};

/// Settings shared by every session a registry runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Highest session id handed out. Ids come from `[1, max_session_id]`.
    pub max_session_id: u16,

    /// Base tick settings. The interval passed to
    /// [`SessionRegistry::run`](crate::SessionRegistry::run) overrides
    /// `interval_ms`; everything else applies as is.
    pub tick: TickConfig,
}

impl RegistryConfig {
    pub const DEFAULT_MAX_SESSION_ID: u16 = 1024;
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_session_id: Self::DEFAULT_MAX_SESSION_ID,
            tick: TickConfig::default(),
        }
    }
}
