//! Server-side configuration, fixed at startup.

use std::time::Duration;

use lobster_lsp_core::LobsterSettings;

/// Default limit for a compile-only run.
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for the no-argument probe run.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Options the binary passes to the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Global settings used before, and underneath, editor configuration.
    pub defaults: LobsterSettings,
    pub compile_timeout: Duration,
    pub probe_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            defaults: LobsterSettings::default(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}
