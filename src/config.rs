//! Configuration for the C2S registry and the registration module.

use serde::Deserialize;

/// Client-to-server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct C2sConfig {
    /// Local domains this server is authoritative for.
    ///
    /// Ordered and non-empty; the first entry is the default domain.
    pub domains: Vec<String>,
}

impl C2sConfig {
    /// Create a new C2S configuration.
    pub fn new(domains: Vec<String>) -> Self {
        Self { domains }
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.domains.is_empty() {
            return Err("c2s configuration must declare at least one local domain".to_string());
        }
        Ok(())
    }
}

/// In-band registration (XEP-0077) configuration.
///
/// Everything is disabled by default; enable with caution on public
/// servers.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Whether new accounts may be created before authentication.
    pub allow_registration: bool,
    /// Whether authenticated users may change their password.
    pub allow_change: bool,
    /// Whether authenticated users may cancel their registration.
    pub allow_cancel: bool,
}
