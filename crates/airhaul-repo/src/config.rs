//! Network configuration

use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Whole-request timeout (default 30s)
    pub timeout: Duration,
    /// Redirect limit (default 10)
    pub max_redirects: u32,
    /// `User-Agent` header (default `airhaul/<version>`)
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: format!("airhaul/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Registry transport and TLS policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Skip TLS certificate verification
    pub insecure: bool,
    /// Talk plain HTTP instead of HTTPS
    pub plain_http: bool,
}

impl RegistryOptions {
    /// Plain HTTP for loopback registries, HTTPS elsewhere
    pub fn for_registry(registry: &str) -> Self {
        let host = registry.split(':').next().unwrap_or(registry);
        Self {
            insecure: false,
            plain_http: matches!(host, "localhost" | "127.0.0.1"),
        }
    }
}
