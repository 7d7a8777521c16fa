use serde::Deserialize;

/// Configuration for a [`Server`](super::Server).
///
/// All fields have a default value: an empty configuration file is a valid one.
///
/// ```rust
/// use trellis_server::server::ServerConfig;
///
/// let config = ServerConfig::new()
///     .strict_slashes(true)
///     .host("api.example.com");
/// assert!(config.strict_slashes);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ServerConfig {
    /// When `false`, a request for `/users/` is routed to `/users` (and vice versa)
    /// if there is no exact match.
    pub strict_slashes: bool,
    /// When set, requests whose `Host` header doesn't match it are rejected with a `404`.
    pub host: Option<String>,
}

impl ServerConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = strict;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}
