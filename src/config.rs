use serde::Deserialize;
use std::{fmt, time::Duration};

/// Default lifetime of a persistent session.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Connection settings of a [`Client`](crate::Client).
///
/// Durations are given in seconds when deserialized. A zero `timeout`
/// dials without a time limit.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub addr: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, with = "seconds")]
    pub timeout: Duration,
    /// Keep one session open across operations instead of one per operation
    #[serde(default)]
    pub persistent: bool,
    /// How long a persistent session is reused before it is replaced
    #[serde(default = "default_ttl", with = "seconds")]
    pub ttl: Duration,
}

const fn default_ttl() -> Duration {
    DEFAULT_TTL
}

impl ClientConfig {
    pub fn new<A: Into<String>>(addr: A) -> Self {
        Self {
            addr: addr.into(),
            username: String::new(),
            password: String::new(),
            timeout: Duration::ZERO,
            persistent: false,
            ttl: DEFAULT_TTL,
        }
    }

    #[must_use]
    pub fn credentials<U, P>(mut self, username: U, password: P) -> Self
    where
        U: Into<String>,
        P: Into<String>,
    {
        self.username = username.into();
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables session reuse, replacing the session every `ttl`.
    #[must_use]
    pub fn persistent(mut self, ttl: Duration) -> Self {
        self.persistent = true;
        self.ttl = ttl;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("addr", &self.addr)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("persistent", &self.persistent)
            .field("ttl", &self.ttl)
            .finish()
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
