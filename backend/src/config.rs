//! Server configuration.
//!
//! Values come from the environment (a `.env` file is loaded by the binary
//! through `dotenvy`) and fall back to the defaults below.
//!
//! | Variable                       | Default    |
//! |--------------------------------|------------|
//! | `HEALTHDASH_PORT`              | `3000`     |
//! | `HEALTHDASH_MAX_UPLOAD_BYTES`  | 50 MiB     |
//! | `HEALTHDASH_MAX_SESSIONS`      | `64`       |
//! | `HEALTHDASH_SESSION_IDLE_SECS` | `3600`     |

use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::session::DEFAULT_MAX_SESSIONS;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size (in bytes).
///
/// 50 MB limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Sessions unused for this long are dropped.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    pub max_sessions: usize,
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_sessions: DEFAULT_MAX_SESSIONS,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            port: read(&lookup, "HEALTHDASH_PORT", defaults.port)?,
            max_upload_bytes: read(
                &lookup,
                "HEALTHDASH_MAX_UPLOAD_BYTES",
                defaults.max_upload_bytes,
            )?,
            max_sessions: read(&lookup, "HEALTHDASH_MAX_SESSIONS", defaults.max_sessions)?,
            session_idle_secs: read(
                &lookup,
                "HEALTHDASH_SESSION_IDLE_SECS",
                defaults.session_idle_secs,
            )?,
        };

        if config.session_idle().is_none() {
            return Err(ConfigError::Invalid {
                key: "HEALTHDASH_SESSION_IDLE_SECS".to_string(),
                value: config.session_idle_secs.to_string(),
                message: "idle timeout out of range".to_string(),
            });
        }
        Ok(config)
    }

    /// Idle timeout as a duration; `None` when it does not fit one.
    pub fn session_idle(&self) -> Option<Duration> {
        i64::try_from(self.session_idle_secs)
            .ok()
            .and_then(Duration::try_seconds)
    }

    /// Same configuration with a different port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

fn read<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HEALTHDASH_PORT", "8080"),
            ("HEALTHDASH_MAX_SESSIONS", " 4 "),
            ("HEALTHDASH_SESSION_IDLE_SECS", ""),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_sessions, 4);
        assert_eq!(config.session_idle_secs, DEFAULT_SESSION_IDLE_SECS);
    }

    #[test]
    fn test_invalid_value() {
        let err = ServerConfig::from_lookup(lookup(&[("HEALTHDASH_PORT", "http")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("HEALTHDASH_PORT"));
        assert!(msg.contains("http"));
    }

    #[test]
    fn test_idle_timeout_out_of_range() {
        for value in ["100000000000000000", "18446744073709551615"] {
            let err = ServerConfig::from_lookup(lookup(&[("HEALTHDASH_SESSION_IDLE_SECS", value)]))
                .unwrap_err();
            assert!(err.to_string().contains("HEALTHDASH_SESSION_IDLE_SECS"));
        }
    }

    #[test]
    fn test_session_idle_duration() {
        assert_eq!(ServerConfig::default().session_idle(), Some(Duration::hours(1)));

        let mut config = ServerConfig::default();
        config.session_idle_secs = u64::MAX;
        assert_eq!(config.session_idle(), None);
    }

    #[test]
    fn test_with_port() {
        assert_eq!(ServerConfig::default().with_port(9000).port, 9000);
    }
}
