//! Session configuration.
//!
//! The session key and token lifetime come from the process environment,
//! read once at startup:
//!
//! - `AULARIO_SESSION_KEY` — base64url-encoded Ed25519 PKCS#8 DER document (required)
//! - `AULARIO_TOKEN_TTL` — humantime duration such as `1day` or `12h` (optional, default 1 day)
//!
//! A missing or unparsable key is fatal: an instance that cannot sign
//! sessions must fail startup instead of serving degraded traffic.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{error::AuthError, session::SessionKey};

/// Environment variable holding the base64url PKCS#8 session key.
pub const SESSION_KEY_ENV: &str = "AULARIO_SESSION_KEY";

/// Environment variable holding the token lifetime (humantime format).
pub const TOKEN_TTL_ENV: &str = "AULARIO_TOKEN_TTL";

/// Default token lifetime: one day, matching the length of a school day
/// plus margin. Issued tokens are stateless, so a shorter TTL is the only
/// lever against stolen tokens.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("Missing required environment variable: {var}")]
    MissingVar {
        /// The variable that was not set.
        var: &'static str,
    },

    /// The session key could not be parsed.
    #[error("Invalid session key in {var}")]
    InvalidKey {
        /// The variable holding the bad key.
        var: &'static str,
        /// The underlying parse failure.
        #[source]
        source: AuthError,
    },

    /// The token TTL could not be parsed.
    #[error("Invalid duration in {var}: {message}")]
    InvalidTtl {
        /// The variable holding the bad duration.
        var: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Serde-facing session settings, for deployments that configure through a
/// file instead of the environment.
///
/// ```toml
/// signing_key = "MC4CAQAwBQYDK2VwBCIEIJ..."
/// token_ttl = "1day"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Base64url-encoded Ed25519 PKCS#8 DER document.
    pub signing_key: String,

    /// Token lifetime.
    #[serde(with = "humantime_serde", default = "default_ttl")]
    pub token_ttl: Duration,
}

fn default_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

/// Resolved session configuration: a parsed key and a token lifetime.
#[derive(Debug)]
pub struct SessionConfig {
    /// The process-wide session keypair.
    pub key: SessionKey,
    /// Lifetime of issued tokens.
    pub token_ttl: Duration,
}

impl SessionConfig {
    /// Builds a config from an already-parsed key and TTL.
    #[must_use]
    pub fn new(key: SessionKey, token_ttl: Duration) -> Self {
        Self { key, token_ttl }
    }

    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingVar`] if `AULARIO_SESSION_KEY` is not set
    /// - [`ConfigError::InvalidKey`] if the key does not parse
    /// - [`ConfigError::InvalidTtl`] if `AULARIO_TOKEN_TTL` is set but unparsable
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// The environment read behind [`from_env`](Self::from_env), with the
    /// variable lookup injected so the fatal paths are testable without
    /// mutating process state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let encoded =
            lookup(SESSION_KEY_ENV).ok_or(ConfigError::MissingVar { var: SESSION_KEY_ENV })?;

        let key = SessionKey::from_base64(&encoded)
            .map_err(|source| ConfigError::InvalidKey { var: SESSION_KEY_ENV, source })?;

        let token_ttl = match lookup(TOKEN_TTL_ENV) {
            Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
                ConfigError::InvalidTtl { var: TOKEN_TTL_ENV, message: e.to_string() }
            })?,
            None => DEFAULT_TOKEN_TTL,
        };

        tracing::debug!(ttl_secs = token_ttl.as_secs(), "session configuration loaded");
        Ok(Self { key, token_ttl })
    }

    /// Builds a config from serde-deserialized settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] if the signing key does not
    /// parse.
    pub fn from_settings(settings: &SessionSettings) -> Result<Self, ConfigError> {
        let key = SessionKey::from_base64(&settings.signing_key)
            .map_err(|source| ConfigError::InvalidKey { var: SESSION_KEY_ENV, source })?;
        Ok(Self { key, token_ttl: settings.token_ttl })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_deserialize_with_default_ttl() {
        let key = SessionKey::generate();
        let json = format!(r#"{{"signing_key":"{}"}}"#, key.to_base64());

        let settings: SessionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.token_ttl, DEFAULT_TOKEN_TTL);

        let config = SessionConfig::from_settings(&settings).unwrap();
        assert_eq!(config.key.public_key_base64(), key.public_key_base64());
    }

    #[test]
    fn test_settings_humantime_ttl() {
        let key = SessionKey::generate();
        let json = format!(r#"{{"signing_key":"{}","token_ttl":"12h"}}"#, key.to_base64());

        let settings: SessionSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.token_ttl, Duration::from_secs(12 * 3600));
    }

    #[test]
    fn test_bad_signing_key_rejected() {
        let settings =
            SessionSettings { signing_key: "not-a-key".into(), token_ttl: DEFAULT_TOKEN_TTL };
        let result = SessionConfig::from_settings(&settings);
        assert!(matches!(result, Err(ConfigError::InvalidKey { .. })));
    }

    #[test]
    fn test_missing_session_key_is_fatal() {
        let result = SessionConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(ConfigError::MissingVar { var: SESSION_KEY_ENV })));
    }

    #[test]
    fn test_env_lookup_key_and_ttl() {
        let key = SessionKey::generate();
        let encoded = key.to_base64();

        // Key only: TTL falls back to the default.
        let config = SessionConfig::from_lookup(|var| {
            (var == SESSION_KEY_ENV).then(|| encoded.clone())
        })
        .unwrap();
        assert_eq!(config.token_ttl, DEFAULT_TOKEN_TTL);
        assert_eq!(config.key.public_key_base64(), key.public_key_base64());

        // Explicit TTL is honored.
        let config = SessionConfig::from_lookup(|var| match var {
            SESSION_KEY_ENV => Some(encoded.clone()),
            TOKEN_TTL_ENV => Some("12h".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.token_ttl, Duration::from_secs(12 * 3600));

        // An unparsable TTL is fatal, not silently defaulted.
        let result = SessionConfig::from_lookup(|var| match var {
            SESSION_KEY_ENV => Some(encoded.clone()),
            TOKEN_TTL_ENV => Some("soon".into()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidTtl { var: TOKEN_TTL_ENV, .. })));

        // A garbage key is fatal.
        let result = SessionConfig::from_lookup(|var| {
            (var == SESSION_KEY_ENV).then(|| "!!!".to_owned())
        });
        assert!(matches!(result, Err(ConfigError::InvalidKey { var: SESSION_KEY_ENV, .. })));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingVar { var: SESSION_KEY_ENV };
        assert_eq!(err.to_string(), "Missing required environment variable: AULARIO_SESSION_KEY");
    }
}
