//! Configuration loader for the relay.
//!
//! Reads `relay.toml` and deserializes it into [`RelayConfig`]. When the
//! operator names the file explicitly, any read or parse failure is fatal.
//! For the default path the loader is forgiving: a missing or broken file
//! falls back to defaults with a log line. Validation failures are always
//! fatal.
//!
//! Secrets never live in the file. [`Credentials`] reads them from the
//! environment.

use std::path::Path;

use secrecy::SecretString;

use relay_types::config::RelayConfig;
use relay_types::error::ConfigError;

/// Environment variable holding the LINE channel secret (webhook signing key).
pub const CHANNEL_SECRET_ENV: &str = "CHANNEL_SECRET";
/// Environment variable holding the LINE channel access token.
pub const CHANNEL_TOKEN_ENV: &str = "CHANNEL_TOKEN";
/// Environment variable holding the completion engine API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Load and validate the relay configuration from `path`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`] unless
///   `explicit` is set, in which case it returns [`ConfigError::Read`].
/// - If the file cannot be read or parsed, returns the error when `explicit`
///   is set, otherwise logs a warning and uses the defaults.
/// - The resulting configuration is validated either way.
pub async fn load_config(path: &Path, explicit: bool) -> Result<RelayConfig, ConfigError> {
    let config = match read_config(path).await {
        Ok(Some(config)) => config,
        Ok(None) if !explicit => {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            RelayConfig::default()
        }
        Ok(None) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        Err(err) if !explicit => {
            tracing::warn!("{err}, using defaults");
            RelayConfig::default()
        }
        Err(err) => return Err(err),
    };

    config.validate()?;
    Ok(config)
}

/// Read and parse `path`. `Ok(None)` when the file does not exist.
async fn read_config(path: &Path) -> Result<Option<RelayConfig>, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str::<RelayConfig>(&content)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Secrets the relay needs at startup.
pub struct Credentials {
    pub channel_secret: SecretString,
    pub channel_token: SecretString,
    pub openai_api_key: SecretString,
}

impl Credentials {
    /// Read all credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read all credentials through `lookup`. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| -> Result<SecretString, ConfigError> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
                _ => Err(ConfigError::MissingEnv(name)),
            }
        };

        Ok(Self {
            channel_secret: require(CHANNEL_SECRET_ENV)?,
            channel_token: require(CHANNEL_TOKEN_ENV)?,
            openai_api_key: require(OPENAI_API_KEY_ENV)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("channel_secret", &"[REDACTED]")
            .field("channel_token", &"[REDACTED]")
            .field("openai_api_key", &"[REDACTED]")
            .finish()
    }
}
