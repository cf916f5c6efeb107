// ============================================================================
// Logging Configuration
// ============================================================================

use anyhow::bail;

const PLACEHOLDER_SALT: &str = "change-me";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log raw principal ids instead of salted hashes
    pub enable_user_identifiers: bool,
    pub hash_salt: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub(crate) fn from_env() -> anyhow::Result<Self> {
        let hash_salt = std::env::var("LOG_HASH_SALT").unwrap_or_default();
        if hash_salt.trim().is_empty() || hash_salt == PLACEHOLDER_SALT {
            bail!("LOG_HASH_SALT must be set to a unique, secret value");
        }

        let enable_user_identifiers = matches!(
            std::env::var("LOG_USER_IDENTIFIERS").as_deref(),
            Ok("true") | Ok("1")
        );

        Ok(Self {
            enable_user_identifiers,
            hash_salt,
            format: LogFormat::parse(&std::env::var("LOG_FORMAT").unwrap_or_default()),
        })
    }
}
