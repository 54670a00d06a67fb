//! Environment-variable configuration.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Load from the `LOG_FORMAT` env var.
    ///
    /// Returns `Pretty` if not set or invalid.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ParseLogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "plain" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ParseLogFormatError(s.to_string())),
        }
    }
}

/// Error parsing a log format string.
#[derive(Debug, Clone)]
pub struct ParseLogFormatError(String);

impl fmt::Display for ParseLogFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log format '{}': expected 'pretty' or 'json'", self.0)
    }
}

impl std::error::Error for ParseLogFormatError {}

/// Read a non-empty string env var.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse an env var, falling back to `default` when unset.
///
/// Unparsable values also fall back, with a warning.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_string(key) {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, "invalid env value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_default_log_format() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_env_or_unset_uses_default() {
        assert_eq!(env_or("COMMON_TEST_UNSET_KEY_7F3A", 42usize), 42);
        assert_eq!(env_string("COMMON_TEST_UNSET_KEY_7F3A"), None);
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        std::env::set_var("COMMON_TEST_CAPACITY_9B21", "64");
        assert_eq!(env_or("COMMON_TEST_CAPACITY_9B21", 1usize), 64);

        std::env::set_var("COMMON_TEST_CAPACITY_9B21", "lots");
        assert_eq!(env_or("COMMON_TEST_CAPACITY_9B21", 1usize), 1);

        std::env::set_var("COMMON_TEST_CAPACITY_9B21", "   ");
        assert_eq!(env_or("COMMON_TEST_CAPACITY_9B21", 3usize), 3);

        std::env::remove_var("COMMON_TEST_CAPACITY_9B21");
    }
}
