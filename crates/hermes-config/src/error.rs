//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension or format name is neither TOML nor JSON.
    #[error("unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The rejected format or path.
        format: String,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error, or a layer that does not fit the schema.
    #[error("failed to parse configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Environment variable under the prefix that maps to no field.
    #[error("unknown configuration field: {field} in section {section}")]
    UnknownField {
        /// The unknown field name.
        field: String,
        /// The section containing the field.
        section: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(field: impl Into<String>, section: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
            section: section.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::file_not_found("/etc/hermes/hermes.toml");
        assert_eq!(
            err.to_string(),
            "configuration file not found: /etc/hermes/hermes.toml"
        );

        let err = ConfigError::invalid_value("metrics.addr", "invalid socket address: nope");
        assert_eq!(
            err.to_string(),
            "invalid configuration value for metrics.addr: invalid socket address: nope"
        );

        let err = ConfigError::env_parse_error("HERMES__LOGGING__ENABLED", "expected boolean");
        assert!(err.to_string().contains("HERMES__LOGGING__ENABLED"));

        let err = ConfigError::unknown_field("COLOUR", "logging");
        assert_eq!(
            err.to_string(),
            "unknown configuration field: COLOUR in section logging"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read_error("hermes.toml", io);
        assert!(err.source().is_some());
    }
}
