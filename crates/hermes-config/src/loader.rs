//! Layered configuration loader.

use std::env;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{ConfigError, HermesConfig, LogFormat};

/// Configuration loader.
///
/// Layers are applied in call order, later layers overriding earlier ones key
/// by key:
/// 1. Defaults or a preset
/// 2. Configuration files and strings (TOML or JSON)
/// 3. Environment variables, applied by [`load`](Self::load)
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("hermes.toml")?
///     .with_dotenv()?
///     .with_env_prefix("HERMES")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HermesConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = HermesConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = HermesConfig::production();
        self
    }

    /// Layers a TOML (`.toml`) or JSON (`.json`) file.
    ///
    /// Fails if the file is missing, unreadable, malformed, or names an
    /// unknown field.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        let layer = match extension.as_deref() {
            Some(format @ ("toml" | "json")) => parse_layer(&content, format)?,
            _ => return Err(ConfigError::unsupported_format(path.display().to_string())),
        };

        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Layers a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Layers configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[dispatch]\nslow_threshold_ms = 250", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.dispatch.slow_threshold_ms, 250);
    /// assert_eq!(config.logging.level, "info");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let layer = parse_layer(content, &format.to_lowercase())?;
        self.merge_layer(layer)?;
        Ok(self)
    }

    /// Enables environment overrides of the form `PREFIX__SECTION__KEY`.
    ///
    /// With prefix `HERMES`, `HERMES__LOGGING__LEVEL=debug` sets
    /// `logging.level`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file into the process environment.
    ///
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::invalid_value(".env", e.to_string())),
        }
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix, env::vars())?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn merge_layer(&mut self, layer: Value) -> Result<(), ConfigError> {
        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(())
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let prefix = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&prefix) {
                self.apply_env_var(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVICE", "NAME"] => config.service.name = value.to_string(),
            ["SERVICE", "ENVIRONMENT"] => config.service.environment = value.to_string(),

            ["DISPATCH", "SLOW_THRESHOLD_MS"] => {
                config.dispatch.slow_threshold_ms = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "ANSI_ENABLED"] => {
                config.logging.ansi_enabled = parse_bool_var(key, value)?;
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_bool_var(key, value)?;
            }

            ["METRICS", "ENABLED"] => config.metrics.enabled = parse_bool_var(key, value)?,
            ["METRICS", "ADDR"] => config.metrics.addr = value.to_string(),
            ["METRICS", "LISTEN"] => config.metrics.listen = parse_bool_var(key, value)?,

            [section, field] => {
                return Err(ConfigError::unknown_field(*field, section.to_lowercase()));
            }
            _ => return Err(ConfigError::env_parse_error(key, "expected PREFIX__SECTION__KEY")),
        }

        Ok(())
    }
}

fn parse_layer(content: &str, format: &str) -> Result<Value, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::unsupported_format(other)),
    }
}

fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                merge_values(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn with_env(pairs: &[(&str, &str)]) -> Result<HermesConfig, ConfigError> {
        let mut loader = ConfigLoader::new();
        loader.apply_env_overrides("HERMES", vars(pairs))?;
        Ok(loader.load_unvalidated())
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, HermesConfig::default());
    }

    #[test]
    fn test_presets() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(config.metrics.enabled);

        let config = ConfigLoader::new()
            .with_production()
            .with_defaults()
            .load()
            .unwrap();
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_string_layers_merge_key_by_key() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[logging]\nlevel = \"warn\"", "toml")
            .unwrap()
            .with_string(r#"{"metrics": {"enabled": true, "addr": "127.0.0.1:9100"}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.addr, "127.0.0.1:9100");
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let err = ConfigLoader::new()
            .with_string("[server]\nhttp_addr = \"0.0.0.0:80\"", "toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ConfigLoader::new().with_string("[logging]\ncolour = true", "toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = ConfigLoader::new()
            .with_string("[logging", "toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigLoader::new().with_string("a: 1", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/hermes.toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        assert!(ConfigLoader::new()
            .with_optional_file("/nonexistent/hermes.toml")
            .is_ok());
    }

    #[test]
    fn test_load_validates() {
        let err = ConfigLoader::new()
            .with_string("[logging]\nlevel = \"hermes=[\"", "toml")
            .unwrap()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let config = with_env(&[
            ("HERMES__SERVICE__NAME", "users"),
            ("HERMES__DISPATCH__SLOW_THRESHOLD_MS", "0"),
            ("HERMES__LOGGING__FORMAT", "PRETTY"),
            ("HERMES__LOGGING__ANSI_ENABLED", "yes"),
            ("HERMES__METRICS__ENABLED", "1"),
            ("HERMES__METRICS__LISTEN", "off"),
            ("HERMESX__LOGGING__LEVEL", "trace"),
            ("PATH", "/usr/bin"),
        ])
        .unwrap();

        assert_eq!(config.service.name, "users");
        assert_eq!(config.dispatch.slow_threshold_ms, 0);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.ansi_enabled);
        assert_eq!(config.logging.level, "info");
        assert!(config.metrics.enabled);
        assert!(!config.metrics.listen);
    }

    #[test]
    fn test_env_parse_errors() {
        let err = with_env(&[("HERMES__DISPATCH__SLOW_THRESHOLD_MS", "fast")]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));

        let err = with_env(&[("HERMES__METRICS__ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));

        let err = with_env(&[("HERMES__LOGGING__FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));
    }

    #[test]
    fn test_env_unknown_key() {
        let err = with_env(&[("HERMES__LOGGING__COLOUR", "true")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownField { ref field, ref section } if field == "COLOUR" && section == "logging"
        ));

        let err = with_env(&[("HERMES__LOGGING", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));
    }

    #[test]
    fn test_parse_bool() {
        for s in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["false", "0", "no", "Off"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_merge_values() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        merge_values(&mut base, serde_json::json!({"a": {"c": 3}, "d": [9]}));
        assert_eq!(base, serde_json::json!({"a": {"b": 1, "c": 3}, "d": [9]}));
    }
}
