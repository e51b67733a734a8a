use std::str::FromStr;

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// What `inspect` does with envelopes whose `type` this build does not know.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub enum UnknownTypePolicy {
    /// Re-emit the envelope untouched.
    #[default]
    Forward,
    /// Log and drop it.
    Skip,
    /// Abort with an error.
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub log_format: LogFormat,
    pub unknown_types: UnknownTypePolicy,
    pub pretty: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            unknown_types: UnknownTypePolicy::Forward,
            pretty: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_format: Option<LogFormat>,
    pub unknown_types: Option<UnknownTypePolicy>,
    pub pretty: Option<bool>,
}

impl CliConfig {
    const ENV_PREFIX: &'static str = "VAULTMQ";

    pub fn load() -> Result<Self, ConfigError> {
        let defaults = CliConfig::default();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/vaultmq").required(false))
            .add_source(config::File::with_name("config/vaultmq.local").required(false))
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("log_format", defaults.log_format.as_str())?
            .set_default("unknown_types", defaults.unknown_types.as_str())?
            .set_default("pretty", defaults.pretty)?;

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if let Some(policy) = overrides.unknown_types {
            self.unknown_types = policy;
        }
        if let Some(pretty) = overrides.pretty {
            self.pretty = pretty;
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unsupported log format '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for LogFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        LogFormat::from_str(&value).map_err(D::Error::custom)
    }
}

impl UnknownTypePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnknownTypePolicy::Forward => "forward",
            UnknownTypePolicy::Skip => "skip",
            UnknownTypePolicy::Reject => "reject",
        }
    }
}

impl FromStr for UnknownTypePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(UnknownTypePolicy::Forward),
            "skip" => Ok(UnknownTypePolicy::Skip),
            "reject" => Ok(UnknownTypePolicy::Reject),
            other => Err(format!("unsupported unknown-type policy '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for UnknownTypePolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        UnknownTypePolicy::from_str(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn defaults_match_expectations() {
        let config = CliConfig::default();
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.unknown_types, UnknownTypePolicy::Forward);
        assert!(!config.pretty);
    }

    #[test]
    #[serial]
    fn load_without_sources_yields_defaults() {
        let config = CliConfig::load().expect("config loads");
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    #[serial]
    fn environment_overrides_take_effect() {
        env::set_var("VAULTMQ__LOG_FORMAT", "json");
        env::set_var("VAULTMQ__UNKNOWN_TYPES", "reject");
        env::set_var("VAULTMQ__PRETTY", "true");

        let config = CliConfig::load().expect("config loads");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.unknown_types, UnknownTypePolicy::Reject);
        assert!(config.pretty);

        env::remove_var("VAULTMQ__LOG_FORMAT");
        env::remove_var("VAULTMQ__UNKNOWN_TYPES");
        env::remove_var("VAULTMQ__PRETTY");
    }

    #[test]
    #[serial]
    fn invalid_policy_fails_to_load() {
        env::set_var("VAULTMQ__UNKNOWN_TYPES", "drop-everything");

        let err = CliConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::Build(_)));

        env::remove_var("VAULTMQ__UNKNOWN_TYPES");
    }

    #[test]
    fn overrides_replace_only_provided_values() {
        let mut config = CliConfig {
            pretty: true,
            ..CliConfig::default()
        };
        config.apply_overrides(&CliOverrides {
            unknown_types: Some(UnknownTypePolicy::Skip),
            ..CliOverrides::default()
        });

        assert_eq!(config.unknown_types, UnknownTypePolicy::Skip);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.pretty);
    }

    #[test]
    fn policy_names_parse_case_insensitively() {
        assert_eq!(
            "Skip".parse::<UnknownTypePolicy>().unwrap(),
            UnknownTypePolicy::Skip
        );
        assert!("ignore".parse::<UnknownTypePolicy>().is_err());
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }
}
