//! Typed accessor over a command's configuration slice.
//!
//! Configuration parsing and pipeline compilation are external concerns;
//! a command builder receives its slice of the parsed tree as a
//! `serde_json::Value` and reads it through [`Settings`]. The accessor
//! tracks which keys were consumed so a builder can reject settings it does
//! not recognize, naming the offending key.

use crate::error::ConfigError;
use serde_json::{Map, Value as Json};
use std::collections::BTreeSet;

/// View over one command's configuration object.
pub struct Settings<'a> {
    entries: &'a Map<String, Json>,
    consumed: BTreeSet<String>,
}

impl<'a> Settings<'a> {
    /// Wrap a configuration slice. The slice must be a JSON object.
    pub fn new(config: &'a Json) -> Result<Self, ConfigError> {
        let entries = config.as_object().ok_or_else(|| ConfigError::InvalidSetting {
            key: String::new(),
            message: format!("command configuration must be an object, got {config}"),
        })?;
        Ok(Self {
            entries,
            consumed: BTreeSet::new(),
        })
    }

    /// Get an optional string setting.
    pub fn string(&mut self, key: &str) -> Result<Option<String>, ConfigError> {
        self.consumed.insert(key.to_string());
        match self.entries.get(key) {
            None => Ok(None),
            Some(Json::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ConfigError::InvalidSetting {
                key: key.to_string(),
                message: format!("expected a string, got {other}"),
            }),
        }
    }

    /// Get a required string setting.
    pub fn required_string(&mut self, key: &str) -> Result<String, ConfigError> {
        self.string(key)?.ok_or_else(|| ConfigError::MissingSetting {
            key: key.to_string(),
        })
    }

    /// Get a boolean setting, falling back to a default when absent.
    pub fn bool_or(&mut self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.consumed.insert(key.to_string());
        match self.entries.get(key) {
            None => Ok(default),
            Some(Json::Bool(b)) => Ok(*b),
            Some(other) => Err(ConfigError::InvalidSetting {
                key: key.to_string(),
                message: format!("expected a boolean, got {other}"),
            }),
        }
    }

    /// Fail if the slice contains keys this builder never consumed.
    pub fn reject_unknown(&self) -> Result<(), ConfigError> {
        for key in self.entries.keys() {
            if !self.consumed.contains(key) {
                return Err(ConfigError::UnknownSetting { key: key.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_lookup() {
        let config = json!({"name": "value"});
        let mut settings = Settings::new(&config).unwrap();
        assert_eq!(settings.string("name").unwrap().as_deref(), Some("value"));
        assert_eq!(settings.string("absent").unwrap(), None);
    }

    #[test]
    fn test_required_string_missing() {
        let config = json!({});
        let mut settings = Settings::new(&config).unwrap();
        let err = settings.required_string("writerSchemaString").unwrap_err();
        assert!(matches!(err, ConfigError::MissingSetting { key } if key == "writerSchemaString"));
    }

    #[test]
    fn test_bool_default_and_type_check() {
        let config = json!({"isJson": true, "bad": "yes"});
        let mut settings = Settings::new(&config).unwrap();
        assert!(settings.bool_or("isJson", false).unwrap());
        assert!(!settings.bool_or("absent", false).unwrap());
        assert!(settings.bool_or("bad", false).is_err());
    }

    #[test]
    fn test_reject_unknown() {
        let config = json!({"known": "a", "stray": 1});
        let mut settings = Settings::new(&config).unwrap();
        settings.string("known").unwrap();
        let err = settings.reject_unknown().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSetting { key } if key == "stray"));
    }

    #[test]
    fn test_non_object_config_rejected() {
        let config = json!(["not", "an", "object"]);
        assert!(Settings::new(&config).is_err());
    }
}
