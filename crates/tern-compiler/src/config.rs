// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// What to do with a `continue` whose nearest enclosing construct is a `switch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinueInSwitch {
    /// Report a diagnostic
    #[default]
    Reject,
    /// Accept it and emit nothing
    Ignore,
}

/// Configuration for one compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Local slot budget per method
    pub max_locals: u16,

    /// Label budget per method
    pub max_labels: u32,

    /// Policy for `continue` inside a `switch`
    pub continue_in_switch: ContinueInSwitch,

    /// Instruction budget for the reference executor
    pub vm_step_limit: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_locals: u16::MAX,
            max_labels: u32::MAX,
            continue_in_switch: ContinueInSwitch::Reject,
            vm_step_limit: 1_000_000,
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded compiler config");
        Ok(config)
    }

    /// Apply `TERN_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(std::env::vars())
    }

    /// Apply `TERN_*` overrides from the given variables.
    ///
    /// `TERN_MAX_LOCALS=16` sets `max_locals`. Variables without the prefix are
    /// skipped, `TERN_LOG` belongs to the logger, and any other `TERN_*` name
    /// that is not a configuration key is skipped with a warning. A bad value
    /// for a known key is still an error.
    pub fn apply_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix("TERN_") else {
                continue;
            };
            if name == "LOG" {
                continue;
            }
            let name = name.to_lowercase();
            if !Self::KEYS.contains(&name.as_str()) {
                tracing::warn!(variable = %key, "ignoring unknown TERN_ variable");
                continue;
            }
            self.set(&name, &value)?;
        }
        Ok(())
    }

    /// Keys accepted by [`CompilerConfig::set`], spelled as in the TOML file.
    pub const KEYS: [&'static str; 4] = [
        "max_locals",
        "max_labels",
        "continue_in_switch",
        "vm_step_limit",
    ];

    /// Set a configuration value by key.
    ///
    /// Keys use the same snake_case names as the TOML file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = || Error::Config(format!("invalid value for {}: {}", key, value));
        match key {
            "max_locals" => self.max_locals = value.parse().map_err(|_| invalid())?,
            "max_labels" => self.max_labels = value.parse().map_err(|_| invalid())?,
            "vm_step_limit" => self.vm_step_limit = value.parse().map_err(|_| invalid())?,
            "continue_in_switch" => {
                self.continue_in_switch = match value {
                    "reject" => ContinueInSwitch::Reject,
                    "ignore" => ContinueInSwitch::Ignore,
                    _ => return Err(invalid()),
                }
            }
            _ => return Err(Error::Config(format!("unknown config key: {}", key))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.max_locals, 65535);
        assert_eq!(config.continue_in_switch, ContinueInSwitch::Reject);
    }

    #[test]
    fn test_partial_toml() {
        let config = CompilerConfig::from_toml_str("continue_in_switch = \"ignore\"").unwrap();
        assert_eq!(config.continue_in_switch, ContinueInSwitch::Ignore);
        assert_eq!(config.vm_step_limit, 1_000_000);
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            CompilerConfig::from_toml_str("max_locals = \"lots\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_locals = 8\nmax_labels = 100").unwrap();
        let config = CompilerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_locals, 8);
        assert_eq!(config.max_labels, 100);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CompilerConfig::default();
        config
            .apply_vars(vec![
                ("TERN_MAX_LOCALS".to_string(), "4".to_string()),
                ("TERN_LOG".to_string(), "debug".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();
        assert_eq!(config.max_locals, 4);
    }

    #[test]
    fn test_env_skips_unrelated_tern_variables() {
        let mut config = CompilerConfig::default();
        config
            .apply_vars(vec![
                ("TERN_HOME".to_string(), "/opt/tern".to_string()),
                ("TERN_CONTINUE_IN_SWITCH".to_string(), "ignore".to_string()),
            ])
            .unwrap();
        assert_eq!(config.continue_in_switch, ContinueInSwitch::Ignore);
        assert_eq!(config.max_locals, u16::MAX);
    }

    #[test]
    fn test_env_rejects_bad_value_for_known_key() {
        let mut config = CompilerConfig::default();
        let result = config.apply_vars(vec![("TERN_MAX_LABELS".to_string(), "many".to_string())]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_set_uses_toml_key_names() {
        let mut config = CompilerConfig::default();
        for key in CompilerConfig::KEYS {
            let text = format!("{} = {}", key, toml_value(key));
            let from_file = CompilerConfig::from_toml_str(&text).unwrap();
            let mut from_set = CompilerConfig::default();
            from_set.set(key, raw_value(key)).unwrap();
            assert_eq!(from_file, from_set, "{key}");
        }
        assert!(config.set("max-locals", "4").is_err());
        config.set("max_locals", "4").unwrap();
        assert_eq!(config.max_locals, 4);
    }

    fn raw_value(key: &str) -> &'static str {
        match key {
            "continue_in_switch" => "ignore",
            _ => "7",
        }
    }

    fn toml_value(key: &str) -> String {
        match key {
            "continue_in_switch" => "\"ignore\"".to_string(),
            _ => raw_value(key).to_string(),
        }
    }

    #[test]
    fn test_set_rejects_unknown() {
        let mut config = CompilerConfig::default();
        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("continue_in_switch", "maybe").is_err());
        config.set("continue_in_switch", "ignore").unwrap();
        assert_eq!(config.continue_in_switch, ContinueInSwitch::Ignore);
    }
}
