//! Serializer configuration
//!
//! Loaded from YAML or from `SMART_ENTITY_*` environment variables on top of
//! the defaults.

use std::env;
use std::path::Path;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_CYCLE_PROTECTION: &str = "SMART_ENTITY_CYCLE_PROTECTION";
pub const ENV_MAX_DEPTH: &str = "SMART_ENTITY_MAX_DEPTH";

/// How the serializer breaks cycles in the entity graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleProtection {
    /// Skip fields of a related entity that point back at the caller's type
    #[default]
    DeclaredType,
    /// Also never re-expand an entity already on the current path
    VisitedPath,
}

impl FromStr for CycleProtection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "declared_type" | "declared-type" | "type" => Ok(CycleProtection::DeclaredType),
            "visited_path" | "visited-path" | "path" => Ok(CycleProtection::VisitedPath),
            _ => Err(ConfigError::InvalidValue {
                field: "cycle_protection".to_string(),
                value: s.to_string(),
                expected: "declared_type or visited_path".to_string(),
            }),
        }
    }
}

/// Serializer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    pub cycle_protection: CycleProtection,
    /// Deepest allowed nesting of related entities
    pub max_depth: usize,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            cycle_protection: CycleProtection::DeclaredType,
            max_depth: 64,
        }
    }
}

impl SerializerConfig {
    pub fn with_cycle_protection(mut self, cycle_protection: CycleProtection) -> Self {
        self.cycle_protection = cycle_protection;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overridden by `SMART_ENTITY_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var(ENV_CYCLE_PROTECTION) {
            config.cycle_protection = value.parse()?;
        }

        if let Ok(value) = env::var(ENV_MAX_DEPTH) {
            config.max_depth = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                value: value.clone(),
                expected: "a positive integer".to_string(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_depth".to_string(),
                value: "0".to_string(),
                expected: "a positive integer".to_string(),
            });
        }
        Ok(())
    }
}
