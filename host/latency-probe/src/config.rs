// Licensed under the Apache-2.0 license

//! Probe configuration, loaded from an optional TOML file and overridden
//! from the command line.

use std::path::Path;

use clap::ValueEnum;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

use crate::error::ConfigError;
use crate::scenario::Scenario;

/// Identity the latency trusted application is built with.
pub const LATENCY_TA_UUID: Uuid = uuid!("e41c2a14-7d2b-4c8e-9a53-0b6f4d1c8e27");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables.
    #[default]
    Text,
    /// One JSON document.
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    pub ta_uuid: Uuid,
    pub scenarios: Vec<Scenario>,
    pub format: OutputFormat,
    pub log_level: LevelFilter,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            ta_uuid: LATENCY_TA_UUID,
            scenarios: Scenario::ALL.to_vec(),
            format: OutputFormat::Text,
            log_level: LevelFilter::Info,
        }
    }
}

impl ProbeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::NoScenarios);
        }
        Ok(())
    }

    /// Whether `scenario` was selected. Selection order does not matter;
    /// scenarios always run in [`Scenario::ALL`] order.
    pub fn runs(&self, scenario: Scenario) -> bool {
        self.scenarios.contains(&scenario)
    }
}
