// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_LOG_FILTER, DEFAULT_SPECIALIZATIONS, FALLBACK_MAX_CONCURRENCY};
use crate::errors::ConfigError;
use crate::record::TimeMode;
use crate::resources::InstrumentSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub time_mode: TimeMode,
    /// Keep running independent branches after a failure.
    #[serde(default)]
    pub failsafe: bool,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub instrument_selection: InstrumentSelection,
    #[serde(default = "default_specializations")]
    pub specializations: Vec<SpecializationConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_mode: TimeMode::default(),
            failsafe: false,
            executor_options: ExecutorOptions::default(),
            instrument_selection: InstrumentSelection::default(),
            specializations: default_specializations(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_specializations() -> Vec<SpecializationConfig> {
    DEFAULT_SPECIALIZATIONS
        .iter()
        .map(|name| SpecializationConfig::named(name))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

impl ExecutorOptions {
    /// Configured concurrency, or the host parallelism when unset.
    pub fn get_max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_MAX_CONCURRENCY)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn get_filter(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationConfig {
    pub name: String,
    /// Output pins whose values from this specialization win over the others.
    #[serde(default)]
    pub authoritative: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_yaml::Value>, // specialization-specific options
}

impl SpecializationConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            authoritative: Vec::new(),
            options: BTreeMap::new(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: EngineConfig = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;

    if let Err(validation_errors) = crate::config::validate_config(&cfg) {
        return Err(ConfigError::Validation(
            validation_errors.iter().map(|e| e.to_string()).collect(),
        ));
    }

    Ok(cfg)
}
