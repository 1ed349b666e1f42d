// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validation of the engine configuration.
//!
//! Every problem is collected so a broken file is reported in one pass:
//! - unknown or duplicate specialization names
//! - a zero concurrency limit
//! - a log filter `tracing-subscriber` cannot parse

use crate::backends::SpecializationFactory;
use crate::config::EngineConfig;
use crate::errors::ConfigError;
use std::collections::BTreeSet;

pub fn validate_config(cfg: &EngineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let mut seen = BTreeSet::new();
    for specialization in &cfg.specializations {
        if !SpecializationFactory::is_implementation_available(&specialization.name) {
            errors.push(ConfigError::UnknownSpecialization {
                name: specialization.name.clone(),
                available: SpecializationFactory::list_available_implementations()
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            });
        }
        if !seen.insert(specialization.name.as_str()) {
            errors.push(ConfigError::InvalidValue {
                field: "specializations".to_string(),
                reason: format!("'{}' is bound more than once", specialization.name),
            });
        }
    }

    if cfg.executor_options.max_concurrency == Some(0) {
        errors.push(ConfigError::InvalidValue {
            field: "executor_options.max_concurrency".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    if let Some(filter) = &cfg.logging.filter {
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(filter) {
            errors.push(ConfigError::InvalidValue {
                field: "logging.filter".to_string(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
