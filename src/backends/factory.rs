// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use super::measurement::{MeasurementSimulator, MEASUREMENT_SIMULATOR};
use super::samples::{SampleArrays, SAMPLE_ARRAYS};
use super::script::{ScriptRenderer, SCRIPT_RENDERER};
use crate::config::SpecializationConfig;
use crate::errors::ConfigError;
use crate::traits::Specialization;

pub struct SpecializationFactory;

impl SpecializationFactory {
    pub fn create_specialization(
        config: &SpecializationConfig,
    ) -> Result<Arc<dyn Specialization>, ConfigError> {
        match config.name.as_str() {
            SAMPLE_ARRAYS => Ok(Arc::new(SampleArrays::new())),
            SCRIPT_RENDERER => Ok(Arc::new(ScriptRenderer::new())),
            MEASUREMENT_SIMULATOR => match config.options.get("baseline") {
                None => Ok(Arc::new(MeasurementSimulator::new())),
                Some(value) => {
                    let baseline = value.as_f64().ok_or_else(|| ConfigError::InvalidValue {
                        field: format!("specializations.{}.options.baseline", config.name),
                        reason: "expected a number".to_string(),
                    })?;
                    Ok(Arc::new(MeasurementSimulator::with_baseline(baseline)))
                }
            },
            other => Err(ConfigError::UnknownSpecialization {
                name: other.to_string(),
                available: Self::list_available_implementations()
                    .iter()
                    .map(|name| name.to_string())
                    .collect(),
            }),
        }
    }

    pub fn list_available_implementations() -> Vec<&'static str> {
        vec![SAMPLE_ARRAYS, SCRIPT_RENDERER, MEASUREMENT_SIMULATOR]
    }

    pub fn is_implementation_available(name: &str) -> bool {
        Self::list_available_implementations().contains(&name)
    }
}
