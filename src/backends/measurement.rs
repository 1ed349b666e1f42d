// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stand-in for a plate reader.
//!
//! Produces one reading per sample. Readings are `Null` placeholders unless a baseline
//! value is configured, in which case every sample reads the baseline.

use crate::errors::SpecializationError;
use crate::graph::{Outputs, ResolvedInputs, Value};
use crate::primitives::library::{MEASURE_ABSORBANCE, MEASURE_FLUORESCENCE};
use crate::resources::ResourceGrant;
use crate::traits::{Activity, Specialization};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const MEASUREMENT_SIMULATOR: &str = "measurement_simulator";

pub struct MeasurementSimulator {
    baseline: Option<f64>,
}

impl MeasurementSimulator {
    pub fn new() -> Self {
        Self { baseline: None }
    }

    pub fn with_baseline(baseline: f64) -> Self {
        Self {
            baseline: Some(baseline),
        }
    }

    fn reading(&self) -> Value {
        self.baseline.map(Value::Float).unwrap_or(Value::Null)
    }
}

impl Default for MeasurementSimulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Specialization for MeasurementSimulator {
    fn name(&self) -> &str {
        MEASUREMENT_SIMULATOR
    }

    fn supports(&self, primitive: &str) -> bool {
        matches!(primitive, MEASURE_ABSORBANCE | MEASURE_FLUORESCENCE)
    }

    async fn execute(
        &self,
        activity: &Activity,
        inputs: &ResolvedInputs,
        _grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        let mut settings = BTreeMap::new();
        let names: &[&str] = match activity.primitive.as_str() {
            MEASURE_ABSORBANCE => &["wavelength"],
            MEASURE_FLUORESCENCE => &[
                "excitation_wavelength",
                "emission_wavelength",
                "emission_bandpass_width",
            ],
            other => {
                return Err(SpecializationError::Failed(format!(
                    "primitive '{}' is not a measurement",
                    other
                )))
            }
        };
        for name in names {
            if let Some(value) = inputs.get(name) {
                settings.insert(name.to_string(), value.clone());
            }
        }

        let readings = samples_of(inputs.require("samples")?)
            .into_iter()
            .map(|sample| {
                let mut reading = settings.clone();
                reading.insert("sample".to_string(), sample);
                reading.insert("value".to_string(), self.reading());
                Value::Record(reading)
            })
            .collect();

        let mut outputs = Outputs::new();
        outputs.insert("measurements".to_string(), Value::List(readings));
        Ok(outputs)
    }
}

/// A list of samples reads element-wise; anything else is a single sample.
fn samples_of(samples: &Value) -> Vec<Value> {
    match samples {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::resources::{ResourceDescriptors, ResourceTracker};

    fn activity(primitive: &str) -> Activity {
        Activity {
            node: NodeId(4),
            path: "read".into(),
            primitive: primitive.into(),
            operation: None,
        }
    }

    #[tokio::test]
    async fn test_one_reading_per_sample() {
        struct TestCase {
            name: &'static str,
            simulator: MeasurementSimulator,
            samples: Value,
            expected_readings: usize,
            expected_value: Value,
        }

        let test_cases = vec![
            TestCase {
                name: "placeholder readings",
                simulator: MeasurementSimulator::new(),
                samples: Value::List(vec![
                    Value::location("plate/A1"),
                    Value::location("plate/A2"),
                ]),
                expected_readings: 2,
                expected_value: Value::Null,
            },
            TestCase {
                name: "baseline on a single container",
                simulator: MeasurementSimulator::with_baseline(0.05),
                samples: Value::location("tube"),
                expected_readings: 1,
                expected_value: Value::Float(0.05),
            },
        ];

        let tracker = ResourceTracker::new(&ResourceDescriptors::new()).unwrap();
        for case in test_cases {
            let grant = tracker.reserve("read", vec![]).await.unwrap();
            let mut inputs = ResolvedInputs::new();
            inputs.insert("samples", case.samples.clone());
            inputs.insert("wavelength", Value::nanometers(600.0));

            let outputs = case
                .simulator
                .execute(&activity(MEASURE_ABSORBANCE), &inputs, &grant)
                .await
                .unwrap();
            tracker.release(grant);

            let Value::List(readings) = &outputs["measurements"] else {
                panic!("case {}: measurements should be a list", case.name);
            };
            assert_eq!(readings.len(), case.expected_readings, "case: {}", case.name);
            for reading in readings {
                let Value::Record(fields) = reading else {
                    panic!("case {}: reading should be a record", case.name);
                };
                assert_eq!(fields["value"], case.expected_value, "case: {}", case.name);
                assert_eq!(fields["wavelength"], Value::nanometers(600.0));
            }
        }
    }

    #[tokio::test]
    async fn test_missing_samples_is_an_input_error() {
        let tracker = ResourceTracker::new(&ResourceDescriptors::new()).unwrap();
        let grant = tracker.reserve("read", vec![]).await.unwrap();
        let result = MeasurementSimulator::new()
            .execute(&activity(MEASURE_FLUORESCENCE), &ResolvedInputs::new(), &grant)
            .await;
        assert!(matches!(result, Err(SpecializationError::Input(_))));
        tracker.release(grant);
    }
}
