// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::backends::SpecializationFactory;
use crate::config::EngineConfig;
use crate::errors::ConfigError;
use crate::observability::messages::specialization::SpecializationCreated;
use crate::observability::messages::StructuredLog;
use crate::primitives::PrimitiveRegistry;
use crate::traits::Specialization;
use std::collections::BTreeSet;
use std::sync::Arc;

/// A specialization bound for a run, with the output pins it is authoritative for.
#[derive(Clone)]
pub struct BoundSpecialization {
    specialization: Arc<dyn Specialization>,
    authoritative: BTreeSet<String>,
}

impl BoundSpecialization {
    pub fn specialization(&self) -> &Arc<dyn Specialization> {
        &self.specialization
    }

    pub fn name(&self) -> &str {
        self.specialization.name()
    }

    pub fn is_authoritative(&self, pin: &str) -> bool {
        self.authoritative.contains(pin)
    }
}

/// Ordered specializations consulted for every activity.
///
/// Binding order is invocation order; when several specializations produce a value for
/// the same pin, authoritative bindings win over the others and earlier bindings win
/// over later ones.
#[derive(Clone, Default)]
pub struct SpecializationSet(Vec<BoundSpecialization>);

impl SpecializationSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for specialization_config in &cfg.specializations {
            let specialization =
                SpecializationFactory::create_specialization(specialization_config)?;
            let pins: Vec<&str> = specialization_config
                .authoritative
                .iter()
                .map(String::as_str)
                .collect();
            set = set.bind_authoritative(specialization, &pins);
        }
        Ok(set)
    }

    pub fn bind(self, specialization: Arc<dyn Specialization>) -> Self {
        self.bind_authoritative(specialization, &[])
    }

    pub fn bind_authoritative(
        mut self,
        specialization: Arc<dyn Specialization>,
        pins: &[&str],
    ) -> Self {
        self.0.push(BoundSpecialization {
            specialization,
            authoritative: pins.iter().map(|pin| pin.to_string()).collect(),
        });
        self
    }

    /// Bindings that support `primitive`, in binding order.
    pub fn supporting(&self, primitive: &str) -> Vec<&BoundSpecialization> {
        self.0
            .iter()
            .filter(|bound| bound.specialization.supports(primitive))
            .collect()
    }

    /// Logs the primitives of `registry` each binding supports.
    pub fn announce(&self, registry: &PrimitiveRegistry) {
        for bound in &self.0 {
            SpecializationCreated {
                name: bound.name(),
                primitives: registry
                    .names()
                    .filter(|primitive| bound.specialization.supports(primitive))
                    .count(),
            }
            .log();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundSpecialization> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(BoundSpecialization::name).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SpecializationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecializationSet")
            .field("specialization_count", &self.0.len())
            .field("specialization_names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MeasurementSimulator, SampleArrays, ScriptRenderer};
    use crate::config::SpecializationConfig;

    #[test]
    fn test_from_config_table_driven() {
        struct TestCase {
            name: &'static str,
            config: EngineConfig,
            expected_names: Vec<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "defaults",
                config: EngineConfig::default(),
                expected_names: vec!["sample_arrays", "script_renderer", "measurement_simulator"],
            },
            TestCase {
                name: "explicit order",
                config: EngineConfig {
                    specializations: vec![
                        SpecializationConfig::named("measurement_simulator"),
                        SpecializationConfig::named("sample_arrays"),
                    ],
                    ..EngineConfig::default()
                },
                expected_names: vec!["measurement_simulator", "sample_arrays"],
            },
            TestCase {
                name: "nothing bound",
                config: EngineConfig {
                    specializations: vec![],
                    ..EngineConfig::default()
                },
                expected_names: vec![],
            },
        ];

        for case in test_cases {
            let set = SpecializationSet::from_config(&case.config).unwrap();
            assert_eq!(set.names(), case.expected_names, "case: {}", case.name);
            assert_eq!(set.len(), case.expected_names.len(), "case: {}", case.name);
        }
    }

    #[test]
    fn test_supporting_keeps_binding_order_and_authority() {
        let set = SpecializationSet::new()
            .bind(Arc::new(ScriptRenderer::new()))
            .bind_authoritative(Arc::new(MeasurementSimulator::new()), &["measurements"])
            .bind(Arc::new(SampleArrays::new()));

        let transfer: Vec<&str> = set.supporting("Transfer").into_iter().map(|b| b.name()).collect();
        assert_eq!(transfer, vec!["script_renderer"]);

        let measuring = set.supporting("MeasureAbsorbance");
        assert_eq!(measuring.len(), 1);
        assert!(measuring[0].is_authoritative("measurements"));
        assert!(set.supporting("Centrifuge").is_empty());
        assert!(format!("{:?}", set).contains("specialization_count: 3"));
    }
}
