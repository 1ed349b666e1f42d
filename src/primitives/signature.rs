// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::InputError;
use crate::graph::{ResolvedInputs, Value, ValueKind};
use crate::resources::Requirement;
use serde::Serialize;

/// Declared input of a primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ValueKind,
    pub optional: bool,
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            optional: false,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ValueKind) -> Self {
        Self {
            optional: true,
            ..Self::required(name, kind)
        }
    }

    pub fn with_default(name: &str, kind: ValueKind, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::required(name, kind)
        }
    }

    /// A required input must be bound because nothing else can supply it.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// Resources an activity of a primitive consumes, derived from its resolved inputs.
///
/// # Variants
/// * `None` - pure bookkeeping, no physical resource involved
/// * `ConfigureInstrument` - mounts `instrument` at `mount`
/// * `LoadRack` - places the `rack` location, optionally in the slot at `coordinates`
/// * `Transfer` - withdraws `amount` from `source`, deposits it in `destination` and
///   pipettes it with `instrument` (or one chosen by the tracker), one tip per operation
/// * `Provision` - deposits `amount` in `destination` from an external supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Footprint {
    #[default]
    None,
    ConfigureInstrument,
    LoadRack,
    Transfer,
    Provision,
}

impl Footprint {
    pub fn requirements(&self, inputs: &ResolvedInputs) -> Result<Vec<Requirement>, InputError> {
        let requirements = match self {
            Footprint::None => vec![],
            Footprint::ConfigureInstrument => vec![Requirement::Mount {
                instrument: inputs.text("instrument")?.to_string(),
                mount: inputs.optional_text("mount")?.map(str::to_string),
            }],
            Footprint::LoadRack => vec![Requirement::LoadRack {
                rack: inputs.location("rack")?.to_string(),
                slot: inputs.optional_text("coordinates")?.map(str::to_string),
            }],
            Footprint::Transfer => {
                let volume = inputs.microliters("amount")?;
                // pipette first so an envelope denial is reported before volume checks
                vec![
                    Requirement::Pipette {
                        instrument: inputs.optional_text("instrument")?.map(str::to_string),
                        operations: vec![volume],
                    },
                    Requirement::Withdraw {
                        location: inputs.location("source")?.to_string(),
                        volume,
                    },
                    Requirement::Deposit {
                        location: inputs.location("destination")?.to_string(),
                        volume,
                    },
                ]
            }
            Footprint::Provision => vec![Requirement::Deposit {
                location: inputs.location("destination")?.to_string(),
                volume: inputs.microliters("amount")?,
            }],
        };
        Ok(requirements)
    }
}

/// Everything the engine knows about a primitive before running it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrimitiveSignature {
    pub name: String,
    pub description: String,
    pub inputs: Vec<ParameterSpec>,
    pub outputs: Vec<String>,
    pub footprint: Footprint,
}

impl PrimitiveSignature {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            footprint: Footprint::None,
        }
    }

    pub fn with_input(mut self, spec: ParameterSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn with_output(mut self, pin: &str) -> Self {
        self.outputs.push(pin.to_string());
        self
    }

    pub fn with_footprint(mut self, footprint: Footprint) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn input(&self, name: &str) -> Option<&ParameterSpec> {
        self.inputs.iter().find(|spec| spec.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_footprint() {
        let mut inputs = ResolvedInputs::new();
        inputs.insert("source", Value::location("reservoir"));
        inputs.insert("destination", Value::location("plate/A1"));
        inputs.insert("amount", Value::microliters(900.0));

        let requirements = Footprint::Transfer.requirements(&inputs).unwrap();
        assert_eq!(
            requirements,
            vec![
                Requirement::Pipette {
                    instrument: None,
                    operations: vec![900.0],
                },
                Requirement::Withdraw {
                    location: "reservoir".into(),
                    volume: 900.0,
                },
                Requirement::Deposit {
                    location: "plate/A1".into(),
                    volume: 900.0,
                },
            ]
        );
    }

    #[test]
    fn test_footprint_reports_bad_inputs() {
        let mut inputs = ResolvedInputs::new();
        inputs.insert("instrument", Value::location("p300_single"));

        assert!(matches!(
            Footprint::ConfigureInstrument.requirements(&inputs),
            Err(InputError::WrongKind { .. })
        ));
        assert_eq!(
            Footprint::Provision.requirements(&inputs),
            Err(InputError::Missing("destination".into()))
        );
        assert_eq!(Footprint::None.requirements(&inputs), Ok(vec![]));
    }

    #[test]
    fn test_required_inputs() {
        assert!(ParameterSpec::required("amount", ValueKind::Quantity).is_required());
        assert!(!ParameterSpec::optional("mount", ValueKind::Text).is_required());
        assert!(
            !ParameterSpec::with_default("mount", ValueKind::Text, Value::text("left"))
                .is_required()
        );
    }
}
