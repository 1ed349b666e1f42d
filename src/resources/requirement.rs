// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;

/// One resource need of an activity, checked and staged by the tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "requirement", rename_all = "snake_case")]
pub enum Requirement {
    Withdraw {
        location: String,
        volume: f64,
    },
    Deposit {
        location: String,
        volume: f64,
    },
    /// One tip per operation; `instrument: None` lets the tracker choose.
    Pipette {
        instrument: Option<String>,
        operations: Vec<f64>,
    },
    Mount {
        instrument: String,
        mount: Option<String>,
    },
    LoadRack {
        rack: String,
        slot: Option<String>,
    },
}

/// Replaces the pipetting operations of every `Pipette` requirement.
pub fn with_operations(requirements: &[Requirement], operations: &[f64]) -> Vec<Requirement> {
    requirements
        .iter()
        .map(|requirement| match requirement {
            Requirement::Pipette { instrument, .. } => Requirement::Pipette {
                instrument: instrument.clone(),
                operations: operations.to_vec(),
            },
            other => other.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_operations_only_touches_pipetting() {
        let requirements = vec![
            Requirement::Pipette {
                instrument: Some("p300_single".into()),
                operations: vec![900.0],
            },
            Requirement::Withdraw {
                location: "reservoir".into(),
                volume: 900.0,
            },
        ];
        let decomposed = with_operations(&requirements, &[300.0, 300.0, 300.0]);
        assert_eq!(
            decomposed[0],
            Requirement::Pipette {
                instrument: Some("p300_single".into()),
                operations: vec![300.0, 300.0, 300.0],
            }
        );
        assert_eq!(decomposed[1], requirements[1]);
    }
}
