// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::DenialReason;
use crate::resources::{Envelope, VOLUME_EPSILON};
use serde::Serialize;
use std::collections::BTreeMap;

/// Placement recorded for labware loaded without a deck slot.
pub const DECK: &str = "deck";

/// Mount used when an instrument is mounted without a position.
pub const DEFAULT_MOUNT: &str = "left";

/// Current state of one tracked resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceState {
    Container {
        capacity: f64,
        volume: f64,
    },
    Plate {
        rows: u8,
        columns: u8,
        placement: Option<String>,
    },
    TipRack {
        tip_kind: String,
        tips: u32,
        placement: Option<String>,
        attached_to: Option<String>,
    },
    Slot {
        occupant: Option<String>,
    },
    Instrument(InstrumentState),
}

impl ResourceState {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceState::Container { .. } => "container",
            ResourceState::Plate { .. } => "plate",
            ResourceState::TipRack { .. } => "tip rack",
            ResourceState::Slot { .. } => "slot",
            ResourceState::Instrument(_) => "instrument",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentState {
    pub envelope: Envelope,
    pub tip_kind: String,
    pub mount: Option<String>,
    /// `None` until a compatible tip rack is attached.
    pub tips: Option<u32>,
}

impl InstrumentState {
    /// Checks one pipetting request in order: mounted, tips loaded, every operation
    /// inside the envelope, enough tips left (one per operation).
    pub fn check_operations(&self, id: &str, operations: &[f64]) -> Result<(), DenialReason> {
        if self.mount.is_none() {
            return Err(DenialReason::InstrumentNotMounted {
                instrument: id.to_string(),
            });
        }
        let Some(remaining) = self.tips else {
            return Err(DenialReason::NoConsumableLoaded {
                instrument: id.to_string(),
            });
        };

        let total: f64 = operations.iter().sum();
        for &operation in operations {
            if operation > self.envelope.max + VOLUME_EPSILON {
                return Err(DenialReason::ExceedsEnvelope {
                    instrument: id.to_string(),
                    requested: total,
                    envelope: self.envelope,
                });
            }
            if operation < self.envelope.min - VOLUME_EPSILON {
                return Err(DenialReason::BelowEnvelope {
                    instrument: id.to_string(),
                    quantity: operation,
                    envelope: self.envelope,
                });
            }
        }

        let needed = operations.len() as u32;
        if remaining < needed {
            return Err(DenialReason::ConsumableExhausted {
                instrument: id.to_string(),
                needed,
                remaining,
            });
        }
        Ok(())
    }
}

/// Every tracked resource by id, as reported in execution records.
pub type ResourceSnapshot = BTreeMap<String, ResourceState>;

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(mount: Option<&str>, tips: Option<u32>) -> InstrumentState {
        InstrumentState {
            envelope: Envelope::new(10.0, 300.0),
            tip_kind: "standard".into(),
            mount: mount.map(str::to_string),
            tips,
        }
    }

    #[test]
    fn test_check_order() {
        struct TestCase {
            name: &'static str,
            state: InstrumentState,
            operations: Vec<f64>,
            expected: Result<(), DenialReason>,
        }

        let test_cases = vec![
            TestCase {
                name: "unmounted wins over missing tips",
                state: instrument(None, None),
                operations: vec![900.0],
                expected: Err(DenialReason::InstrumentNotMounted {
                    instrument: "p300".into(),
                }),
            },
            TestCase {
                name: "missing tips win over envelope",
                state: instrument(Some("left"), None),
                operations: vec![900.0],
                expected: Err(DenialReason::NoConsumableLoaded {
                    instrument: "p300".into(),
                }),
            },
            TestCase {
                name: "envelope wins over exhaustion",
                state: instrument(Some("left"), Some(0)),
                operations: vec![900.0],
                expected: Err(DenialReason::ExceedsEnvelope {
                    instrument: "p300".into(),
                    requested: 900.0,
                    envelope: Envelope::new(10.0, 300.0),
                }),
            },
            TestCase {
                name: "below minimum",
                state: instrument(Some("left"), Some(10)),
                operations: vec![5.0],
                expected: Err(DenialReason::BelowEnvelope {
                    instrument: "p300".into(),
                    quantity: 5.0,
                    envelope: Envelope::new(10.0, 300.0),
                }),
            },
            TestCase {
                name: "one tip per operation",
                state: instrument(Some("left"), Some(2)),
                operations: vec![300.0, 300.0, 300.0],
                expected: Err(DenialReason::ConsumableExhausted {
                    instrument: "p300".into(),
                    needed: 3,
                    remaining: 2,
                }),
            },
            TestCase {
                name: "eligible",
                state: instrument(Some("left"), Some(3)),
                operations: vec![300.0, 300.0, 300.0],
                expected: Ok(()),
            },
        ];

        for case in test_cases {
            assert_eq!(
                case.state.check_operations("p300", &case.operations),
                case.expected,
                "case: {}",
                case.name
            );
        }
    }
}
