// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for resource reservation and tracker construction.

use crate::resources::Envelope;
use serde::Serialize;
use thiserror::Error;

/// Why the resource tracker refused a reservation.
///
/// A denial never mutates tracker state. `ExceedsEnvelope` is the only reason
/// the scheduler recovers from (by decomposing the quantity), every other
/// reason surfaces as a `ResourceDenied` failure of the activity.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    #[error("unknown resource '{resource}'")]
    UnknownResource { resource: String },

    #[error("resource '{resource}' is not a {expected}")]
    WrongResourceKind { resource: String, expected: String },

    #[error("no eligible instrument: {detail}")]
    NoEligibleInstrument { detail: String },

    #[error("instrument '{instrument}' is not mounted")]
    InstrumentNotMounted { instrument: String },

    #[error("no consumable loaded on instrument '{instrument}'")]
    NoConsumableLoaded { instrument: String },

    #[error("instrument '{instrument}' needs {needed} tips but only {remaining} remain")]
    ConsumableExhausted {
        instrument: String,
        needed: u32,
        remaining: u32,
    },

    #[error("quantity exceeds instrument envelope: {requested} requested on '{instrument}' (max {})", .envelope.max)]
    ExceedsEnvelope {
        instrument: String,
        requested: f64,
        envelope: Envelope,
    },

    #[error("quantity {quantity} is below the minimum {} of instrument '{instrument}'", .envelope.min)]
    BelowEnvelope {
        instrument: String,
        quantity: f64,
        envelope: Envelope,
    },

    #[error("location '{location}' holds {available} but {requested} was requested")]
    InsufficientVolume {
        location: String,
        requested: f64,
        available: f64,
    },

    #[error("depositing {requested} into '{location}' would exceed its capacity of {capacity} (holds {current})")]
    CapacityExceeded {
        location: String,
        requested: f64,
        capacity: f64,
        current: f64,
    },

    #[error("labware '{resource}' is already placed at '{slot}'")]
    AlreadyPlaced { resource: String, slot: String },

    #[error("slot '{slot}' is occupied by '{occupant}'")]
    SlotOccupied { slot: String, occupant: String },
}

impl DenialReason {
    /// The requested total and the envelope when the denial can be resolved by decomposition.
    pub fn exceeded_envelope(&self) -> Option<(f64, Envelope)> {
        match self {
            DenialReason::ExceedsEnvelope {
                requested,
                envelope,
                ..
            } => Some((*requested, *envelope)),
            _ => None,
        }
    }
}

/// Errors raised when resource descriptors cannot form a tracker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("resource id '{0}' is declared more than once")]
    DuplicateResource(String),

    #[error("instrument '{instrument}' has an empty envelope [{min}, {max}]")]
    InvalidEnvelope { instrument: String, min: f64, max: f64 },

    #[error("location '{location}' has an invalid volume: {reason}")]
    InvalidVolume { location: String, reason: String },

    #[error("plate '{plate}' has an invalid layout of {rows}x{columns} wells")]
    InvalidPlate { plate: String, rows: u8, columns: u8 },
}

impl ResourceError {
    pub fn resource(&self) -> &str {
        match self {
            ResourceError::DuplicateResource(id) => id,
            ResourceError::InvalidEnvelope { instrument, .. } => instrument,
            ResourceError::InvalidVolume { location, .. } => location,
            ResourceError::InvalidPlate { plate, .. } => plate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_envelope_denials_are_decomposable() {
        let envelope = Envelope::new(10.0, 300.0);
        let exceeds = DenialReason::ExceedsEnvelope {
            instrument: "p300".into(),
            requested: 900.0,
            envelope,
        };
        assert_eq!(exceeds.exceeded_envelope(), Some((900.0, envelope)));
        assert!(exceeds
            .to_string()
            .starts_with("quantity exceeds instrument envelope"));

        let no_tips = DenialReason::NoConsumableLoaded {
            instrument: "p300".into(),
        };
        assert_eq!(no_tips.exceeded_envelope(), None);
    }
}
