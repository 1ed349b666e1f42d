// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarations of the physical resources a protocol works with.

use crate::errors::ResourceError;
use crate::resources::VOLUME_EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Largest plate layout that still has single-letter row names.
pub const MAX_PLATE_ROWS: u8 = 26;

/// Quantity range a single instrument operation can handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min: f64,
    pub max: f64,
}

impl Envelope {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// No positive quantity fits.
    pub fn is_empty(&self) -> bool {
        !self.min.is_finite() || !self.max.is_finite() || self.max < self.min || self.max <= 0.0
    }

    /// Range both envelopes accept.
    pub fn intersect(&self, other: &Envelope) -> Envelope {
        Envelope::new(self.min.max(other.min), self.max.min(other.max))
    }

    pub fn contains(&self, quantity: f64) -> bool {
        quantity >= self.min - VOLUME_EPSILON && quantity <= self.max + VOLUME_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationKind {
    Container {
        capacity: f64,
        #[serde(default)]
        initial_volume: f64,
    },
    /// Expanded into one container per well, named `plate/A1`.
    Plate {
        rows: u8,
        columns: u8,
        well_capacity: f64,
        #[serde(default)]
        initial_volume: f64,
    },
    TipRack {
        tip_kind: String,
        tips: u32,
    },
    Slot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSpec {
    pub id: String,
    #[serde(flatten)]
    pub kind: LocationKind,
}

/// A pipetting instrument; its model doubles as its resource id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub model: String,
    pub envelope: Envelope,
    pub tip_kind: String,
    /// Mount position when the instrument starts mounted.
    #[serde(default)]
    pub mount: Option<String>,
    /// Tips already loaded at start.
    #[serde(default)]
    pub tips: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptors {
    #[serde(default)]
    pub locations: Vec<LocationSpec>,
    #[serde(default)]
    pub instruments: Vec<InstrumentSpec>,
}

impl ResourceDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(self, id: &str, capacity: f64) -> Self {
        self.filled_container(id, capacity, 0.0)
    }

    pub fn filled_container(mut self, id: &str, capacity: f64, volume: f64) -> Self {
        self.locations.push(LocationSpec {
            id: id.to_string(),
            kind: LocationKind::Container {
                capacity,
                initial_volume: volume,
            },
        });
        self
    }

    pub fn plate(self, id: &str, rows: u8, columns: u8, well_capacity: f64) -> Self {
        self.filled_plate(id, rows, columns, well_capacity, 0.0)
    }

    /// A plate whose wells all start with `volume`.
    pub fn filled_plate(
        mut self,
        id: &str,
        rows: u8,
        columns: u8,
        well_capacity: f64,
        volume: f64,
    ) -> Self {
        self.locations.push(LocationSpec {
            id: id.to_string(),
            kind: LocationKind::Plate {
                rows,
                columns,
                well_capacity,
                initial_volume: volume,
            },
        });
        self
    }

    pub fn tip_rack(mut self, id: &str, tip_kind: &str, tips: u32) -> Self {
        self.locations.push(LocationSpec {
            id: id.to_string(),
            kind: LocationKind::TipRack {
                tip_kind: tip_kind.to_string(),
                tips,
            },
        });
        self
    }

    pub fn slot(mut self, id: &str) -> Self {
        self.locations.push(LocationSpec {
            id: id.to_string(),
            kind: LocationKind::Slot,
        });
        self
    }

    pub fn instrument(mut self, spec: InstrumentSpec) -> Self {
        self.instruments.push(spec);
        self
    }

    /// Every problem that would prevent building a tracker.
    pub fn check(&self) -> Vec<ResourceError> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        let ids = self
            .locations
            .iter()
            .map(|location| location.id.as_str())
            .chain(self.instruments.iter().map(|instrument| instrument.model.as_str()));
        for id in ids {
            if !seen.insert(id) {
                errors.push(ResourceError::DuplicateResource(id.to_string()));
            }
        }

        for location in &self.locations {
            match &location.kind {
                LocationKind::Container {
                    capacity,
                    initial_volume,
                } => {
                    if let Some(reason) = volume_problem(*capacity, *initial_volume) {
                        errors.push(ResourceError::InvalidVolume {
                            location: location.id.clone(),
                            reason,
                        });
                    }
                }
                LocationKind::Plate {
                    rows,
                    columns,
                    well_capacity,
                    initial_volume,
                } => {
                    if *rows == 0 || *rows > MAX_PLATE_ROWS || *columns == 0 {
                        errors.push(ResourceError::InvalidPlate {
                            plate: location.id.clone(),
                            rows: *rows,
                            columns: *columns,
                        });
                    }
                    if let Some(reason) = volume_problem(*well_capacity, *initial_volume) {
                        errors.push(ResourceError::InvalidVolume {
                            location: location.id.clone(),
                            reason,
                        });
                    }
                }
                LocationKind::TipRack { .. } | LocationKind::Slot => {}
            }
        }

        for instrument in &self.instruments {
            let envelope = instrument.envelope;
            if envelope.is_empty() || envelope.min < 0.0 {
                errors.push(ResourceError::InvalidEnvelope {
                    instrument: instrument.model.clone(),
                    min: envelope.min,
                    max: envelope.max,
                });
            }
        }
        errors
    }
}

fn volume_problem(capacity: f64, volume: f64) -> Option<String> {
    if !capacity.is_finite() || capacity <= 0.0 {
        Some(format!("capacity {} must be positive", capacity))
    } else if !volume.is_finite() || volume < 0.0 {
        Some(format!("initial volume {} must not be negative", volume))
    } else if volume > capacity {
        Some(format!(
            "initial volume {} exceeds capacity {}",
            volume, capacity
        ))
    } else {
        None
    }
}

/// Well names of a plate in row-major order: `A1, A2, …, B1, …`.
pub fn well_names(rows: u8, columns: u8) -> Vec<String> {
    (0..rows.min(MAX_PLATE_ROWS))
        .flat_map(|row| {
            let letter = (b'A' + row) as char;
            (1..=columns).map(move |column| format!("{}{}", letter, column))
        })
        .collect()
}
