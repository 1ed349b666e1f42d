// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Physical resources: declarations, requirements, tracked state and reservations.

mod descriptors;
mod requirement;
pub mod state;
mod tracker;

pub use descriptors::{
    well_names, Envelope, InstrumentSpec, LocationKind, LocationSpec, ResourceDescriptors,
    MAX_PLATE_ROWS,
};
pub use requirement::{with_operations, Requirement};
pub use state::{InstrumentState, ResourceSnapshot, ResourceState};
pub use tracker::{InstrumentSelection, ResourceGrant, ResourceTracker};

/// Tolerance for volume and envelope comparisons.
pub const VOLUME_EPSILON: f64 = 1e-9;
