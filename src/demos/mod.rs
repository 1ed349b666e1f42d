// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in protocols used by the command line and the integration tests.
//!
//! | name                  | shape                                                    |
//! |-----------------------|----------------------------------------------------------|
//! | `transfer_toy`        | robot setup, tip rack, one 100 uL transfer               |
//! | `max_volume_transfer` | 900 uL through a 300 uL pipette (three operations)       |
//! | `out_of_tips`         | transfer on a pipette that never had tips loaded         |
//! | `growth_curve`        | provisioning, then fork/join over a measurement protocol |

mod growth_curve;
mod liquid_handling;

pub use growth_curve::{growth_curve, read_absorbance};
pub use liquid_handling::{liquid_handling_lab, max_volume_transfer, out_of_tips, transfer_toy};

use crate::errors::BuildError;
use crate::graph::ActivityGraph;
use crate::primitives::PrimitiveRegistry;

pub type DemoBuilder = fn(&PrimitiveRegistry) -> Result<ActivityGraph, BuildError>;

pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    pub build: DemoBuilder,
}

pub fn catalog() -> Vec<Demo> {
    vec![
        Demo {
            name: "transfer_toy",
            description: "Configure a pipette, load labware and tips, transfer 100 uL",
            build: transfer_toy,
        },
        Demo {
            name: "max_volume_transfer",
            description: "Transfer 900 uL with a 300 uL pipette; decomposed into 3 operations",
            build: max_volume_transfer,
        },
        Demo {
            name: "out_of_tips",
            description: "Transfer without a tip rack; denied before any backend runs",
            build: out_of_tips,
        },
        Demo {
            name: "growth_curve",
            description: "Provision culture, then read absorbance and fluorescence in parallel",
            build: growth_curve,
        },
    ]
}

pub fn find(name: &str) -> Option<Demo> {
    catalog().into_iter().find(|demo| demo.name == name)
}
