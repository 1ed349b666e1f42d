// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::BuildError;
use crate::graph::{ActivityGraph, Bindings, ProtocolBuilder, Value};
use crate::primitives::library::{
    CONFIGURE_ROBOT, EMPTY_CONTAINER, LOAD_RACK_ON_INSTRUMENT, PLATE_COORDINATES, TRANSFER,
};
use crate::primitives::PrimitiveRegistry;
use crate::resources::{Envelope, InstrumentSpec, ResourceDescriptors};

/// Deck with two slots, a deep-well plate whose wells start at 1000 uL, a 96 tip rack and an
/// unmounted 20-300 uL single channel pipette.
pub fn liquid_handling_lab() -> ResourceDescriptors {
    ResourceDescriptors::new()
        .slot("1")
        .slot("2")
        .filled_plate("plate", 8, 12, 2_000.0, 1_000.0)
        .tip_rack("tiprack", "tips_300", 96)
        .instrument(InstrumentSpec {
            model: "p300_single".into(),
            envelope: Envelope::new(20.0, 300.0),
            tip_kind: "tips_300".into(),
            mount: None,
            tips: None,
        })
}

/// Protocol moving `amount` uL from `plate/A1` to `plate/B1`.
///
/// `load_tips` controls whether the tip rack is placed before the transfer.
fn transfer_protocol(
    name: &str,
    registry: &PrimitiveRegistry,
    amount: f64,
    load_tips: bool,
) -> Result<ActivityGraph, BuildError> {
    let mut builder = ProtocolBuilder::new(name, registry);
    builder.resources(liquid_handling_lab());

    builder.step(
        CONFIGURE_ROBOT,
        Bindings::new()
            .literal("instrument", Value::text("p300_single"))
            .literal("mount", Value::text("left")),
    )?;
    let plate = builder.step(
        EMPTY_CONTAINER,
        Bindings::new().literal("specification", Value::location("plate")),
    )?;
    builder.step(
        LOAD_RACK_ON_INSTRUMENT,
        Bindings::new()
            .pin("rack", plate, "samples")
            .literal("coordinates", Value::text("2")),
    )?;
    let source = builder.named_step(
        "source",
        PLATE_COORDINATES,
        Bindings::new()
            .pin("source", plate, "samples")
            .literal("coordinates", Value::text("A1")),
    )?;
    let destination = builder.named_step(
        "destination",
        PLATE_COORDINATES,
        Bindings::new()
            .pin("source", plate, "samples")
            .literal("coordinates", Value::text("B1")),
    )?;
    if load_tips {
        builder.named_step(
            "load_tips",
            LOAD_RACK_ON_INSTRUMENT,
            Bindings::new()
                .literal("rack", Value::location("tiprack"))
                .literal("coordinates", Value::text("1")),
        )?;
    }
    builder.step(
        TRANSFER,
        Bindings::new()
            .pin("source", source, "samples")
            .pin("destination", destination, "samples")
            .literal("amount", Value::microliters(amount)),
    )?;
    Ok(builder.build())
}

pub fn transfer_toy(registry: &PrimitiveRegistry) -> Result<ActivityGraph, BuildError> {
    transfer_protocol("transfer_toy", registry, 100.0, true)
}

pub fn max_volume_transfer(registry: &PrimitiveRegistry) -> Result<ActivityGraph, BuildError> {
    transfer_protocol("max_volume_transfer", registry, 900.0, true)
}

pub fn out_of_tips(registry: &PrimitiveRegistry) -> Result<ActivityGraph, BuildError> {
    transfer_protocol("out_of_tips", registry, 100.0, false)
}
