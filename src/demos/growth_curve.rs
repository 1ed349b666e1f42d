// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::BuildError;
use crate::graph::{ActivityGraph, Bindings, ProtocolBuilder, Value};
use crate::primitives::library::{
    EMPTY_CONTAINER, MEASURE_ABSORBANCE, MEASURE_FLUORESCENCE, PLATE_COORDINATES, PROVISION,
};
use crate::primitives::PrimitiveRegistry;
use crate::resources::ResourceDescriptors;
use std::sync::Arc;

/// Reusable measurement protocol: absorbance of `samples` at `wavelength` (600 nm default).
pub fn read_absorbance(registry: &PrimitiveRegistry) -> Result<ActivityGraph, BuildError> {
    let mut builder = ProtocolBuilder::new("read_absorbance", registry);
    builder.parameter("samples", None);
    builder.parameter("wavelength", Some(Value::nanometers(600.0)));
    let read = builder.named_step(
        "measure",
        MEASURE_ABSORBANCE,
        Bindings::new()
            .parameter("samples", "samples")
            .parameter("wavelength", "wavelength"),
    )?;
    builder.output("measurements", read, "measurements");
    Ok(builder.build())
}

/// Culture provisioning followed by three reads running in parallel.
///
/// ```text
/// plate -> wells -> provision_culture -> fork -+-> od600 ------------------+-> join
///                                              +-> od450 -> fluorescence --+
/// ```
pub fn growth_curve(registry: &PrimitiveRegistry) -> Result<ActivityGraph, BuildError> {
    let template = Arc::new(read_absorbance(registry)?);

    let mut builder = ProtocolBuilder::new("growth_curve", registry);
    builder.resources(ResourceDescriptors::new().plate("plate", 8, 12, 200.0));
    builder.parameter("culture_volume", Some(Value::microliters(100.0)));

    let plate = builder.named_step(
        "plate",
        EMPTY_CONTAINER,
        Bindings::new().literal("specification", Value::location("plate")),
    )?;
    let wells = builder.named_step(
        "wells",
        PLATE_COORDINATES,
        Bindings::new()
            .pin("source", plate, "samples")
            .literal("coordinates", Value::text("A1:A3")),
    )?;
    builder.named_step(
        "provision_culture",
        PROVISION,
        Bindings::new()
            .literal("resource", Value::text("culture"))
            .literal("destination", Value::location("plate/A1"))
            .parameter("amount", "culture_volume"),
    )?;

    let od600 = builder.detached_call(
        "od600",
        template.clone(),
        Bindings::new().pin("samples", wells, "samples"),
    );
    let od450 = builder.detached_call(
        "od450",
        template,
        Bindings::new()
            .pin("samples", wells, "samples")
            .literal("wavelength", Value::nanometers(450.0)),
    );
    let fluorescence = builder.detached_named_step(
        "fluorescence",
        MEASURE_FLUORESCENCE,
        Bindings::new()
            .pin("samples", wells, "samples")
            .literal("excitation_wavelength", Value::nanometers(485.0))
            .literal("emission_wavelength", Value::nanometers(530.0)),
    )?;
    builder.parallel(vec![vec![od600], vec![od450, fluorescence]])?;

    builder
        .output("od600", od600, "measurements")
        .output("od450", od450, "measurements")
        .output("fluorescence", fluorescence, "measurements");
    Ok(builder.build())
}
