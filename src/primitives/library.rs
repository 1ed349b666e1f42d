// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Standard primitive library.

use crate::graph::{Value, ValueKind};
use crate::primitives::{Footprint, ParameterSpec, PrimitiveSignature};

pub const EMPTY_CONTAINER: &str = "EmptyContainer";
pub const PLATE_COORDINATES: &str = "PlateCoordinates";
pub const CONFIGURE_ROBOT: &str = "ConfigureRobot";
pub const LOAD_RACK_ON_INSTRUMENT: &str = "LoadRackOnInstrument";
pub const TRANSFER: &str = "Transfer";
pub const PROVISION: &str = "Provision";
pub const MEASURE_ABSORBANCE: &str = "MeasureAbsorbance";
pub const MEASURE_FLUORESCENCE: &str = "MeasureFluorescence";

pub const DEFAULT_MOUNT: &str = "left";

pub fn standard_signatures() -> Vec<PrimitiveSignature> {
    vec![
        PrimitiveSignature::new(EMPTY_CONTAINER, "Provide an empty container of samples")
            .with_input(ParameterSpec::required("specification", ValueKind::Location))
            .with_input(ParameterSpec::optional("sample_array", ValueKind::Any))
            .with_output("samples"),
        PrimitiveSignature::new(PLATE_COORDINATES, "Select wells of a plate")
            .with_input(ParameterSpec::required("source", ValueKind::Location))
            .with_input(ParameterSpec::required("coordinates", ValueKind::Text))
            .with_output("samples"),
        PrimitiveSignature::new(CONFIGURE_ROBOT, "Mount an instrument on the robot")
            .with_input(ParameterSpec::required("instrument", ValueKind::Text))
            .with_input(ParameterSpec::with_default(
                "mount",
                ValueKind::Text,
                Value::text(DEFAULT_MOUNT),
            ))
            .with_footprint(Footprint::ConfigureInstrument),
        PrimitiveSignature::new(LOAD_RACK_ON_INSTRUMENT, "Place a tip rack on the deck")
            .with_input(ParameterSpec::required("rack", ValueKind::Location))
            .with_input(ParameterSpec::optional("coordinates", ValueKind::Text))
            .with_footprint(Footprint::LoadRack),
        PrimitiveSignature::new(TRANSFER, "Move liquid from one location to another")
            .with_input(ParameterSpec::required("source", ValueKind::Location))
            .with_input(ParameterSpec::required("destination", ValueKind::Location))
            .with_input(ParameterSpec::required("amount", ValueKind::Quantity))
            .with_input(ParameterSpec::optional("instrument", ValueKind::Text))
            .with_input(ParameterSpec::optional("dispense_velocity", ValueKind::Quantity))
            .with_footprint(Footprint::Transfer),
        PrimitiveSignature::new(PROVISION, "Fill a location from an external supply")
            .with_input(ParameterSpec::optional("resource", ValueKind::Text))
            .with_input(ParameterSpec::required("destination", ValueKind::Location))
            .with_input(ParameterSpec::required("amount", ValueKind::Quantity))
            .with_footprint(Footprint::Provision),
        PrimitiveSignature::new(MEASURE_ABSORBANCE, "Read absorbance of samples")
            .with_input(ParameterSpec::required("samples", ValueKind::Any))
            .with_input(ParameterSpec::required("wavelength", ValueKind::Quantity))
            .with_output("measurements"),
        PrimitiveSignature::new(MEASURE_FLUORESCENCE, "Read fluorescence of samples")
            .with_input(ParameterSpec::required("samples", ValueKind::Any))
            .with_input(ParameterSpec::required("excitation_wavelength", ValueKind::Quantity))
            .with_input(ParameterSpec::required("emission_wavelength", ValueKind::Quantity))
            .with_input(ParameterSpec::optional("emission_bandpass_width", ValueKind::Quantity))
            .with_output("measurements"),
    ]
}
