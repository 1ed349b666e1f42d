// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shipped specializations.

pub mod factory;
pub mod measurement;
pub mod samples;
pub mod script;
#[cfg(test)]
pub mod stub;

pub use factory::SpecializationFactory;
pub use measurement::MeasurementSimulator;
pub use samples::SampleArrays;
pub use script::ScriptRenderer;
