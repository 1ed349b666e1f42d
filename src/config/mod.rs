// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Engine configuration: YAML loading, validation and runtime wiring.

mod loader;
mod runtime;
mod specialization_set;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, EngineConfig, ExecutorOptions, LoggingConfig,
    SpecializationConfig,
};
pub use runtime::RuntimeBuilder;
pub use specialization_set::{BoundSpecialization, SpecializationSet};
pub use validation::validate_config;
