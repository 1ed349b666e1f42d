// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod resource;
mod specialization;
mod validation;

pub use config::ConfigError;
pub use execution::{
    DecompositionError, ErrorKind, ExecutionError, FailurePolicy, RunFailure,
};
pub use resource::{DenialReason, ResourceError};
pub use specialization::{InputError, SpecializationError};
pub use validation::{BuildError, MalformedGraph, ValidationError};
