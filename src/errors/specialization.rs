// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::resources::Envelope;
use thiserror::Error;

/// Failure reported by a specialization while executing one activity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecializationError {
    #[error("{0}")]
    Failed(String),

    /// The backend cannot perform the quantity in one operation. The scheduler
    /// decomposes and retries when this is reported before any side effect.
    #[error("quantity {requested} exceeds the device envelope (max {})", .envelope.max)]
    ExceedsEnvelope { requested: f64, envelope: Envelope },

    #[error(transparent)]
    Input(#[from] InputError),
}

/// A resolved input is missing or has the wrong kind of value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("input '{0}' is missing")]
    Missing(String),

    #[error("input '{input}' should be a {expected} but is a {found}")]
    WrongKind {
        input: String,
        expected: String,
        found: String,
    },
}

impl InputError {
    pub fn input(&self) -> &str {
        match self {
            InputError::Missing(input) => input,
            InputError::WrongKind { input, .. } => input,
        }
    }
}
