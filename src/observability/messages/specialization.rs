// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for specialization backends.
//!
//! This module contains message types for logging events related to:
//! * Specialization invocation per activity and per decomposed operation
//! * Specialization failures
//! * Creation of specializations by name

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Specialization invoked for one (sub-)operation of an activity.
///
/// # Log Level
/// `debug!` - Per-activity detail
///
/// # Example
/// ```
/// use labop_engine::observability::messages::specialization::SpecializationInvoked;
///
/// let msg = SpecializationInvoked {
///     specialization: "script",
///     activity: "transfer",
///     operation: Some(2),
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct SpecializationInvoked<'a> {
    pub specialization: &'a str,
    pub activity: &'a str,
    pub operation: Option<usize>,
}

impl Display for SpecializationInvoked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.operation {
            Some(index) => write!(
                f,
                "Specialization '{}' executing '{}' operation {}",
                self.specialization, self.activity, index
            ),
            None => write!(
                f,
                "Specialization '{}' executing '{}'",
                self.specialization, self.activity
            ),
        }
    }
}

impl StructuredLog for SpecializationInvoked<'_> {
    fn log(&self) {
        tracing::debug!(
            specialization = self.specialization,
            activity = self.activity,
            operation = self.operation.map(|index| index as u64),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "specialization",
            span_name = name,
            specialization = self.specialization,
            activity = self.activity,
        )
    }
}

/// Specialization returned an error.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SpecializationFailed<'a> {
    pub specialization: &'a str,
    pub activity: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for SpecializationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Specialization '{}' failed on '{}': {}",
            self.specialization, self.activity, self.error
        )
    }
}

impl StructuredLog for SpecializationFailed<'_> {
    fn log(&self) {
        tracing::error!(
            specialization = self.specialization,
            activity = self.activity,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "specialization_failed",
            span_name = name,
            specialization = self.specialization,
            error = %self.error,
        )
    }
}

/// Specialization created by the factory.
///
/// # Log Level
/// `info!`
pub struct SpecializationCreated<'a> {
    pub name: &'a str,
    pub primitives: usize,
}

impl Display for SpecializationCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Created specialization '{}' supporting {} primitives",
            self.name, self.primitives
        )
    }
}

impl StructuredLog for SpecializationCreated<'_> {
    fn log(&self) {
        tracing::info!(name = self.name, primitives = self.primitives, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "specialization_created",
            span_name = name,
            specialization = self.name,
        )
    }
}
