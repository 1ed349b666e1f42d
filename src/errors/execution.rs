// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{DenialReason, MalformedGraph};
use crate::record::ExecutionRecord;
use crate::resources::Envelope;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that stop an activity (and, depending on the failure policy, the run).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    MalformedGraph(#[from] MalformedGraph),

    #[error("activity '{activity}': input '{input}' is unresolved: {reason}")]
    UnresolvedInput {
        activity: String,
        input: String,
        reason: String,
    },

    #[error("activity '{activity}': resource denied: {reason}")]
    ResourceDenied {
        activity: String,
        reason: DenialReason,
    },

    #[error("activity '{activity}': infeasible quantity: {cause}")]
    InfeasibleQuantity {
        activity: String,
        cause: DecompositionError,
    },

    #[error("activity '{activity}': specialization '{specialization}' failed: {message}")]
    SpecializationFailure {
        activity: String,
        specialization: String,
        message: String,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::MalformedGraph(_) => ErrorKind::MalformedGraph,
            ExecutionError::UnresolvedInput { .. } => ErrorKind::UnresolvedInput,
            ExecutionError::ResourceDenied { .. } => ErrorKind::ResourceDenied,
            ExecutionError::InfeasibleQuantity { .. } => ErrorKind::InfeasibleQuantity,
            ExecutionError::SpecializationFailure { .. } => ErrorKind::SpecializationFailure,
            ExecutionError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Path of the activity the error belongs to, if any.
    pub fn activity(&self) -> Option<&str> {
        match self {
            ExecutionError::UnresolvedInput { activity, .. }
            | ExecutionError::ResourceDenied { activity, .. }
            | ExecutionError::InfeasibleQuantity { activity, .. }
            | ExecutionError::SpecializationFailure { activity, .. } => Some(activity),
            ExecutionError::MalformedGraph(_) | ExecutionError::Internal { .. } => None,
        }
    }
}

/// Serializable classification of an [`ExecutionError`], stored in the execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedGraph,
    UnresolvedInput,
    ResourceDenied,
    InfeasibleQuantity,
    SpecializationFailure,
    Internal,
}

/// Why a quantity could not be split into device-level operations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DecompositionError {
    #[error("quantity {quantity} must be positive and finite")]
    NonPositiveQuantity { quantity: f64 },

    #[error("envelope [{}, {}] admits no operation", .envelope.min, .envelope.max)]
    EmptyEnvelope { envelope: Envelope },

    #[error("quantity {quantity} is below the minimum {} of a single operation", .envelope.min)]
    BelowMinimum { quantity: f64, envelope: Envelope },

    #[error("remainder of {quantity} cannot be balanced within [{}, {}]", .envelope.min, .envelope.max)]
    UnbalancedRemainder { quantity: f64, envelope: Envelope },
}

/// Strategy applied when an activity fails.
///
/// # Variants
/// * `Abort` - stop on the first failure and return the partial record (failsafe off)
/// * `ContinueBranches` - keep running independent branches, block the joins that need the
///   failed branch (failsafe on)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    ContinueBranches,
}

impl FailurePolicy {
    pub fn from_failsafe(failsafe: bool) -> Self {
        if failsafe {
            FailurePolicy::ContinueBranches
        } else {
            FailurePolicy::Abort
        }
    }

    pub fn is_failsafe(&self) -> bool {
        matches!(self, FailurePolicy::ContinueBranches)
    }
}

/// A run that ended in error, together with the record accumulated until then.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: ExecutionError,
    pub record: ExecutionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_and_activity() {
        struct TestCase {
            name: &'static str,
            error: ExecutionError,
            kind: ErrorKind,
            activity: Option<&'static str>,
        }

        let test_cases = vec![
            TestCase {
                name: "unresolved input",
                error: ExecutionError::UnresolvedInput {
                    activity: "transfer".into(),
                    input: "amount".into(),
                    reason: "no value".into(),
                },
                kind: ErrorKind::UnresolvedInput,
                activity: Some("transfer"),
            },
            TestCase {
                name: "resource denied",
                error: ExecutionError::ResourceDenied {
                    activity: "transfer".into(),
                    reason: DenialReason::NoConsumableLoaded {
                        instrument: "p300".into(),
                    },
                },
                kind: ErrorKind::ResourceDenied,
                activity: Some("transfer"),
            },
            TestCase {
                name: "malformed graph",
                error: ExecutionError::MalformedGraph(MalformedGraph::new("p", vec![])),
                kind: ErrorKind::MalformedGraph,
                activity: None,
            },
            TestCase {
                name: "internal",
                error: ExecutionError::Internal {
                    message: "boom".into(),
                },
                kind: ErrorKind::Internal,
                activity: None,
            },
        ];

        for case in test_cases {
            assert_eq!(case.error.kind(), case.kind, "case: {}", case.name);
            assert_eq!(case.error.activity(), case.activity, "case: {}", case.name);
        }
    }

    #[test]
    fn test_failure_policy_from_failsafe() {
        assert_eq!(FailurePolicy::from_failsafe(false), FailurePolicy::Abort);
        assert_eq!(
            FailurePolicy::from_failsafe(true),
            FailurePolicy::ContinueBranches
        );
        assert!(FailurePolicy::ContinueBranches.is_failsafe());
        assert_eq!(FailurePolicy::default(), FailurePolicy::Abort);
    }
}
