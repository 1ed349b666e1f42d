// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ErrorKind, ExecutionError};
use crate::graph::{ActivityKind, NodeId, Outputs, ResolvedInputs};
use crate::record::Timestamp;
use serde::Serialize;

/// One completed or failed activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordEntry {
    pub node: NodeId,
    /// Scoped activity path, e.g. `first_read/read`.
    pub activity: String,
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primitive: Option<String>,
    pub started: Timestamp,
    pub ended: Timestamp,
    #[serde(skip_serializing_if = "ResolvedInputs::is_empty")]
    pub inputs: ResolvedInputs,
    #[serde(skip_serializing_if = "Outputs::is_empty")]
    pub outputs: Outputs,
    /// Device-level quantities when the activity was decomposed or pipetted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    pub outcome: Outcome,
}

impl RecordEntry {
    /// Entry of a control node or call, which has no inputs of its own.
    pub fn control(
        node: NodeId,
        activity: impl Into<String>,
        kind: ActivityKind,
        started: Timestamp,
        ended: Timestamp,
    ) -> Self {
        Self {
            node,
            activity: activity.into(),
            kind,
            primitive: None,
            started,
            ended,
            inputs: ResolvedInputs::new(),
            outputs: Outputs::new(),
            operations: Vec::new(),
            grant: None,
            instrument: None,
            outcome: Outcome::Completed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, Outcome::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Failed { kind: ErrorKind, message: String },
}

impl From<&ExecutionError> for Outcome {
    fn from(error: &ExecutionError) -> Self {
        Outcome::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ExecutionError> for Failure {
    fn from(error: &ExecutionError) -> Self {
        Self {
            activity: error.activity().map(str::to_string),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum RunWarning {
    /// A join lost one of its branches and will never fire.
    JoinBlocked { join: String },
    /// An in-flight dispatch was cancelled by an abort; its grant was never committed.
    DispatchCancelled { activity: String },
}
