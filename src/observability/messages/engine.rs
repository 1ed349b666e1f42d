// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for protocol runs and activity execution.
//!
//! This module contains message types for logging events related to:
//! * Run lifecycle (start, completion, abort)
//! * Activity dispatch and completion
//! * Sub-protocol splicing and quantity decomposition
//! * Joins that can no longer fire under the failsafe policy

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use labop_engine::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     execution_id: "run-1",
///     protocol: "transfer_toy",
///     agent: "tester",
///     time_mode: "ordinal_time",
///     node_count: 5,
///     max_concurrency: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub execution_id: &'a str,
    pub protocol: &'a str,
    pub agent: &'a str,
    pub time_mode: &'a str,
    pub node_count: usize,
    pub max_concurrency: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run '{}' of protocol '{}' for agent '{}': {} nodes, {} time, max_concurrency={}",
            self.execution_id,
            self.protocol,
            self.agent,
            self.node_count,
            self.time_mode,
            self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            protocol = self.protocol,
            agent = self.agent,
            time_mode = self.time_mode,
            node_count = self.node_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            execution_id = self.execution_id,
            protocol = self.protocol,
            time_mode = self.time_mode,
        )
    }
}

/// Run finished, successfully or not.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunFinished<'a> {
    pub execution_id: &'a str,
    pub status: &'a str,
    pub entries: usize,
    pub failures: usize,
    pub duration: std::time::Duration,
}

impl Display for RunFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' finished with status {}: {} entries, {} failures in {:?}",
            self.execution_id, self.status, self.entries, self.failures, self.duration
        )
    }
}

impl StructuredLog for RunFinished<'_> {
    fn log(&self) {
        tracing::info!(
            execution_id = self.execution_id,
            status = self.status,
            entries = self.entries,
            failures = self.failures,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_finished",
            span_name = name,
            execution_id = self.execution_id,
            status = self.status,
            duration = ?self.duration,
        )
    }
}

/// Run aborted on the first failure.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunAborted<'a> {
    pub execution_id: &'a str,
    pub error: &'a dyn std::error::Error,
    pub cancelled: usize,
}

impl Display for RunAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' aborted ({} in-flight activities cancelled): {}",
            self.execution_id, self.cancelled, self.error
        )
    }
}

impl StructuredLog for RunAborted<'_> {
    fn log(&self) {
        tracing::error!(
            execution_id = self.execution_id,
            cancelled = self.cancelled,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_aborted",
            span_name = name,
            execution_id = self.execution_id,
            error = %self.error,
        )
    }
}

/// A primitive activity was handed to the specializations.
///
/// # Log Level
/// `debug!` - Per-activity detail
pub struct ActivityDispatched<'a> {
    pub activity: &'a str,
    pub primitive: &'a str,
    pub rank: usize,
}

impl Display for ActivityDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching activity '{}' ({}) at rank {}",
            self.activity, self.primitive, self.rank
        )
    }
}

impl StructuredLog for ActivityDispatched<'_> {
    fn log(&self) {
        tracing::debug!(
            activity = self.activity,
            primitive = self.primitive,
            rank = self.rank,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "activity",
            span_name = name,
            activity = self.activity,
            primitive = self.primitive,
        )
    }
}

/// An activity completed.
///
/// # Log Level
/// `debug!` - Per-activity detail
pub struct ActivityCompleted<'a> {
    pub activity: &'a str,
    pub kind: &'a str,
    pub outputs: usize,
}

impl Display for ActivityCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Activity '{}' ({}) completed with {} outputs",
            self.activity, self.kind, self.outputs
        )
    }
}

impl StructuredLog for ActivityCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            activity = self.activity,
            kind = self.kind,
            outputs = self.outputs,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "activity_completed",
            span_name = name,
            activity = self.activity,
            kind = self.kind,
        )
    }
}

/// An activity failed.
///
/// # Log Level
/// `warn!` - The failure policy decides whether the run survives it
pub struct ActivityFailed<'a> {
    pub activity: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ActivityFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Activity '{}' failed: {}", self.activity, self.error)
    }
}

impl StructuredLog for ActivityFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            activity = self.activity,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "activity_failed",
            span_name = name,
            activity = self.activity,
            error = %self.error,
        )
    }
}

/// A fresh copy of a sub-protocol was added to the run arena.
///
/// # Log Level
/// `debug!` - Per-activity detail
pub struct SubprotocolSpliced<'a> {
    pub call: &'a str,
    pub protocol: &'a str,
    pub offset: usize,
    pub nodes: usize,
}

impl Display for SubprotocolSpliced<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Call '{}' spliced protocol '{}': {} nodes from id {}",
            self.call, self.protocol, self.nodes, self.offset
        )
    }
}

impl StructuredLog for SubprotocolSpliced<'_> {
    fn log(&self) {
        tracing::debug!(
            call = self.call,
            protocol = self.protocol,
            offset = self.offset,
            nodes = self.nodes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "subprotocol",
            span_name = name,
            call = self.call,
            protocol = self.protocol,
        )
    }
}

/// A quantity beyond the instrument envelope was split into several operations.
///
/// # Log Level
/// `info!` - Changes what the robot will do
pub struct QuantityDecomposed<'a> {
    pub activity: &'a str,
    pub quantity: f64,
    pub operations: &'a [f64],
}

impl Display for QuantityDecomposed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Activity '{}' decomposed {} into {} operations {:?}",
            self.activity,
            self.quantity,
            self.operations.len(),
            self.operations
        )
    }
}

impl StructuredLog for QuantityDecomposed<'_> {
    fn log(&self) {
        tracing::info!(
            activity = self.activity,
            quantity = self.quantity,
            operation_count = self.operations.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "decomposition",
            span_name = name,
            activity = self.activity,
            quantity = self.quantity,
        )
    }
}

/// A join lost one of its incoming branches to a failure and will never fire.
///
/// # Log Level
/// `warn!` - Part of the protocol was skipped
pub struct JoinBlocked<'a> {
    pub execution_id: &'a str,
    pub join: &'a str,
}

impl Display for JoinBlocked<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}': join '{}' is blocked by a failed branch",
            self.execution_id, self.join
        )
    }
}

impl StructuredLog for JoinBlocked<'_> {
    fn log(&self) {
        tracing::warn!(
            execution_id = self.execution_id,
            join = self.join,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "join_blocked",
            span_name = name,
            execution_id = self.execution_id,
            join = self.join,
        )
    }
}

/// An in-flight dispatch was dropped by an aborting run before it committed.
///
/// # Log Level
/// `warn!` - The activity's effects were discarded
pub struct DispatchCancelled<'a> {
    pub execution_id: &'a str,
    pub activity: &'a str,
}

impl Display for DispatchCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}': dispatch of '{}' was cancelled",
            self.execution_id, self.activity
        )
    }
}

impl StructuredLog for DispatchCancelled<'_> {
    fn log(&self) {
        tracing::warn!(
            execution_id = self.execution_id,
            activity = self.activity,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "dispatch_cancelled",
            span_name = name,
            execution_id = self.execution_id,
            activity = self.activity,
        )
    }
}
