// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for resource reservations.

use crate::errors::DenialReason;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Reservation granted; the grant holds the locks of `resources` resources.
///
/// # Log Level
/// `debug!` - Per-activity detail
pub struct ReservationGranted<'a> {
    pub grant_id: u64,
    pub activity: &'a str,
    pub resources: usize,
    pub instrument: Option<&'a str>,
    pub operations: usize,
}

impl Display for ReservationGranted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Grant {} for '{}': {} resources",
            self.grant_id, self.activity, self.resources
        )?;
        if let Some(instrument) = self.instrument {
            write!(f, ", {} operations on '{}'", self.operations, instrument)?;
        }
        Ok(())
    }
}

impl StructuredLog for ReservationGranted<'_> {
    fn log(&self) {
        tracing::debug!(
            grant_id = self.grant_id,
            activity = self.activity,
            resources = self.resources,
            instrument = self.instrument,
            operations = self.operations,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "grant",
            span_name = name,
            grant_id = self.grant_id,
            activity = self.activity,
        )
    }
}

/// Reservation refused.
///
/// # Log Level
/// `debug!` - Envelope denials are routine and resolved by decomposition; the scheduler
/// reports the ones that fail an activity
pub struct ReservationDenied<'a> {
    pub activity: &'a str,
    pub reason: &'a DenialReason,
}

impl Display for ReservationDenied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reservation for '{}' denied: {}",
            self.activity, self.reason
        )
    }
}

impl StructuredLog for ReservationDenied<'_> {
    fn log(&self) {
        tracing::debug!(
            activity = self.activity,
            reason = %self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "denial",
            span_name = name,
            activity = self.activity,
            reason = %self.reason,
        )
    }
}

/// Staged state written back.
///
/// # Log Level
/// `trace!`
pub struct GrantCommitted<'a> {
    pub grant_id: u64,
    pub activity: &'a str,
}

impl Display for GrantCommitted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Grant {} for '{}' committed", self.grant_id, self.activity)
    }
}

impl StructuredLog for GrantCommitted<'_> {
    fn log(&self) {
        tracing::trace!(grant_id = self.grant_id, activity = self.activity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "grant_committed",
            span_name = name,
            grant_id = self.grant_id,
        )
    }
}

/// Staged state dropped.
///
/// # Log Level
/// `debug!`
pub struct GrantReleased<'a> {
    pub grant_id: u64,
    pub activity: &'a str,
}

impl Display for GrantReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Grant {} for '{}' released", self.grant_id, self.activity)
    }
}

impl StructuredLog for GrantReleased<'_> {
    fn log(&self) {
        tracing::debug!(grant_id = self.grant_id, activity = self.activity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "grant_released",
            span_name = name,
            grant_id = self.grant_id,
        )
    }
}
