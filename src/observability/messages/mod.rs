// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! [`StructuredLog`] to emit it as a `tracing` event (or open a span) with
//! the message fields attached.
//!
//! # Organization
//!
//! * `engine` - run lifecycle and activity events
//! * `resource` - resource reservation events
//! * `specialization` - backend invocation and factory events
//! * `validation` - graph and configuration validation events

use tracing::Span;

pub mod engine;
pub mod resource;
pub mod specialization;
pub mod validation;

/// A message that knows its log level and its structured fields.
pub trait StructuredLog {
    /// Emits the message as an event at its level.
    fn log(&self);

    /// Opens a span carrying the message fields.
    fn span(&self, name: &str) -> Span;
}
