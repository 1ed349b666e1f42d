// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides the message types for all diagnostic and operational
//! logging of the engine. Message types follow a struct-based pattern with a
//! `Display` implementation and a [`StructuredLog`](messages::StructuredLog)
//! implementation that emits the same event with typed fields:
//!
//! * No magic strings scattered through the scheduler and tracker
//! * One place to change the wording of an event
//! * Consistent, filterable `tracing` output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - run lifecycle, activity dispatch, fork/join and sub-protocol events
//! * `messages::resource` - reservations, commits and releases
//! * `messages::specialization` - backend invocations and factory events
//! * `messages::validation` - graph and configuration validation
//!
//! # Usage
//!
//! ```rust
//! use labop_engine::observability::messages::engine::JoinBlocked;
//! use labop_engine::observability::messages::StructuredLog;
//!
//! JoinBlocked {
//!     execution_id: "run-1",
//!     join: "join",
//! }
//! .log();
//! ```

pub mod messages;
