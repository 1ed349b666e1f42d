// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // shipped specializations
pub mod config;        // config + runtime wiring
pub mod demos;         // built-in protocols
pub mod engine;        // token scheduler, dispatch, decomposition
pub mod errors;        // error handling
pub mod graph;         // activity graph model
pub mod observability;
pub mod primitives;    // primitive signatures and the standard library
pub mod record;        // execution records
pub mod resources;     // resource tracker
pub mod traits;        // specialization boundary
