// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Concurrency used when the configuration sets none and the host parallelism is unknown
pub const FALLBACK_MAX_CONCURRENCY: usize = 4;
/// Log filter applied when neither the configuration nor `RUST_LOG` sets one
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Agent recorded for runs started without an explicit agent
pub const DEFAULT_AGENT: &str = "labop-engine";
/// Specializations bound when the configuration lists none
pub const DEFAULT_SPECIALIZATIONS: [&str; 3] =
    ["sample_arrays", "script_renderer", "measurement_simulator"];
