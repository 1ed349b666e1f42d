// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{EngineConfig, SpecializationSet};
use crate::engine::ProtocolExecutor;
use crate::errors::ConfigError;
use crate::primitives::PrimitiveRegistry;
use std::sync::Arc;

pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Wires the configured specializations and run options into an executor.
    pub fn from_config(
        cfg: &EngineConfig,
        registry: Arc<PrimitiveRegistry>,
    ) -> Result<ProtocolExecutor, ConfigError> {
        let specializations = SpecializationSet::from_config(cfg)?;
        specializations.announce(&registry);
        Ok(ProtocolExecutor::new(registry, specializations)
            .with_time_mode(cfg.time_mode)
            .with_failsafe(cfg.failsafe)
            .with_max_concurrency(cfg.executor_options.get_max_concurrency())
            .with_instrument_selection(cfg.instrument_selection))
    }
}
