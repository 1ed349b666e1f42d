// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::SpecializationError;
use crate::graph::{NodeId, Outputs, ResolvedInputs};
use crate::record::RunStatus;
use crate::resources::{Envelope, ResourceGrant};
use async_trait::async_trait;

/// One device-level operation of a decomposed activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    /// Zero-based position within the activity.
    pub index: usize,
    pub count: usize,
    /// Quantity of this operation, in microliters.
    pub quantity: f64,
}

/// The activity a specialization is asked to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub node: NodeId,
    /// Scoped path, unique within the run.
    pub path: String,
    pub primitive: String,
    /// Set for pipetting activities, once per planned operation.
    pub operation: Option<Operation>,
}

impl Activity {
    /// Quantity to perform now, falling back to `requested` when the activity is not split.
    pub fn quantity_or(&self, requested: f64) -> f64 {
        self.operation
            .map(|operation| operation.quantity)
            .unwrap_or(requested)
    }
}

/// Identity of a run, handed to the lifecycle hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub execution_id: String,
    pub protocol: String,
    pub agent: String,
}

/// A backend that gives primitives their meaning.
///
/// Specializations are opaque and may keep state across activities. The engine calls
/// `on_begin` once before the first activity, `execute` once per supported activity
/// (once per operation for decomposed ones) and `on_end` once after the run.
///
/// A backend with a narrower quantity range than the instrument reports it through
/// `envelope`, which is asked before any backend executes the activity.
#[async_trait]
pub trait Specialization: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, primitive: &str) -> bool;

    async fn execute(
        &self,
        activity: &Activity,
        inputs: &ResolvedInputs,
        grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError>;

    /// Quantity range of one operation, when narrower than the reserved instrument's.
    fn envelope(&self, _activity: &Activity, _grant: &ResourceGrant) -> Option<Envelope> {
        None
    }

    async fn on_begin(&self, _run: &RunContext) -> Result<(), SpecializationError> {
        Ok(())
    }

    async fn on_end(&self, _run: &RunContext, _status: RunStatus) {}

    /// Rendered output collected over the run, stored in the record footer.
    async fn artifact(&self) -> Option<String> {
        None
    }
}
