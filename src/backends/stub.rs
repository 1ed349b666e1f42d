// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::SpecializationError;
use crate::graph::{Outputs, ResolvedInputs, Value};
use crate::resources::{Envelope, ResourceGrant};
use crate::traits::{Activity, Operation, Specialization};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub path: String,
    pub primitive: String,
    pub operation: Option<Operation>,
    pub grant: u64,
}

/// Accepts every primitive (or the listed ones), records the call and returns fixed outputs.
pub struct RecordingSpecialization {
    name: String,
    primitives: Vec<String>,
    outputs: Outputs,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingSpecialization {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            primitives: Vec::new(),
            outputs: Outputs::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn only(mut self, primitives: &[&str]) -> Self {
        self.primitives = primitives.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_output(mut self, pin: &str, value: Value) -> Self {
        self.outputs.insert(pin.to_string(), value);
        self
    }

    /// Shares the call log with another recorder.
    pub fn sharing(mut self, calls: Arc<Mutex<Vec<Call>>>) -> Self {
        self.calls = calls;
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Specialization for RecordingSpecialization {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, primitive: &str) -> bool {
        self.primitives.is_empty() || self.primitives.iter().any(|p| p == primitive)
    }

    async fn execute(
        &self,
        activity: &Activity,
        _inputs: &ResolvedInputs,
        grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        self.calls.lock().unwrap().push(Call {
            path: activity.path.clone(),
            primitive: activity.primitive.clone(),
            operation: activity.operation,
            grant: grant.id(),
        });
        tokio::task::yield_now().await;
        Ok(self.outputs.clone())
    }
}

/// Fails every activity of one primitive, or only the one at a given path.
pub struct FailingSpecialization {
    primitive: String,
    activity: Option<String>,
}

impl FailingSpecialization {
    pub fn new(primitive: &str) -> Self {
        Self {
            primitive: primitive.to_string(),
            activity: None,
        }
    }

    /// Other activities of the primitive succeed without outputs.
    pub fn at(mut self, path: &str) -> Self {
        self.activity = Some(path.to_string());
        self
    }
}

#[async_trait]
impl Specialization for FailingSpecialization {
    fn name(&self) -> &str {
        "failing"
    }

    fn supports(&self, primitive: &str) -> bool {
        primitive == self.primitive
    }

    async fn execute(
        &self,
        activity: &Activity,
        _inputs: &ResolvedInputs,
        _grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        match &self.activity {
            Some(path) if path != &activity.path => Ok(Outputs::new()),
            _ => Err(SpecializationError::Failed(format!(
                "simulated failure of '{}'",
                activity.path
            ))),
        }
    }
}

/// Never finishes the activities of one primitive.
pub struct StallingSpecialization {
    primitive: String,
    started: Mutex<Vec<String>>,
}

impl StallingSpecialization {
    pub fn new(primitive: &str) -> Self {
        Self {
            primitive: primitive.to_string(),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Paths of the activities that reached `execute`.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Specialization for StallingSpecialization {
    fn name(&self) -> &str {
        "stalling"
    }

    fn supports(&self, primitive: &str) -> bool {
        primitive == self.primitive
    }

    async fn execute(
        &self,
        activity: &Activity,
        _inputs: &ResolvedInputs,
        _grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        self.started.lock().unwrap().push(activity.path.clone());
        std::future::pending().await
    }
}

/// A device whose quantity range is narrower than the instrument's.
pub struct EnvelopeLimitedSpecialization {
    envelope: Envelope,
    declared: bool,
    quantities: Mutex<Vec<f64>>,
}

impl EnvelopeLimitedSpecialization {
    /// Declares its range up front through `envelope`.
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            envelope: Envelope::new(min, max),
            declared: true,
            quantities: Mutex::new(Vec::new()),
        }
    }

    /// Only discovers its range when asked to move a quantity.
    pub fn undeclared(min: f64, max: f64) -> Self {
        Self {
            declared: false,
            ..Self::new(min, max)
        }
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.quantities.lock().unwrap().clone()
    }
}

#[async_trait]
impl Specialization for EnvelopeLimitedSpecialization {
    fn name(&self) -> &str {
        "envelope_limited"
    }

    fn supports(&self, primitive: &str) -> bool {
        primitive == crate::primitives::library::TRANSFER
    }

    fn envelope(&self, _activity: &Activity, _grant: &ResourceGrant) -> Option<Envelope> {
        self.declared.then_some(self.envelope)
    }

    async fn execute(
        &self,
        activity: &Activity,
        inputs: &ResolvedInputs,
        _grant: &ResourceGrant,
    ) -> Result<Outputs, SpecializationError> {
        let quantity = activity.quantity_or(inputs.microliters("amount")?);
        if quantity > self.envelope.max {
            return Err(SpecializationError::ExceedsEnvelope {
                requested: quantity,
                envelope: self.envelope,
            });
        }
        self.quantities.lock().unwrap().push(quantity);
        Ok(Outputs::new())
    }
}
