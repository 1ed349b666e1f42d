// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution of one primitive activity.
//!
//! ```text
//! footprint -> requirements -> reserve --ExceedsEnvelope--> plan -> reserve
//!                                 |                                   |
//!                                 +------> backend envelopes <--------+
//!                                      (narrower range: plan -> reserve)
//!                                                 |
//!                                              invoke
//!                                    (every supporting specialization,
//!                                     once per operation, in order)
//!                                                 |
//!                                   aggregate outputs -> commit
//! ```
//!
//! Backend envelopes are collected before any backend executes, so every backend sees the
//! same operations. A backend that only reports its limit from `execute` gets one replan,
//! and only while no other backend has performed the activity yet.
//!
//! A failure after the reservation releases the grant, so resource state only changes
//! when every specialization succeeded.

use crate::config::{BoundSpecialization, SpecializationSet};
use crate::engine::decomposition::plan;
use crate::errors::{DenialReason, ExecutionError, SpecializationError};
use crate::graph::{NodeId, Outputs, ResolvedInputs, Value};
use crate::observability::messages::engine::QuantityDecomposed;
use crate::observability::messages::specialization::{SpecializationFailed, SpecializationInvoked};
use crate::observability::messages::StructuredLog;
use crate::primitives::PrimitiveSignature;
use crate::resources::{
    with_operations, Envelope, Requirement, ResourceGrant, ResourceState, ResourceTracker,
};
use crate::traits::{Activity, Operation};
use std::sync::Arc;

/// Everything a dispatch task needs, owned so it can run on its own task.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub node: NodeId,
    pub path: String,
    pub signature: Arc<PrimitiveSignature>,
    pub inputs: ResolvedInputs,
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub outputs: Outputs,
    pub operations: Vec<f64>,
    pub grant: u64,
    pub instrument: Option<String>,
}

enum InvokeError {
    ExceedsEnvelope {
        specialization: String,
        requested: f64,
        envelope: Envelope,
        /// Another backend already executed part of the activity.
        performed: bool,
    },
    Failed { specialization: String, message: String },
}

pub async fn dispatch(
    job: &DispatchJob,
    tracker: &ResourceTracker,
    specializations: &SpecializationSet,
) -> Result<Dispatched, ExecutionError> {
    let primitive = job.signature.name.as_str();
    let bound = specializations.supporting(primitive);
    if bound.is_empty() {
        return Err(ExecutionError::SpecializationFailure {
            activity: job.path.clone(),
            specialization: "none".to_string(),
            message: format!("no bound specialization supports primitive '{}'", primitive),
        });
    }

    let requirements = job
        .signature
        .footprint
        .requirements(&job.inputs)
        .map_err(|e| ExecutionError::UnresolvedInput {
            activity: job.path.clone(),
            input: e.input().to_string(),
            reason: e.to_string(),
        })?;

    let mut grant = match tracker.reserve(&job.path, requirements.clone()).await {
        Ok(grant) => grant,
        Err(reason) => match reason.exceeded_envelope() {
            Some((requested, envelope)) => {
                let operations = decompose(job, requested, envelope)?;
                reserve(job, tracker, with_operations(&requirements, &operations)).await?
            }
            None => return Err(denied(job, reason)),
        },
    };
    grant = fit_backend_envelopes(job, tracker, &bound, &requirements, grant).await?;
    let mut operations = grant.operations().to_vec();

    let mut replanned = false;
    loop {
        match invoke(job, &bound, &grant, &operations).await {
            Ok(outputs) => {
                let instrument = grant.instrument().map(str::to_string);
                let grant_id = tracker.commit(grant);
                return Ok(Dispatched {
                    outputs,
                    operations,
                    grant: grant_id,
                    instrument,
                });
            }
            // a specialization may know a tighter limit than the tracker
            Err(InvokeError::ExceedsEnvelope {
                requested,
                envelope,
                performed: false,
                ..
            }) if !replanned => {
                replanned = true;
                let total = if operations.is_empty() {
                    requested
                } else {
                    operations.iter().sum()
                };
                let envelope = within_instrument(&grant, envelope);
                tracker.release(grant);
                operations = decompose(job, total, envelope)?;
                grant = reserve(job, tracker, with_operations(&requirements, &operations)).await?;
                operations = grant.operations().to_vec();
            }
            Err(InvokeError::ExceedsEnvelope {
                specialization,
                requested,
                envelope,
                performed,
            }) => {
                tracker.release(grant);
                let message = if performed {
                    format!(
                        "reported envelope [{}, {}] for {} after other backends performed the activity",
                        envelope.min, envelope.max, requested
                    )
                } else {
                    format!(
                        "{} still exceeds the reported envelope [{}, {}] after decomposition",
                        requested, envelope.min, envelope.max
                    )
                };
                return Err(ExecutionError::SpecializationFailure {
                    activity: job.path.clone(),
                    specialization,
                    message,
                });
            }
            Err(InvokeError::Failed {
                specialization,
                message,
            }) => {
                tracker.release(grant);
                return Err(ExecutionError::SpecializationFailure {
                    activity: job.path.clone(),
                    specialization,
                    message,
                });
            }
        }
    }
}

async fn reserve(
    job: &DispatchJob,
    tracker: &ResourceTracker,
    requirements: Vec<Requirement>,
) -> Result<ResourceGrant, ExecutionError> {
    tracker
        .reserve(&job.path, requirements)
        .await
        .map_err(|reason| denied(job, reason))
}

/// Replans before anything runs when a bound backend cannot perform the planned operations.
async fn fit_backend_envelopes(
    job: &DispatchJob,
    tracker: &ResourceTracker,
    bound: &[&BoundSpecialization],
    requirements: &[Requirement],
    grant: ResourceGrant,
) -> Result<ResourceGrant, ExecutionError> {
    if grant.operations().is_empty() {
        return Ok(grant);
    }
    let whole = activity(job, None);
    let narrowest = bound
        .iter()
        .filter_map(|binding| binding.specialization().envelope(&whole, &grant))
        .reduce(|narrowest, envelope| narrowest.intersect(&envelope));
    let Some(backends) = narrowest else {
        return Ok(grant);
    };
    if grant.operations().iter().all(|operation| backends.contains(*operation)) {
        return Ok(grant);
    }

    let total: f64 = grant.operations().iter().sum();
    let envelope = within_instrument(&grant, backends);
    tracker.release(grant);
    let operations = decompose(job, total, envelope)?;
    reserve(job, tracker, with_operations(requirements, &operations)).await
}

/// `envelope` narrowed to the range of the instrument the grant reserved.
fn within_instrument(grant: &ResourceGrant, envelope: Envelope) -> Envelope {
    let instrument = grant.instrument().and_then(|id| match grant.staged(id) {
        Some(ResourceState::Instrument(state)) => Some(state.envelope),
        _ => None,
    });
    match instrument {
        Some(instrument) => instrument.intersect(&envelope),
        None => envelope,
    }
}

fn denied(job: &DispatchJob, reason: DenialReason) -> ExecutionError {
    ExecutionError::ResourceDenied {
        activity: job.path.clone(),
        reason,
    }
}

fn decompose(job: &DispatchJob, quantity: f64, envelope: Envelope) -> Result<Vec<f64>, ExecutionError> {
    let operations = plan(quantity, envelope).map_err(|cause| ExecutionError::InfeasibleQuantity {
        activity: job.path.clone(),
        cause,
    })?;
    QuantityDecomposed {
        activity: &job.path,
        quantity,
        operations: &operations,
    }
    .log();
    Ok(operations)
}

async fn invoke(
    job: &DispatchJob,
    bound: &[&BoundSpecialization],
    grant: &ResourceGrant,
    operations: &[f64],
) -> Result<Outputs, InvokeError> {
    let activities: Vec<Activity> = if operations.is_empty() {
        vec![activity(job, None)]
    } else {
        operations
            .iter()
            .enumerate()
            .map(|(index, quantity)| {
                activity(
                    job,
                    Some(Operation {
                        index,
                        count: operations.len(),
                        quantity: *quantity,
                    }),
                )
            })
            .collect()
    };

    let mut produced = Vec::with_capacity(activities.len() * bound.len());
    for activity in &activities {
        for binding in bound {
            SpecializationInvoked {
                specialization: binding.name(),
                activity: &job.path,
                operation: activity.operation.map(|operation| operation.index),
            }
            .log();
            match binding
                .specialization()
                .execute(activity, &job.inputs, grant)
                .await
            {
                Ok(outputs) => produced.push((*binding, outputs)),
                Err(SpecializationError::ExceedsEnvelope {
                    requested,
                    envelope,
                }) => {
                    return Err(InvokeError::ExceedsEnvelope {
                        specialization: binding.name().to_string(),
                        requested,
                        envelope,
                        performed: !produced.is_empty(),
                    })
                }
                Err(error) => {
                    SpecializationFailed {
                        specialization: binding.name(),
                        activity: &job.path,
                        error: &error,
                    }
                    .log();
                    return Err(InvokeError::Failed {
                        specialization: binding.name().to_string(),
                        message: error.to_string(),
                    });
                }
            }
        }
    }
    Ok(aggregate(produced))
}

fn activity(job: &DispatchJob, operation: Option<Operation>) -> Activity {
    Activity {
        node: job.node,
        path: job.path.clone(),
        primitive: job.signature.name.clone(),
        operation,
    }
}

/// First non-empty value per pin; values from authoritative bindings replace the others.
pub fn aggregate(produced: Vec<(&BoundSpecialization, Outputs)>) -> Outputs {
    let mut authoritative = Outputs::new();
    let mut regular = Outputs::new();
    for (binding, outputs) in produced {
        for (pin, value) in outputs {
            let target = if binding.is_authoritative(&pin) {
                &mut authoritative
            } else {
                &mut regular
            };
            let slot = target.entry(pin).or_insert(Value::Null);
            if slot.is_empty() && !value.is_empty() {
                *slot = value;
            }
        }
    }
    for (pin, value) in authoritative {
        if !value.is_empty() || !regular.contains_key(&pin) {
            regular.insert(pin, value);
        }
    }
    regular
}
