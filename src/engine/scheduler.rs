// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Token-driven protocol executor.
//!
//! A single coordinator owns the run state, the record and the clock. Ready nodes sit in
//! a [`PriorityWorkQueue`] ordered by (topological rank, node id). Control nodes and
//! sub-protocol expansion are handled inline by the coordinator; primitive steps are
//! dispatched as tokio tasks in a `JoinSet`, at most `max_concurrency` at a time.
//!
//! # Execution Flow
//!
//! 1. **Validation**: the graph is checked as a whole; problems abort before anything runs
//! 2. **Setup**: root parameters, per-run resource tracker, `on_begin` hooks
//! 3. **Token loop**: pop ready nodes, dispatch, collect finished tasks, release successors
//! 4. **Finalization**: `on_end` hooks, artifacts, resource snapshot, protocol outputs
//!
//! # Failure policy
//!
//! Without failsafe the first failure cancels every in-flight dispatch through a
//! `CancellationToken` and the run returns a [`RunFailure`] carrying the partial record.
//! Cancelled dispatches commit nothing and are listed as warnings.
//! With failsafe the failed node blocks its descendants only; joins that can no longer
//! fire are reported as warnings and the record ends `Failed`.
//!
//! In ordinal time the effective concurrency is 1, so the record is a deterministic
//! linearization of the graph.

use crate::config::SpecializationSet;
use crate::engine::clock::Clock;
use crate::engine::dispatch::{dispatch, DispatchJob, Dispatched};
use crate::engine::priority_work_queue::{PrioritizedTask, PriorityWorkQueue};
use crate::engine::run_state::{NodeState, RunState};
use crate::errors::{ExecutionError, FailurePolicy, RunFailure};
use crate::graph::{validate_graph, ActivityGraph, ActivityKind, NodeId, NodeKind, Outputs, ResolvedInputs, Value};
use crate::observability::messages::engine::{
    ActivityCompleted, ActivityDispatched, ActivityFailed, DispatchCancelled, JoinBlocked,
    RunAborted, RunFinished, RunStarted, SubprotocolSpliced,
};
use crate::observability::messages::validation::{
    ValidationCompleted, ValidationProblem, ValidationStarted,
};
use crate::observability::messages::StructuredLog;
use crate::primitives::PrimitiveRegistry;
use crate::record::{
    ExecutionRecord, Failure, Outcome, RecordBuilder, RecordEntry, RunHeader, RunStatus,
    RunWarning, TimeMode, Timestamp,
};
use crate::resources::{InstrumentSelection, ResourceSnapshot, ResourceTracker};
use crate::traits::RunContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Identity and inputs of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionRequest {
    pub id: String,
    pub agent: String,
    pub parameter_values: BTreeMap<String, Value>,
}

impl ExecutionRequest {
    pub fn new(id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent: agent.into(),
            parameter_values: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameter_values.insert(name.into(), value);
        self
    }
}

/// Runs protocols against a fixed registry and set of specializations.
///
/// The executor itself is stateless between runs; every call to [`execute`](Self::execute)
/// builds its own resource tracker from the graph's descriptors.
pub struct ProtocolExecutor {
    registry: Arc<PrimitiveRegistry>,
    specializations: Arc<SpecializationSet>,
    time_mode: TimeMode,
    policy: FailurePolicy,
    max_concurrency: usize,
    instrument_selection: InstrumentSelection,
}

impl ProtocolExecutor {
    pub fn new(registry: Arc<PrimitiveRegistry>, specializations: SpecializationSet) -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(crate::config::consts::FALLBACK_MAX_CONCURRENCY);
        Self {
            registry,
            specializations: Arc::new(specializations),
            time_mode: TimeMode::default(),
            policy: FailurePolicy::default(),
            max_concurrency: concurrency,
            instrument_selection: InstrumentSelection::default(),
        }
    }

    pub fn with_time_mode(mut self, time_mode: TimeMode) -> Self {
        self.time_mode = time_mode;
        self
    }

    pub fn with_failsafe(mut self, failsafe: bool) -> Self {
        self.policy = FailurePolicy::from_failsafe(failsafe);
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1); // Ensure at least 1
        self
    }

    pub fn with_instrument_selection(mut self, selection: InstrumentSelection) -> Self {
        self.instrument_selection = selection;
        self
    }

    pub fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn registry(&self) -> &PrimitiveRegistry {
        &self.registry
    }

    pub fn specializations(&self) -> &SpecializationSet {
        &self.specializations
    }

    /// Concurrency actually used: 1 in ordinal time.
    pub fn effective_concurrency(&self) -> usize {
        if self.time_mode.is_ordinal() {
            1
        } else {
            self.max_concurrency
        }
    }

    /// Drives `graph` to completion.
    ///
    /// Returns the finalized record when `Final` was reached, or when a failsafe run
    /// ended with failed branches (status `Failed`). Aborted runs return a
    /// [`RunFailure`] with the first error and the partial record.
    pub async fn execute(
        &self,
        graph: Arc<ActivityGraph>,
        request: ExecutionRequest,
    ) -> Result<ExecutionRecord, RunFailure> {
        let start_time = Instant::now();
        let header = RunHeader {
            execution_id: request.id.clone(),
            protocol: graph.name().to_string(),
            agent: request.agent.clone(),
            time_mode: self.time_mode,
        };
        let started = RunStarted {
            execution_id: &request.id,
            protocol: graph.name(),
            agent: &request.agent,
            time_mode: self.time_mode.as_str(),
            node_count: graph.len(),
            max_concurrency: self.effective_concurrency(),
        };
        started.log();
        let span = started.span("execute");

        async move {
            // === PHASE 1: VALIDATION ===
            if let Err(error) = self.validate(&graph) {
                return Err(self.aborted_before_start(header, error, start_time));
            }

            // === PHASE 2: SETUP ===
            let mut run = match self.prepare(&graph, &request, header.clone()).await {
                Ok(run) => run,
                Err(error) => return Err(self.aborted_before_start(header, error, start_time)),
            };

            // === PHASE 3: TOKEN LOOP ===
            let outcome = run.drive().await;

            // === PHASE 4: FINALIZATION ===
            let (status, error) = match outcome {
                Ok(()) if run.reached_final() => (RunStatus::Completed, None),
                Ok(()) if run.record.failure_count() > 0 => (RunStatus::Failed, None),
                Ok(()) => {
                    let error = ExecutionError::Internal {
                        message: "no ready activity is left before reaching final".to_string(),
                    };
                    run.record.fail(Failure::from(&error));
                    (RunStatus::Aborted, Some(error))
                }
                Err(error) => (RunStatus::Aborted, Some(error)),
            };
            if let Some(error) = &error {
                let cancelled = run.cancel().await;
                RunAborted {
                    execution_id: &request.id,
                    error,
                    cancelled,
                }
                .log();
            }

            let record = run.finish(status).await;
            RunFinished {
                execution_id: &request.id,
                status: status.as_str(),
                entries: record.entries().len(),
                failures: record.footer().failures.len(),
                duration: start_time.elapsed(),
            }
            .log();

            match error {
                Some(error) => Err(RunFailure { error, record }),
                None => Ok(record),
            }
        }
        .instrument(span)
        .await
    }

    fn validate(&self, graph: &ActivityGraph) -> Result<(), ExecutionError> {
        ValidationStarted {
            protocol: graph.name(),
            node_count: graph.len(),
        }
        .log();
        if let Err(malformed) = validate_graph(graph, &self.registry) {
            for problem in &malformed.errors {
                ValidationProblem {
                    protocol: graph.name(),
                    problem,
                }
                .log();
            }
            return Err(ExecutionError::MalformedGraph(malformed));
        }
        ValidationCompleted {
            protocol: graph.name(),
            node_count: graph.len(),
        }
        .log();
        Ok(())
    }

    async fn prepare(
        &self,
        graph: &ActivityGraph,
        request: &ExecutionRequest,
        header: RunHeader,
    ) -> Result<Run, ExecutionError> {
        let mut parameters: BTreeMap<String, Value> = graph
            .parameters()
            .iter()
            .filter_map(|(name, default)| default.clone().map(|value| (name.clone(), value)))
            .collect();
        for (name, value) in &request.parameter_values {
            if !graph.parameters().contains_key(name) {
                return Err(ExecutionError::UnresolvedInput {
                    activity: graph.name().to_string(),
                    input: name.clone(),
                    reason: "not a declared protocol parameter".to_string(),
                });
            }
            parameters.insert(name.clone(), value.clone());
        }

        let tracker = ResourceTracker::new(graph.resources())
            .map_err(|error| ExecutionError::Internal {
                message: format!("resource descriptors: {}", error),
            })?
            .with_selection(self.instrument_selection);
        let state = RunState::new(graph, parameters)?;
        let root_final = graph.final_node().ok_or_else(|| ExecutionError::Internal {
            message: "protocol has no final node".to_string(),
        })?;
        let entry = graph.initial().ok_or_else(|| ExecutionError::Internal {
            message: "protocol has no initial node".to_string(),
        })?;

        let context = RunContext {
            execution_id: request.id.clone(),
            protocol: graph.name().to_string(),
            agent: request.agent.clone(),
        };
        for bound in self.specializations.iter() {
            bound
                .specialization()
                .on_begin(&context)
                .await
                .map_err(|error| ExecutionError::SpecializationFailure {
                    activity: graph.name().to_string(),
                    specialization: bound.name().to_string(),
                    message: error.to_string(),
                })?;
        }

        let mut run = Run {
            registry: Arc::clone(&self.registry),
            specializations: Arc::clone(&self.specializations),
            tracker: Arc::new(tracker),
            policy: self.policy,
            limit: self.effective_concurrency(),
            context,
            state,
            record: RecordBuilder::new(header),
            clock: Clock::new(self.time_mode),
            queue: PriorityWorkQueue::new(),
            tasks: JoinSet::new(),
            in_flight: BTreeMap::new(),
            calls: BTreeMap::new(),
            token: CancellationToken::new(),
            root_final,
        };
        if run.state.start(entry) {
            run.enqueue(vec![entry]);
        }
        Ok(run)
    }

    /// Record of a run that stopped before any activity ran.
    fn aborted_before_start(
        &self,
        header: RunHeader,
        error: ExecutionError,
        start_time: Instant,
    ) -> RunFailure {
        RunAborted {
            execution_id: &header.execution_id,
            error: &error,
            cancelled: 0,
        }
        .log();
        let execution_id = header.execution_id.clone();
        let mut record = RecordBuilder::new(header);
        record.fail(Failure::from(&error));
        let record = record.finish(
            RunStatus::Aborted,
            Outputs::new(),
            ResourceSnapshot::new(),
            BTreeMap::new(),
        );
        RunFinished {
            execution_id: &execution_id,
            status: RunStatus::Aborted.as_str(),
            entries: 0,
            failures: 1,
            duration: start_time.elapsed(),
        }
        .log();
        RunFailure { error, record }
    }
}

/// A primitive dispatch that has not reported back yet.
struct InFlight {
    started: Timestamp,
    primitive: String,
    inputs: ResolvedInputs,
}

type TaskResult = (NodeId, Option<Result<Dispatched, ExecutionError>>);

/// Coordinator state of one run.
struct Run {
    registry: Arc<PrimitiveRegistry>,
    specializations: Arc<SpecializationSet>,
    tracker: Arc<ResourceTracker>,
    policy: FailurePolicy,
    limit: usize,
    context: RunContext,
    state: RunState,
    record: RecordBuilder,
    clock: Clock,
    queue: PriorityWorkQueue,
    tasks: JoinSet<TaskResult>,
    in_flight: BTreeMap<NodeId, InFlight>,
    /// Start stamps of sub-protocol calls whose copy is running.
    calls: BTreeMap<NodeId, Timestamp>,
    token: CancellationToken,
    root_final: NodeId,
}

impl Run {
    fn reached_final(&self) -> bool {
        self.state.state(self.root_final) == Some(NodeState::Completed)
    }

    fn enqueue(&mut self, nodes: Vec<NodeId>) {
        for node in nodes {
            let rank = self.state.rank(node);
            self.queue.push(PrioritizedTask::new(node, rank));
        }
    }

    /// Runs until nothing is ready or in flight. An error means the run must abort.
    async fn drive(&mut self) -> Result<(), ExecutionError> {
        loop {
            while self.tasks.len() < self.limit {
                let Some(task) = self.queue.pop() else {
                    break;
                };
                // blocked nodes may still sit in the queue
                if self.state.state(task.node) != Some(NodeState::Ready) {
                    continue;
                }
                self.start(task.node)?;
            }

            if self.tasks.is_empty() {
                if self.queue.is_empty() {
                    return Ok(());
                }
                continue;
            }

            match self.tasks.join_next().await {
                Some(Ok((node, Some(result)))) => self.finish_dispatch(node, result)?,
                Some(Ok((node, None))) => {
                    return Err(ExecutionError::Internal {
                        message: format!("dispatch of '{}' was cancelled", self.state.name(node)),
                    })
                }
                Some(Err(join_error)) => {
                    return Err(ExecutionError::Internal {
                        message: format!("dispatch task failed: {}", join_error),
                    })
                }
                None => {}
            }
        }
    }

    fn start(&mut self, node: NodeId) -> Result<(), ExecutionError> {
        let Some(kind) = self.state.kind(node).cloned() else {
            return Err(ExecutionError::Internal {
                message: format!("node {} is not in the run arena", node.0),
            });
        };
        match kind {
            NodeKind::Initial | NodeKind::Fork | NodeKind::Join => {
                let ready = self.complete_control(node, kind.activity_kind(), Outputs::new());
                self.enqueue(ready);
                Ok(())
            }
            NodeKind::Final => {
                let ended = self.clock.tick();
                let outputs = if node == self.root_final {
                    self.state.protocol_outputs()
                } else {
                    Outputs::new()
                };
                self.record_control(node, ActivityKind::Final, ended, ended, outputs);
                let mut ready = self.state.complete(node, Outputs::new());
                if let Some(call) = self.state.call_returning_from(node) {
                    ready.extend(self.return_from_call(call, node));
                }
                self.enqueue(ready);
                Ok(())
            }
            NodeKind::Subprotocol(call) => {
                let started = self.clock.tick();
                self.state.mark_dispatched(node);
                match self.state.expand_call(node) {
                    Ok((splice, ready)) => {
                        SubprotocolSpliced {
                            call: self.state.name(node),
                            protocol: call.protocol.name(),
                            offset: splice.offset,
                            nodes: splice.len,
                        }
                        .log();
                        self.calls.insert(node, started);
                        self.enqueue(ready);
                        Ok(())
                    }
                    Err(error) => {
                        let entry = self.entry(node, None, started, ResolvedInputs::new());
                        self.fail(node, entry, error)
                    }
                }
            }
            NodeKind::Primitive(step) => {
                let started = self.clock.tick();
                let Some(signature) = self.registry.get(&step.primitive).cloned() else {
                    let error = ExecutionError::Internal {
                        message: format!("primitive '{}' is not registered", step.primitive),
                    };
                    let entry = self.entry(node, Some(step.primitive), started, ResolvedInputs::new());
                    return self.fail(node, entry, error);
                };
                let inputs = match self.state.resolve_inputs(node, &signature) {
                    Ok(inputs) => inputs,
                    Err(error) => {
                        let entry = self.entry(node, Some(step.primitive), started, ResolvedInputs::new());
                        return self.fail(node, entry, error);
                    }
                };

                self.state.mark_dispatched(node);
                let path = self.state.name(node).to_string();
                let dispatched = ActivityDispatched {
                    activity: &path,
                    primitive: &step.primitive,
                    rank: self.state.rank(node),
                };
                dispatched.log();
                let span = dispatched.span("dispatch");

                self.in_flight.insert(
                    node,
                    InFlight {
                        started,
                        primitive: step.primitive.clone(),
                        inputs: inputs.clone(),
                    },
                );
                let job = DispatchJob {
                    node,
                    path,
                    signature,
                    inputs,
                };
                let tracker = Arc::clone(&self.tracker);
                let specializations = Arc::clone(&self.specializations);
                let token = self.token.clone();
                self.tasks.spawn(
                    async move {
                        tokio::select! {
                            biased;
                            _ = token.cancelled() => (job.node, None),
                            result = dispatch(&job, &tracker, &specializations) => (job.node, Some(result)),
                        }
                    }
                    .instrument(span),
                );
                Ok(())
            }
        }
    }

    fn finish_dispatch(
        &mut self,
        node: NodeId,
        result: Result<Dispatched, ExecutionError>,
    ) -> Result<(), ExecutionError> {
        let entry = self.close_dispatch(node);
        match result {
            Ok(dispatched) => {
                self.complete_dispatch(node, entry, dispatched);
                Ok(())
            }
            Err(error) => self.fail(node, entry, error),
        }
    }

    /// Entry of a dispatch that reported back, stamped with its end time.
    fn close_dispatch(&mut self, node: NodeId) -> RecordEntry {
        let flight = self.in_flight.remove(&node);
        let ended = self.clock.tick();
        let (started, primitive, inputs) = match flight {
            Some(flight) => (flight.started, Some(flight.primitive), flight.inputs),
            None => (ended, None, ResolvedInputs::new()),
        };
        let mut entry = self.entry(node, primitive, started, inputs);
        entry.ended = ended;
        entry
    }

    fn complete_dispatch(&mut self, node: NodeId, mut entry: RecordEntry, dispatched: Dispatched) {
        ActivityCompleted {
            activity: &entry.activity,
            kind: "primitive",
            outputs: dispatched.outputs.len(),
        }
        .log();
        entry.outputs = dispatched.outputs.clone();
        entry.operations = dispatched.operations;
        entry.grant = Some(dispatched.grant);
        entry.instrument = dispatched.instrument;
        self.record.push(entry);
        let ready = self.state.complete(node, dispatched.outputs);
        self.enqueue(ready);
    }

    /// Completes a call once its copy reached `Final` and returns the nodes it released.
    fn return_from_call(&mut self, call: NodeId, final_node: NodeId) -> Vec<NodeId> {
        let outputs = self.state.call_outputs(final_node);
        let ended = self.clock.tick();
        let started = self.calls.remove(&call).unwrap_or(ended);
        ActivityCompleted {
            activity: self.state.name(call),
            kind: "subprotocol",
            outputs: outputs.len(),
        }
        .log();
        self.record_control(call, ActivityKind::Subprotocol, started, ended, outputs.clone());
        self.state.complete(call, outputs)
    }

    fn complete_control(&mut self, node: NodeId, kind: ActivityKind, outputs: Outputs) -> Vec<NodeId> {
        let stamp = self.clock.tick();
        self.record_control(node, kind, stamp, stamp, outputs.clone());
        self.state.complete(node, outputs)
    }

    fn record_control(
        &mut self,
        node: NodeId,
        kind: ActivityKind,
        started: Timestamp,
        ended: Timestamp,
        outputs: Outputs,
    ) {
        let mut entry = RecordEntry::control(node, self.state.name(node), kind, started, ended);
        entry.outputs = outputs;
        self.record.push(entry);
    }

    fn entry(
        &self,
        node: NodeId,
        primitive: Option<String>,
        started: Timestamp,
        inputs: ResolvedInputs,
    ) -> RecordEntry {
        let kind = self
            .state
            .kind(node)
            .map(NodeKind::activity_kind)
            .unwrap_or(ActivityKind::Primitive);
        let mut entry = RecordEntry::control(node, self.state.name(node), kind, started, started);
        entry.primitive = primitive;
        entry.inputs = inputs;
        entry
    }

    /// Records a failed activity and applies the failure policy.
    fn fail(&mut self, node: NodeId, mut entry: RecordEntry, error: ExecutionError) -> Result<(), ExecutionError> {
        ActivityFailed {
            activity: &entry.activity,
            error: &error,
        }
        .log();
        entry.outcome = Outcome::from(&error);
        self.record.push(entry);
        self.record.fail(Failure::from(&error));
        self.state.mark_failed(node);

        match self.policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::ContinueBranches => {
                for join in self.state.block_from(node) {
                    let name = self.state.name(join).to_string();
                    JoinBlocked {
                        execution_id: &self.context.execution_id,
                        join: &name,
                    }
                    .log();
                    self.record.warn(RunWarning::JoinBlocked { join: name });
                }
                Ok(())
            }
        }
    }

    /// Cancels in-flight dispatches and records the ones that finished anyway.
    ///
    /// Returns how many were cancelled.
    async fn cancel(&mut self) -> usize {
        self.token.cancel();
        let mut cancelled = 0;
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((node, Some(Ok(dispatched)))) => {
                    // committed before the token fired
                    let entry = self.close_dispatch(node);
                    self.complete_dispatch(node, entry, dispatched);
                }
                Ok((node, Some(Err(error)))) => {
                    let mut entry = self.close_dispatch(node);
                    entry.outcome = Outcome::from(&error);
                    self.record.push(entry);
                    self.record.fail(Failure::from(&error));
                }
                Ok((node, None)) => {
                    self.in_flight.remove(&node);
                    let activity = self.state.name(node).to_string();
                    DispatchCancelled {
                        execution_id: &self.context.execution_id,
                        activity: &activity,
                    }
                    .log();
                    self.record.warn(RunWarning::DispatchCancelled { activity });
                    cancelled += 1;
                }
                Err(_) => cancelled += 1,
            }
        }
        self.queue.clear();
        cancelled
    }

    async fn finish(self, status: RunStatus) -> ExecutionRecord {
        let mut artifacts = BTreeMap::new();
        for bound in self.specializations.iter() {
            let specialization = bound.specialization();
            specialization.on_end(&self.context, status).await;
            if let Some(artifact) = specialization.artifact().await {
                artifacts.insert(bound.name().to_string(), artifact);
            }
        }
        let resources = self.tracker.snapshot().await;
        let outputs = self.state.protocol_outputs();
        self.record.finish(status, outputs, resources, artifacts)
    }
}
