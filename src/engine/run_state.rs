// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Token bookkeeping of one run.
//!
//! The run works on its own arena copy of the protocol graph. Sub-protocol calls are
//! expanded into that arena when they become ready, so every invocation of a template
//! gets fresh node ids and a parameter scope of its own. Readiness uses dependency
//! counting over control edges and in-arena data edges.

use crate::errors::ExecutionError;
use crate::graph::{
    ActivityGraph, InputBinding, NodeId, NodeKind, Outputs, PinRef, ResolvedInputs, Splice, Value,
};
use crate::primitives::PrimitiveSignature;
use std::collections::{BTreeMap, VecDeque};

/// Token state of a node.
///
/// `Blocked` marks nodes that can no longer run because something upstream failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Ready,
    Dispatched,
    Completed,
    Failed,
    Blocked,
}

/// Where a spliced copy hands control back to its caller.
#[derive(Debug, Clone)]
struct CallExit {
    call: NodeId,
    outputs: BTreeMap<String, PinRef>,
}

pub struct RunState {
    graph: ActivityGraph,
    states: Vec<NodeState>,
    ranks: Vec<usize>,
    waiting: Vec<usize>,
    node_scope: Vec<usize>,
    scopes: Vec<BTreeMap<String, Value>>,
    outputs: Vec<Outputs>,
    exits: BTreeMap<NodeId, CallExit>,
}

impl RunState {
    /// Prepares the run arena. `parameters` is the root scope.
    pub fn new(graph: &ActivityGraph, parameters: BTreeMap<String, Value>) -> Result<Self, ExecutionError> {
        let ranks = graph.topological_ranks().ok_or_else(|| ExecutionError::Internal {
            message: format!("protocol '{}' has a cycle", graph.name()),
        })?;
        let len = graph.len();
        let mut state = Self {
            graph: graph.clone(),
            states: vec![NodeState::Pending; len],
            ranks,
            waiting: vec![0; len],
            node_scope: vec![0; len],
            scopes: vec![parameters],
            outputs: vec![Outputs::new(); len],
            exits: BTreeMap::new(),
        };
        state.count_dependencies(0..len);
        Ok(state)
    }

    pub fn graph(&self) -> &ActivityGraph {
        &self.graph
    }

    pub fn state(&self, id: NodeId) -> Option<NodeState> {
        self.states.get(id.0).copied()
    }

    pub fn rank(&self, id: NodeId) -> usize {
        self.ranks.get(id.0).copied().unwrap_or(0)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.graph.node_name(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.graph.node(id).map(|node| &node.kind)
    }

    pub fn outputs(&self, id: NodeId) -> Option<&Outputs> {
        self.outputs.get(id.0)
    }

    /// Marks a node ready when nothing is left to wait for. Used for the entry node.
    pub fn start(&mut self, id: NodeId) -> bool {
        match self.states.get_mut(id.0) {
            Some(state) if *state == NodeState::Pending => {
                *state = NodeState::Ready;
                true
            }
            _ => false,
        }
    }

    pub fn mark_dispatched(&mut self, id: NodeId) {
        self.set(id, NodeState::Dispatched);
    }

    pub fn mark_failed(&mut self, id: NodeId) {
        self.set(id, NodeState::Failed);
    }

    /// Stores the outputs of a node and returns the nodes that became ready.
    pub fn complete(&mut self, id: NodeId, outputs: Outputs) -> Vec<NodeId> {
        self.set(id, NodeState::Completed);
        if let Some(slot) = self.outputs.get_mut(id.0) {
            *slot = outputs;
        }

        let mut released: Vec<NodeId> = self.graph.successors(id).to_vec();
        released.extend(self.graph.data_outputs(id).map(|edge| edge.target));

        let mut ready = Vec::new();
        for next in released {
            let Some(count) = self.waiting.get_mut(next.0) else {
                continue;
            };
            *count = count.saturating_sub(1);
            if *count == 0 && self.states[next.0] == NodeState::Pending {
                self.states[next.0] = NodeState::Ready;
                ready.push(next);
            }
        }
        ready
    }

    /// Call node whose spliced copy ends at `final_node`.
    pub fn call_returning_from(&self, final_node: NodeId) -> Option<NodeId> {
        self.exits.get(&final_node).map(|exit| exit.call)
    }

    /// Declared outputs of a finished call, read from the pins of its copy.
    pub fn call_outputs(&self, final_node: NodeId) -> Outputs {
        let Some(exit) = self.exits.get(&final_node) else {
            return Outputs::new();
        };
        exit.outputs
            .iter()
            .filter_map(|(name, pin)| self.pin_value(pin).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    /// Outputs of the protocol itself, read from the root declarations.
    pub fn protocol_outputs(&self) -> Outputs {
        self.graph
            .outputs()
            .iter()
            .filter_map(|(name, pin)| self.pin_value(pin).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    /// Resolves every declared input of a primitive step.
    ///
    /// Order per input: literal, producing pin, scope parameter, signature default.
    /// Optional inputs without a value are left out.
    pub fn resolve_inputs(
        &self,
        id: NodeId,
        signature: &PrimitiveSignature,
    ) -> Result<ResolvedInputs, ExecutionError> {
        let bindings = self
            .kind(id)
            .and_then(NodeKind::bindings)
            .cloned()
            .unwrap_or_default();
        let mut inputs = ResolvedInputs::new();
        for spec in &signature.inputs {
            let bound = match bindings.get(&spec.name) {
                Some(binding) => self.resolve_binding(id, binding),
                None => Err("no binding".to_string()),
            };
            match bound {
                Ok(value) => inputs.insert(spec.name.clone(), value),
                Err(reason) => match &spec.default {
                    Some(default) => inputs.insert(spec.name.clone(), default.clone()),
                    None if spec.optional => {}
                    None => {
                        return Err(ExecutionError::UnresolvedInput {
                            activity: self.name(id).to_string(),
                            input: spec.name.clone(),
                            reason,
                        })
                    }
                },
            }
        }
        Ok(inputs)
    }

    /// Copies the template of a call into the arena and readies the copy's `Initial`.
    ///
    /// The copy runs in a new scope made of the call's bindings and the template
    /// defaults. Returns the splice and the ready entry node.
    pub fn expand_call(&mut self, id: NodeId) -> Result<(Splice, Vec<NodeId>), ExecutionError> {
        let call = match self.kind(id) {
            Some(NodeKind::Subprotocol(call)) => call.clone(),
            _ => {
                return Err(ExecutionError::Internal {
                    message: format!("'{}' is not a sub-protocol call", self.name(id)),
                })
            }
        };
        let template = call.protocol.as_ref();

        let mut scope = BTreeMap::new();
        for (parameter, default) in template.parameters() {
            let value = match call.bindings.get(parameter) {
                Some(binding) => Some(self.resolve_binding(id, binding).map_err(|reason| {
                    ExecutionError::UnresolvedInput {
                        activity: self.name(id).to_string(),
                        input: parameter.clone(),
                        reason,
                    }
                })?),
                None => default.clone(),
            };
            if let Some(value) = value {
                scope.insert(parameter.clone(), value);
            }
        }

        let template_ranks = template.topological_ranks().ok_or_else(|| ExecutionError::Internal {
            message: format!("protocol '{}' has a cycle", template.name()),
        })?;
        let call_name = self.name(id).to_string();
        let call_rank = self.rank(id);
        let splice = self.graph.splice(template, &call_name);

        let scope_index = self.scopes.len();
        self.scopes.push(scope);
        self.states.extend(std::iter::repeat(NodeState::Pending).take(splice.len));
        self.waiting.extend(std::iter::repeat(0).take(splice.len));
        self.node_scope.extend(std::iter::repeat(scope_index).take(splice.len));
        self.outputs.extend(std::iter::repeat(Outputs::new()).take(splice.len));
        self.ranks
            .extend(template_ranks.iter().map(|rank| call_rank + rank));
        self.count_dependencies(splice.offset..splice.offset + splice.len);

        if let Some(final_node) = splice.final_node {
            self.exits.insert(
                final_node,
                CallExit {
                    call: id,
                    outputs: splice.outputs.clone(),
                },
            );
        }
        let ready = splice
            .initial
            .filter(|&entry| self.start(entry))
            .into_iter()
            .collect();
        Ok((splice, ready))
    }

    /// Blocks everything downstream of a failed node.
    ///
    /// Follows control and data edges; a blocked copy `Final` blocks its call node too.
    /// Returns the joins that were blocked, in the order they were reached.
    pub fn block_from(&mut self, failed: NodeId) -> Vec<NodeId> {
        let mut joins = Vec::new();
        let mut queue: VecDeque<NodeId> = VecDeque::from([failed]);
        while let Some(id) = queue.pop_front() {
            let mut next: Vec<NodeId> = self.graph.successors(id).to_vec();
            next.extend(self.graph.data_outputs(id).map(|edge| edge.target));
            if let Some(exit) = self.exits.get(&id) {
                next.push(exit.call);
            }
            for target in next {
                match self.states.get(target.0) {
                    Some(NodeState::Pending | NodeState::Ready | NodeState::Dispatched) => {}
                    _ => continue,
                }
                // a dispatched call is waiting on its copy and is blocked with it
                if self.states[target.0] == NodeState::Dispatched
                    && !matches!(self.kind(target), Some(NodeKind::Subprotocol(_)))
                {
                    continue;
                }
                self.states[target.0] = NodeState::Blocked;
                if matches!(self.kind(target), Some(NodeKind::Join)) {
                    joins.push(target);
                }
                queue.push_back(target);
            }
        }
        joins
    }

    fn set(&mut self, id: NodeId, state: NodeState) {
        if let Some(slot) = self.states.get_mut(id.0) {
            *slot = state;
        }
    }

    fn count_dependencies(&mut self, range: std::ops::Range<usize>) {
        for index in range {
            let id = NodeId(index);
            let data = self
                .graph
                .data_inputs(id)
                .filter(|edge| self.graph.contains(edge.source.node))
                .count();
            self.waiting[index] = self.graph.predecessors(id).len() + data;
        }
    }

    fn resolve_binding(&self, id: NodeId, binding: &InputBinding) -> Result<Value, String> {
        match binding {
            InputBinding::Literal(value) => Ok(value.clone()),
            InputBinding::Pin(pin) => self.pin_value(pin).cloned().ok_or_else(|| {
                format!(
                    "pin '{}' of '{}' produced no value",
                    pin.pin,
                    self.name(pin.node)
                )
            }),
            InputBinding::Parameter(parameter) => {
                let scope = self.node_scope.get(id.0).copied().unwrap_or(0);
                self.scopes
                    .get(scope)
                    .and_then(|values| values.get(parameter))
                    .cloned()
                    .ok_or_else(|| format!("parameter '{}' has no value", parameter))
            }
        }
    }

    fn pin_value(&self, pin: &PinRef) -> Option<&Value> {
        self.outputs.get(pin.node.0).and_then(|outputs| outputs.get(&pin.pin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Bindings, ProtocolBuilder};
    use crate::primitives::library::{EMPTY_CONTAINER, MEASURE_ABSORBANCE};
    use crate::primitives::PrimitiveRegistry;
    use std::sync::Arc;

    fn read_template(registry: &PrimitiveRegistry) -> Arc<ActivityGraph> {
        let mut builder = ProtocolBuilder::new("read", registry);
        builder.parameter("samples", None);
        builder.parameter("wavelength", Some(Value::nanometers(600.0)));
        let read = builder
            .named_step(
                "measure",
                MEASURE_ABSORBANCE,
                Bindings::new()
                    .parameter("samples", "samples")
                    .parameter("wavelength", "wavelength"),
            )
            .unwrap();
        builder.output("measurements", read, "measurements");
        Arc::new(builder.build())
    }

    #[test]
    fn test_fork_and_join_counting() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("par", &registry);
        let a = builder.detached_named_step("a", EMPTY_CONTAINER, Bindings::new()).unwrap();
        let b = builder.detached_named_step("b", EMPTY_CONTAINER, Bindings::new()).unwrap();
        let (fork, join) = builder.parallel(vec![vec![a], vec![b]]).unwrap();
        let graph = builder.build();

        let mut state = RunState::new(&graph, BTreeMap::new()).unwrap();
        assert!(state.start(NodeId(0)));
        assert_eq!(state.complete(NodeId(0), Outputs::new()), vec![fork]);
        assert_eq!(state.complete(fork, Outputs::new()), vec![a, b]);
        assert!(state.complete(a, Outputs::new()).is_empty());
        assert_eq!(state.state(join), Some(NodeState::Pending));
        assert_eq!(state.complete(b, Outputs::new()), vec![join]);
        assert_eq!(state.complete(join, Outputs::new()), vec![NodeId(1)]);
    }

    #[test]
    fn test_inputs_follow_pins_parameters_and_defaults() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("inputs", &registry);
        builder.parameter("container", None);
        let plate = builder
            .named_step(
                "plate",
                EMPTY_CONTAINER,
                Bindings::new().parameter("specification", "container"),
            )
            .unwrap();
        let read = builder
            .named_step(
                "read",
                MEASURE_ABSORBANCE,
                Bindings::new()
                    .pin("samples", plate, "samples")
                    .literal("wavelength", Value::nanometers(600.0)),
            )
            .unwrap();
        let graph = builder.build();
        let empty_container = registry.get(EMPTY_CONTAINER).unwrap();
        let absorbance = registry.get(MEASURE_ABSORBANCE).unwrap();

        let unbound = RunState::new(&graph, BTreeMap::new()).unwrap();
        assert!(matches!(
            unbound.resolve_inputs(plate, empty_container),
            Err(ExecutionError::UnresolvedInput { ref input, .. }) if input == "specification"
        ));

        let mut state = RunState::new(
            &graph,
            BTreeMap::from([("container".to_string(), Value::location("plate"))]),
        )
        .unwrap();
        let inputs = state.resolve_inputs(plate, empty_container).unwrap();
        assert_eq!(inputs.get("specification"), Some(&Value::location("plate")));
        assert_eq!(inputs.get("sample_array"), None);

        // the measurement waits on both its control predecessor and the data edge
        let mut outputs = Outputs::new();
        outputs.insert("samples".into(), Value::location("plate"));
        assert_eq!(state.complete(plate, outputs), vec![read]);
        let inputs = state.resolve_inputs(read, absorbance).unwrap();
        assert_eq!(inputs.get("samples"), Some(&Value::location("plate")));
    }

    #[test]
    fn test_expanded_calls_get_fresh_ids_and_scopes() {
        let registry = PrimitiveRegistry::standard();
        let template = read_template(&registry);
        let mut builder = ProtocolBuilder::new("outer", &registry);
        let first = builder.call(
            "first",
            template.clone(),
            Bindings::new().literal("samples", Value::location("a")),
        );
        let second = builder.call(
            "second",
            template.clone(),
            Bindings::new()
                .literal("samples", Value::location("b"))
                .literal("wavelength", Value::nanometers(450.0)),
        );
        let graph = builder.build();
        let absorbance = registry.get(MEASURE_ABSORBANCE).unwrap();

        let mut state = RunState::new(&graph, BTreeMap::new()).unwrap();
        let (one, ready_one) = state.expand_call(first).unwrap();
        let (two, ready_two) = state.expand_call(second).unwrap();
        assert_eq!(ready_one, vec![one.initial.unwrap()]);
        assert_eq!(ready_two, vec![two.initial.unwrap()]);
        assert!(one.offset + one.len <= two.offset);

        let first_read = state.graph().find("first/measure").unwrap();
        let second_read = state.graph().find("second/measure").unwrap();
        let inputs = state.resolve_inputs(first_read, absorbance).unwrap();
        assert_eq!(inputs.get("samples"), Some(&Value::location("a")));
        assert_eq!(inputs.get("wavelength"), Some(&Value::nanometers(600.0)));
        let inputs = state.resolve_inputs(second_read, absorbance).unwrap();
        assert_eq!(inputs.get("wavelength"), Some(&Value::nanometers(450.0)));

        let exit = one.final_node.unwrap();
        assert_eq!(state.call_returning_from(exit), Some(first));
        let mut outputs = Outputs::new();
        outputs.insert("measurements".into(), Value::List(vec![]));
        state.complete(first_read, outputs);
        assert_eq!(
            state.call_outputs(exit).get("measurements"),
            Some(&Value::List(vec![]))
        );
        assert!(state.rank(first_read) > state.rank(first));
    }

    #[test]
    fn test_failure_blocks_the_join_and_the_rest() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("par", &registry);
        let a = builder.detached_named_step("a", EMPTY_CONTAINER, Bindings::new()).unwrap();
        let a2 = builder.detached_named_step("a2", EMPTY_CONTAINER, Bindings::new()).unwrap();
        let b = builder.detached_named_step("b", EMPTY_CONTAINER, Bindings::new()).unwrap();
        let (_, join) = builder.parallel(vec![vec![a, a2], vec![b]]).unwrap();
        let graph = builder.build();

        let mut state = RunState::new(&graph, BTreeMap::new()).unwrap();
        state.mark_failed(a);
        assert_eq!(state.block_from(a), vec![join]);
        assert_eq!(state.state(a2), Some(NodeState::Blocked));
        assert_eq!(state.state(NodeId(1)), Some(NodeState::Blocked));
        assert_eq!(state.state(b), Some(NodeState::Pending));
    }
}
