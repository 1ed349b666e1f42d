// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::{
    DataEdge, InputBinding, Node, NodeId, NodeKind, PinRef, PrimitiveStep, SubprotocolCall, Value,
};
use crate::primitives::{PrimitiveRegistry, PrimitiveSignature};
use crate::resources::ResourceDescriptors;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Arena-backed activity graph.
///
/// Nodes live in a vector and are addressed by [`NodeId`]. Control edges are stored
/// as id pairs plus per-node incoming/outgoing index tables. Parallel edges are kept,
/// so a Fork whose two branches collapse to nothing still has two outgoing edges.
/// Data edges are derived from `Pin` bindings when a node is added.
///
/// The graph itself does not enforce structural invariants; use
/// [`validate_graph`](crate::graph::validate_graph) before executing it.
#[derive(Debug, Clone)]
pub struct ActivityGraph {
    name: String,
    nodes: Vec<Node>,
    control_edges: Vec<(NodeId, NodeId)>,
    outgoing: Vec<Vec<NodeId>>,
    incoming: Vec<Vec<NodeId>>,
    data_edges: Vec<DataEdge>,
    data_in: Vec<Vec<usize>>,
    parameters: BTreeMap<String, Option<Value>>,
    outputs: BTreeMap<String, PinRef>,
    resources: ResourceDescriptors,
}

/// Placement of a template copy inside a larger arena.
#[derive(Debug, Clone)]
pub struct Splice {
    pub offset: usize,
    pub len: usize,
    pub initial: Option<NodeId>,
    pub final_node: Option<NodeId>,
    /// Template outputs rewritten to the copied pins.
    pub outputs: BTreeMap<String, PinRef>,
}

impl Splice {
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 >= self.offset && id.0 < self.offset + self.len
    }
}

impl ActivityGraph {
    /// Creates a graph holding only its `Initial` and `Final` nodes.
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Self::empty(name);
        graph.add_node("initial", NodeKind::Initial);
        graph.add_node("final", NodeKind::Final);
        graph
    }

    /// Creates a graph without any node.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            control_edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            data_edges: Vec::new(),
            data_in: Vec::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
            resources: ResourceDescriptors::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn initial(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, NodeKind::Initial))
            .map(|node| node.id)
    }

    pub fn final_node(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| matches!(node.kind, NodeKind::Final))
            .map(|node| node.id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Display name of a node, or `"?"` for ids outside the arena.
    pub fn node_name(&self, id: NodeId) -> &str {
        self.node(id).map(|node| node.name.as_str()).unwrap_or("?")
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.name == name)
            .map(|node| node.id)
    }

    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut data_in = Vec::new();
        if let Some(bindings) = kind.bindings() {
            for (input, binding) in bindings {
                if let InputBinding::Pin(source) = binding {
                    data_in.push(self.data_edges.len());
                    self.data_edges.push(DataEdge {
                        source: source.clone(),
                        target: id,
                        input: input.clone(),
                    });
                }
            }
        }
        self.nodes.push(Node {
            id,
            name: name.into(),
            kind,
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.data_in.push(data_in);
        id
    }

    pub fn add_step(&mut self, name: impl Into<String>, step: PrimitiveStep) -> NodeId {
        self.add_node(name, NodeKind::Primitive(step))
    }

    pub fn add_fork(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Fork)
    }

    pub fn add_join(&mut self, name: impl Into<String>) -> NodeId {
        self.add_node(name, NodeKind::Join)
    }

    pub fn add_call(&mut self, name: impl Into<String>, call: SubprotocolCall) -> NodeId {
        self.add_node(name, NodeKind::Subprotocol(call))
    }

    /// Adds a control edge. Edges touching ids outside the arena are ignored.
    pub fn add_control_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.contains(from) || !self.contains(to) {
            return;
        }
        self.control_edges.push((from, to));
        self.outgoing[from.0].push(to);
        self.incoming[to.0].push(from);
    }

    /// Links the nodes in sequence with control edges.
    pub fn chain(&mut self, nodes: &[NodeId]) {
        for pair in nodes.windows(2) {
            self.add_control_edge(pair[0], pair[1]);
        }
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.outgoing.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.incoming.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn control_edges(&self) -> &[(NodeId, NodeId)] {
        &self.control_edges
    }

    pub fn data_edges(&self) -> &[DataEdge] {
        &self.data_edges
    }

    /// Data edges feeding the inputs of `id`.
    pub fn data_inputs(&self, id: NodeId) -> impl Iterator<Item = &DataEdge> + '_ {
        self.data_in
            .get(id.0)
            .into_iter()
            .flatten()
            .map(move |&edge| &self.data_edges[edge])
    }

    /// Data edges reading an output pin of `id`.
    pub fn data_outputs(&self, id: NodeId) -> impl Iterator<Item = &DataEdge> + '_ {
        self.data_edges
            .iter()
            .filter(move |edge| edge.source.node == id)
    }

    /// Declared signature of a primitive step.
    pub fn signature<'r>(
        &self,
        id: NodeId,
        registry: &'r PrimitiveRegistry,
    ) -> Option<&'r Arc<PrimitiveSignature>> {
        self.node(id)
            .and_then(|node| node.kind.primitive())
            .and_then(|primitive| registry.get(primitive))
    }

    pub fn declare_parameter(&mut self, name: impl Into<String>, default: Option<Value>) {
        self.parameters.insert(name.into(), default);
    }

    pub fn parameters(&self) -> &BTreeMap<String, Option<Value>> {
        &self.parameters
    }

    pub fn declare_output(&mut self, name: impl Into<String>, pin: PinRef) {
        self.outputs.insert(name.into(), pin);
    }

    pub fn outputs(&self) -> &BTreeMap<String, PinRef> {
        &self.outputs
    }

    pub fn resources(&self) -> &ResourceDescriptors {
        &self.resources
    }

    pub fn set_resources(&mut self, resources: ResourceDescriptors) {
        self.resources = resources;
    }

    /// Longest distance of every node from a source, over control and data edges.
    ///
    /// Returns `None` when the edges contain a cycle. Data edges from ids outside
    /// the arena are ignored.
    pub fn topological_ranks(&self) -> Option<Vec<usize>> {
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut in_degree = vec![0usize; self.nodes.len()];
        for (from, to) in &self.control_edges {
            successors[from.0].push(to.0);
            in_degree[to.0] += 1;
        }
        for edge in &self.data_edges {
            if self.contains(edge.source.node) {
                successors[edge.source.node.0].push(edge.target.0);
                in_degree[edge.target.0] += 1;
            }
        }

        let mut ranks = vec![0usize; self.nodes.len()];
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&index| in_degree[index] == 0)
            .collect();
        let mut visited = 0;
        while let Some(index) = queue.pop_front() {
            visited += 1;
            for &next in &successors[index] {
                ranks[next] = ranks[next].max(ranks[index] + 1);
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if visited == self.nodes.len() {
            Some(ranks)
        } else {
            None
        }
    }

    /// Appends a fresh copy of `template` to this arena.
    ///
    /// Copied nodes get new ids and names prefixed with `prefix/`. Pin bindings and
    /// control edges of the copy are shifted to the new ids; parameter bindings are
    /// left untouched so they can be resolved against the caller's scope.
    pub fn splice(&mut self, template: &ActivityGraph, prefix: &str) -> Splice {
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);

        for node in template.nodes() {
            let mut kind = node.kind.clone();
            if let Some(bindings) = kind.bindings_mut() {
                for binding in bindings.values_mut() {
                    if let InputBinding::Pin(pin) = binding {
                        pin.node = shift(pin.node);
                    }
                }
            }
            self.add_node(format!("{}/{}", prefix, node.name), kind);
        }
        for &(from, to) in template.control_edges() {
            self.add_control_edge(shift(from), shift(to));
        }

        Splice {
            offset,
            len: template.len(),
            initial: template.initial().map(shift),
            final_node: template.final_node().map(shift),
            outputs: template
                .outputs()
                .iter()
                .map(|(name, pin)| (name.clone(), PinRef::new(shift(pin.node), pin.pin.clone())))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Bindings;

    fn step(primitive: &str, bindings: Bindings, outputs: &[&str]) -> PrimitiveStep {
        PrimitiveStep::new(
            primitive,
            bindings,
            outputs.iter().map(|pin| pin.to_string()).collect(),
        )
    }

    #[test]
    fn test_new_graph_has_terminals() {
        let graph = ActivityGraph::new("empty");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.initial(), Some(NodeId(0)));
        assert_eq!(graph.final_node(), Some(NodeId(1)));
        assert_eq!(graph.node_name(NodeId(1)), "final");
        assert_eq!(graph.node_name(NodeId(9)), "?");
    }

    #[test]
    fn test_pin_bindings_create_data_edges() {
        let mut graph = ActivityGraph::new("edges");
        let container = graph.add_step(
            "container",
            step("EmptyContainer", Bindings::new(), &["samples"]),
        );
        let measure = graph.add_step(
            "measure",
            step(
                "MeasureAbsorbance",
                Bindings::new()
                    .pin("samples", container, "samples")
                    .literal("wavelength", Value::nanometers(600.0)),
                &["measurements"],
            ),
        );

        let inputs: Vec<_> = graph.data_inputs(measure).collect();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].source, PinRef::new(container, "samples"));
        assert_eq!(inputs[0].input, "samples");
        assert_eq!(graph.data_outputs(container).count(), 1);
    }

    #[test]
    fn test_control_edges_and_ranks() {
        let mut graph = ActivityGraph::new("ranks");
        let initial = NodeId(0);
        let last = NodeId(1);
        let fork = graph.add_fork("fork");
        let a = graph.add_step("a", step("X", Bindings::new(), &[]));
        let b = graph.add_step("b", step("X", Bindings::new(), &[]));
        let join = graph.add_join("join");
        graph.chain(&[initial, fork, a, join, last]);
        graph.add_control_edge(fork, b);
        graph.add_control_edge(b, join);
        graph.add_control_edge(b, NodeId(99));

        assert_eq!(graph.successors(fork), &[a, b]);
        assert_eq!(graph.predecessors(join), &[a, b]);
        assert_eq!(graph.control_edges().len(), 6);

        let ranks = graph.topological_ranks().expect("acyclic");
        assert_eq!(ranks[initial.0], 0);
        assert_eq!(ranks[a.0], 2);
        assert_eq!(ranks[join.0], 3);
        assert_eq!(ranks[last.0], 4);
    }

    #[test]
    fn test_cycle_has_no_ranks() {
        let mut graph = ActivityGraph::new("cycle");
        let a = graph.add_step("a", step("X", Bindings::new(), &[]));
        let b = graph.add_step("b", step("X", Bindings::new(), &[]));
        graph.chain(&[NodeId(0), a, b, a]);
        assert!(graph.topological_ranks().is_none());
    }

    #[test]
    fn test_splice_copies_with_fresh_ids() {
        let mut template = ActivityGraph::new("read");
        template.declare_parameter("samples", None);
        let measure = template.add_step(
            "measure",
            step(
                "MeasureAbsorbance",
                Bindings::new().parameter("samples", "samples"),
                &["measurements"],
            ),
        );
        let report = template.add_step(
            "report",
            step("Report", Bindings::new().pin("data", measure, "measurements"), &["out"]),
        );
        template.chain(&[NodeId(0), measure, report, NodeId(1)]);
        template.declare_output("result", PinRef::new(report, "out"));

        let mut arena = ActivityGraph::new("main");
        let first = arena.splice(&template, "call_a");
        let second = arena.splice(&template, "call_b");

        assert_eq!(first.offset, 2);
        assert_eq!(second.offset, 6);
        assert_eq!(arena.len(), 10);
        assert!(first.contains(NodeId(5)) && !first.contains(NodeId(6)));
        assert_eq!(arena.node_name(NodeId(6)), "call_b/initial");
        assert_eq!(second.outputs["result"], PinRef::new(NodeId(9), "out"));

        let copied: Vec<_> = arena.data_inputs(NodeId(9)).collect();
        assert_eq!(copied[0].source, PinRef::new(NodeId(8), "measurements"));
        assert_eq!(arena.successors(NodeId(6)), &[NodeId(8)]);
        // the template itself is untouched
        assert_eq!(template.len(), 4);
    }
}
