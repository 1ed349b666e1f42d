// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sequential protocol assembly on top of [`ActivityGraph`].
//!
//! The builder keeps a cursor on the last sequenced node. `step` and `call` append
//! after the cursor; `detached_*` variants create nodes without control edges so they
//! can be arranged into branches with [`ProtocolBuilder::parallel`]. `build` closes the
//! sequence on the `Final` node.
//!
//! ```ignore
//! let registry = PrimitiveRegistry::standard();
//! let mut builder = ProtocolBuilder::new("toy", &registry);
//! let plate = builder.step("EmptyContainer", Bindings::new().literal("specification", Value::location("plate")))?;
//! let a = builder.detached_step("MeasureAbsorbance", Bindings::new().pin("samples", plate, "samples"))?;
//! let b = builder.detached_step("MeasureFluorescence", Bindings::new().pin("samples", plate, "samples"))?;
//! builder.parallel(vec![vec![a], vec![b]])?;
//! let graph = builder.build();
//! ```

use crate::errors::BuildError;
use crate::graph::{
    ActivityGraph, Bindings, NodeId, PinRef, PrimitiveStep, SubprotocolCall, Value,
};
use crate::primitives::PrimitiveRegistry;
use crate::resources::ResourceDescriptors;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct ProtocolBuilder<'r> {
    graph: ActivityGraph,
    registry: &'r PrimitiveRegistry,
    cursor: NodeId,
    final_node: NodeId,
    name_counts: BTreeMap<String, usize>,
}

impl<'r> ProtocolBuilder<'r> {
    pub fn new(name: impl Into<String>, registry: &'r PrimitiveRegistry) -> Self {
        let graph = ActivityGraph::new(name);
        let cursor = graph.initial().unwrap_or(NodeId(0));
        let final_node = graph.final_node().unwrap_or(NodeId(1));
        Self {
            graph,
            registry,
            cursor,
            final_node,
            name_counts: BTreeMap::new(),
        }
    }

    pub fn parameter(&mut self, name: impl Into<String>, default: Option<Value>) -> &mut Self {
        self.graph.declare_parameter(name, default);
        self
    }

    pub fn resources(&mut self, resources: ResourceDescriptors) -> &mut Self {
        self.graph.set_resources(resources);
        self
    }

    /// Appends a primitive step after the cursor.
    pub fn step(&mut self, primitive: &str, bindings: Bindings) -> Result<NodeId, BuildError> {
        let id = self.detached_step(primitive, bindings)?;
        self.append(id);
        Ok(id)
    }

    pub fn named_step(
        &mut self,
        name: &str,
        primitive: &str,
        bindings: Bindings,
    ) -> Result<NodeId, BuildError> {
        let id = self.detached_named_step(name, primitive, bindings)?;
        self.append(id);
        Ok(id)
    }

    /// Creates a primitive step without control edges.
    pub fn detached_step(
        &mut self,
        primitive: &str,
        bindings: Bindings,
    ) -> Result<NodeId, BuildError> {
        let name = self.generate_name(primitive);
        self.detached_named_step(&name, primitive, bindings)
    }

    pub fn detached_named_step(
        &mut self,
        name: &str,
        primitive: &str,
        bindings: Bindings,
    ) -> Result<NodeId, BuildError> {
        let signature = self
            .registry
            .get(primitive)
            .ok_or_else(|| BuildError::UnknownPrimitive(primitive.to_string()))?;
        let step = PrimitiveStep::new(primitive, bindings, signature.outputs.clone());
        Ok(self.graph.add_step(name, step))
    }

    /// Appends a call of another protocol after the cursor.
    pub fn call(&mut self, name: &str, protocol: Arc<ActivityGraph>, bindings: Bindings) -> NodeId {
        let id = self.detached_call(name, protocol, bindings);
        self.append(id);
        id
    }

    pub fn detached_call(
        &mut self,
        name: &str,
        protocol: Arc<ActivityGraph>,
        bindings: Bindings,
    ) -> NodeId {
        self.graph
            .add_call(name, SubprotocolCall::new(protocol, bindings))
    }

    /// Runs the given chains of detached nodes concurrently after the cursor.
    ///
    /// Returns the Fork and Join that bracket the branches; the Join becomes the cursor.
    pub fn parallel(&mut self, branches: Vec<Vec<NodeId>>) -> Result<(NodeId, NodeId), BuildError> {
        if branches.len() < 2 {
            return Err(BuildError::TooFewBranches(branches.len()));
        }
        if let Some(index) = branches.iter().position(Vec::is_empty) {
            return Err(BuildError::EmptyBranch(index));
        }

        let fork_name = self.generate_name("Fork");
        let join_name = self.generate_name("Join");
        let fork = self.graph.add_fork(fork_name);
        let join = self.graph.add_join(join_name);
        self.append(fork);

        for branch in &branches {
            let mut chain = Vec::with_capacity(branch.len() + 2);
            chain.push(fork);
            chain.extend_from_slice(branch);
            chain.push(join);
            self.graph.chain(&chain);
        }
        self.cursor = join;
        Ok((fork, join))
    }

    /// Exposes an output pin as a protocol output on the `Final` node.
    pub fn output(&mut self, name: &str, node: NodeId, pin: &str) -> &mut Self {
        self.graph.declare_output(name, PinRef::new(node, pin));
        self
    }

    pub fn graph(&self) -> &ActivityGraph {
        &self.graph
    }

    pub fn build(mut self) -> ActivityGraph {
        self.graph.add_control_edge(self.cursor, self.final_node);
        self.graph
    }

    fn append(&mut self, id: NodeId) {
        self.graph.add_control_edge(self.cursor, id);
        self.cursor = id;
    }

    fn generate_name(&mut self, primitive: &str) -> String {
        let base = snake_case(primitive);
        let count = self.name_counts.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base
        } else {
            format!("{}_{}", base, count)
        }
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    #[test]
    fn test_snake_case_names() {
        assert_eq!(snake_case("EmptyContainer"), "empty_container");
        assert_eq!(snake_case("Transfer"), "transfer");
        assert_eq!(snake_case("Fork"), "fork");
    }

    #[test]
    fn test_sequence_is_closed_on_final() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("seq", &registry);
        let first = builder
            .step(
                "EmptyContainer",
                Bindings::new().literal("specification", Value::location("plate")),
            )
            .unwrap();
        let second = builder
            .step(
                "EmptyContainer",
                Bindings::new().literal("specification", Value::location("tube")),
            )
            .unwrap();
        let graph = builder.build();

        assert_eq!(graph.node_name(first), "empty_container");
        assert_eq!(graph.node_name(second), "empty_container_2");
        assert_eq!(graph.successors(NodeId(0)), &[first]);
        assert_eq!(graph.successors(second), &[NodeId(1)]);
        match &graph.node(first).unwrap().kind {
            NodeKind::Primitive(step) => assert_eq!(step.outputs, vec!["samples".to_string()]),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_unknown_primitive_is_rejected() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("bad", &registry);
        assert_eq!(
            builder.step("Centrifuge", Bindings::new()),
            Err(BuildError::UnknownPrimitive("Centrifuge".into()))
        );
    }

    #[test]
    fn test_parallel_brackets_branches() {
        let registry = PrimitiveRegistry::standard();
        let mut builder = ProtocolBuilder::new("par", &registry);
        let a = builder
            .detached_named_step("a", "EmptyContainer", Bindings::new())
            .unwrap();
        let b = builder
            .detached_named_step("b", "EmptyContainer", Bindings::new())
            .unwrap();
        let c = builder
            .detached_named_step("c", "EmptyContainer", Bindings::new())
            .unwrap();

        assert_eq!(
            builder.parallel(vec![vec![a]]),
            Err(BuildError::TooFewBranches(1))
        );
        assert_eq!(
            builder.parallel(vec![vec![a], vec![]]),
            Err(BuildError::EmptyBranch(1))
        );

        let (fork, join) = builder.parallel(vec![vec![a, b], vec![c]]).unwrap();
        let graph = builder.build();
        assert_eq!(graph.successors(fork), &[a, c]);
        assert_eq!(graph.predecessors(join), &[b, c]);
        assert_eq!(graph.successors(join), &[NodeId(1)]);
    }
}
