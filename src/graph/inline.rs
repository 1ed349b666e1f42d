// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Flattening of sub-protocol calls.
//!
//! [`inline_subprotocols`] replaces every call node with a fresh copy of its template,
//! repeatedly, until no call remains. The result is a single graph that validates
//! whenever the input did.

use crate::graph::{ActivityGraph, InputBinding, Node, NodeId, NodeKind, PinRef};
use std::collections::BTreeMap;

/// Returns a copy of `graph` with all sub-protocol calls expanded in place.
///
/// For each call node:
/// - a copy of the template is appended with names prefixed by the call name
/// - parameter bindings in the copy are replaced by the call's bindings, or by a
///   literal of the template default
/// - pins reading the call's outputs are redirected to the producing pins of the copy
/// - edges into the call go to the copy's `Initial`, edges out of it leave the copy's
///   `Final`, and both terminals are then bypassed
///
/// Node ids of the result are dense; references to ids that do not exist in the input
/// point past the end of the result and are reported by validation.
pub fn inline_subprotocols(graph: &ActivityGraph) -> ActivityGraph {
    let mut workspace = Workspace::from_graph(graph);
    while let Some(call) = workspace.next_call() {
        workspace.expand(call);
    }
    workspace.compact(graph)
}

struct Workspace {
    nodes: Vec<Option<Node>>,
    edges: Vec<(NodeId, NodeId)>,
    outputs: BTreeMap<String, PinRef>,
}

impl Workspace {
    fn from_graph(graph: &ActivityGraph) -> Self {
        Self {
            nodes: graph.nodes().iter().cloned().map(Some).collect(),
            edges: graph.control_edges().to_vec(),
            outputs: graph.outputs().clone(),
        }
    }

    fn next_call(&self) -> Option<NodeId> {
        self.nodes.iter().flatten().find_map(|node| match node.kind {
            NodeKind::Subprotocol(_) => Some(node.id),
            _ => None,
        })
    }

    fn expand(&mut self, call_id: NodeId) {
        let Some(Node {
            name: call_name,
            kind: NodeKind::Subprotocol(call),
            ..
        }) = self.nodes[call_id.0].take()
        else {
            return;
        };
        let template = call.protocol.as_ref();
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);

        for template_node in template.nodes() {
            let mut kind = template_node.kind.clone();
            if let Some(bindings) = kind.bindings_mut() {
                for binding in bindings.values_mut() {
                    match binding {
                        InputBinding::Pin(pin) => pin.node = shift(pin.node),
                        InputBinding::Parameter(parameter) => {
                            if let Some(bound) = call.bindings.get(parameter.as_str()) {
                                *binding = bound.clone();
                            } else if let Some(Some(default)) =
                                template.parameters().get(parameter.as_str())
                            {
                                *binding = InputBinding::Literal(default.clone());
                            }
                        }
                        InputBinding::Literal(_) => {}
                    }
                }
            }
            self.nodes.push(Some(Node {
                id: shift(template_node.id),
                name: format!("{}/{}", call_name, template_node.name),
                kind,
            }));
        }
        self.edges.extend(
            template
                .control_edges()
                .iter()
                .map(|&(from, to)| (shift(from), shift(to))),
        );

        let produced: BTreeMap<&str, PinRef> = template
            .outputs()
            .iter()
            .map(|(name, pin)| (name.as_str(), PinRef::new(shift(pin.node), pin.pin.clone())))
            .collect();
        let redirect = |pin: &mut PinRef| {
            if pin.node == call_id {
                if let Some(target) = produced.get(pin.pin.as_str()) {
                    *pin = target.clone();
                }
            }
        };
        for slot in self.nodes.iter_mut().flatten() {
            if let Some(bindings) = slot.kind.bindings_mut() {
                for binding in bindings.values_mut() {
                    if let InputBinding::Pin(pin) = binding {
                        redirect(pin);
                    }
                }
            }
        }
        for pin in self.outputs.values_mut() {
            redirect(pin);
        }

        let entry = template.initial().map(shift);
        let exit = template.final_node().map(shift);
        self.edges.retain_mut(|edge| {
            if edge.1 == call_id {
                match entry {
                    Some(entry) => edge.1 = entry,
                    None => return false,
                }
            }
            if edge.0 == call_id {
                match exit {
                    Some(exit) => edge.0 = exit,
                    None => return false,
                }
            }
            true
        });
        if let Some(entry) = entry {
            self.bypass(entry);
        }
        if let Some(exit) = exit {
            self.bypass(exit);
        }
    }

    /// Removes a node, connecting each predecessor to each successor.
    fn bypass(&mut self, id: NodeId) {
        let predecessors: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|(_, to)| *to == id)
            .map(|(from, _)| *from)
            .collect();
        let successors: Vec<NodeId> = self
            .edges
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|(_, to)| *to)
            .collect();
        self.edges.retain(|(from, to)| *from != id && *to != id);
        for &from in &predecessors {
            for &to in &successors {
                self.edges.push((from, to));
            }
        }
        self.nodes[id.0] = None;
    }

    fn compact(self, original: &ActivityGraph) -> ActivityGraph {
        let live = self.nodes.iter().flatten().count();
        let mut remap = vec![None; self.nodes.len()];
        for (new_index, node) in self.nodes.iter().flatten().enumerate() {
            remap[node.id.0] = Some(NodeId(new_index));
        }
        let map = |id: NodeId| remap.get(id.0).copied().flatten().unwrap_or(NodeId(live));

        let mut graph = ActivityGraph::empty(original.name());
        for (name, default) in original.parameters() {
            graph.declare_parameter(name.clone(), default.clone());
        }
        graph.set_resources(original.resources().clone());

        for node in self.nodes.into_iter().flatten() {
            let mut kind = node.kind;
            if let Some(bindings) = kind.bindings_mut() {
                for binding in bindings.values_mut() {
                    if let InputBinding::Pin(pin) = binding {
                        pin.node = map(pin.node);
                    }
                }
            }
            graph.add_node(node.name, kind);
        }
        for (from, to) in self.edges {
            graph.add_control_edge(map(from), map(to));
        }
        for (name, pin) in self.outputs {
            graph.declare_output(name, PinRef::new(map(pin.node), pin.pin));
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{validate_graph, Bindings, ProtocolBuilder, Value};
    use crate::primitives::PrimitiveRegistry;
    use std::sync::Arc;

    fn measurement_template(registry: &PrimitiveRegistry) -> Arc<ActivityGraph> {
        let mut builder = ProtocolBuilder::new("read_absorbance", registry);
        builder.parameter("samples", None);
        builder.parameter("wavelength", Some(Value::nanometers(600.0)));
        let read = builder
            .named_step(
                "read",
                "MeasureAbsorbance",
                Bindings::new()
                    .parameter("samples", "samples")
                    .parameter("wavelength", "wavelength"),
            )
            .unwrap();
        builder.output("measurements", read, "measurements");
        Arc::new(builder.build())
    }

    fn binding_of<'g>(graph: &'g ActivityGraph, node: &str, input: &str) -> &'g InputBinding {
        let id = graph.find(node).unwrap();
        &graph.node(id).unwrap().kind.bindings().unwrap()[input]
    }

    #[test]
    fn test_inlined_graph_stays_valid() {
        let registry = PrimitiveRegistry::standard();
        let template = measurement_template(&registry);

        let mut builder = ProtocolBuilder::new("growth", &registry);
        let plate = builder
            .named_step(
                "plate",
                "EmptyContainer",
                Bindings::new().literal("specification", Value::location("plate")),
            )
            .unwrap();
        let first = builder.detached_call(
            "first_read",
            template.clone(),
            Bindings::new().pin("samples", plate, "samples"),
        );
        let second = builder.detached_call(
            "second_read",
            template.clone(),
            Bindings::new()
                .pin("samples", plate, "samples")
                .literal("wavelength", Value::nanometers(450.0)),
        );
        builder.parallel(vec![vec![first], vec![second]]).unwrap();
        builder.output("late", second, "measurements");
        let graph = builder.build();

        assert_eq!(validate_graph(&graph, &registry), Ok(()));
        let flat = inline_subprotocols(&graph);
        assert_eq!(validate_graph(&flat, &registry), Ok(()));

        // 2 terminals + plate + fork + join + one read per call
        assert_eq!(flat.len(), 7);
        assert!(flat
            .nodes()
            .iter()
            .all(|node| !matches!(node.kind, NodeKind::Subprotocol(_))));

        let plate_id = flat.find("plate").unwrap();
        assert_eq!(
            binding_of(&flat, "first_read/read", "samples"),
            &InputBinding::Pin(PinRef::new(plate_id, "samples"))
        );
        assert_eq!(
            binding_of(&flat, "first_read/read", "wavelength"),
            &InputBinding::Literal(Value::nanometers(600.0))
        );
        assert_eq!(
            binding_of(&flat, "second_read/read", "wavelength"),
            &InputBinding::Literal(Value::nanometers(450.0))
        );

        let second_read = flat.find("second_read/read").unwrap();
        assert_eq!(
            flat.outputs()["late"],
            PinRef::new(second_read, "measurements")
        );
        let fork = flat.find("fork").unwrap();
        assert_eq!(flat.successors(fork).len(), 2);
        // template untouched
        assert_eq!(template.len(), 3);
    }

    #[test]
    fn test_nested_calls_and_redirected_pins() {
        let registry = PrimitiveRegistry::standard();
        let inner = measurement_template(&registry);

        let mut middle = ProtocolBuilder::new("middle", &registry);
        middle.parameter("target", None);
        let call = middle.call(
            "inner",
            inner,
            Bindings::new().parameter("samples", "target"),
        );
        middle.output("result", call, "measurements");
        let middle = Arc::new(middle.build());

        let mut builder = ProtocolBuilder::new("outer", &registry);
        let plate = builder
            .named_step(
                "plate",
                "EmptyContainer",
                Bindings::new().literal("specification", Value::location("plate")),
            )
            .unwrap();
        let outer_call = builder.call(
            "middle",
            middle,
            Bindings::new().pin("target", plate, "samples"),
        );
        let report = builder
            .named_step(
                "report",
                "MeasureFluorescence",
                Bindings::new()
                    .pin("samples", outer_call, "result")
                    .literal("excitation_wavelength", Value::nanometers(485.0))
                    .literal("emission_wavelength", Value::nanometers(530.0)),
            )
            .unwrap();
        builder.output("fluorescence", report, "measurements");
        let graph = builder.build();

        assert_eq!(validate_graph(&graph, &registry), Ok(()));
        let flat = inline_subprotocols(&graph);
        assert_eq!(validate_graph(&flat, &registry), Ok(()));

        let plate_id = flat.find("plate").unwrap();
        let read = flat.find("middle/inner/read").unwrap();
        assert_eq!(
            binding_of(&flat, "middle/inner/read", "samples"),
            &InputBinding::Pin(PinRef::new(plate_id, "samples"))
        );
        assert_eq!(
            binding_of(&flat, "report", "samples"),
            &InputBinding::Pin(PinRef::new(read, "measurements"))
        );
        assert_eq!(flat.successors(plate_id), &[read]);
    }

    #[test]
    fn test_empty_subprotocol_collapses() {
        let registry = PrimitiveRegistry::standard();
        let mut empty = ActivityGraph::new("noop");
        empty.chain(&[NodeId(0), NodeId(1)]);

        let mut builder = ProtocolBuilder::new("outer", &registry);
        builder.call("noop", Arc::new(empty), Bindings::new());
        let graph = builder.build();

        let flat = inline_subprotocols(&graph);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat.successors(NodeId(0)), &[NodeId(1)]);
        assert_eq!(validate_graph(&flat, &registry), Ok(()));
    }
}
