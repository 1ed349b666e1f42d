// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of activity graphs.
//!
//! Validation is a pure function of the graph and the primitive registry. It never
//! stops at the first problem: every check contributes to one [`MalformedGraph`] so a
//! protocol author sees the full list at once.
//!
//! # Validation Pipeline
//!
//! 1. **Terminals**: exactly one `Initial` (no incoming edges) and one `Final`
//!    (no outgoing edges)
//! 2. **Control arity**: Fork 1-in/≥2-out, Join ≥2-in/1-out, every other node at most
//!    one predecessor and one successor
//! 3. **Bindings**: primitives exist, inputs are declared, required inputs are bound,
//!    literals have the declared kind, pins and parameters exist; sub-protocol calls
//!    are checked against the callee and the callee is validated recursively
//! 4. **Protocol outputs and resources**
//! 5. **Reachability**: every node reachable from `Initial`, `Final` reachable from
//!    every node
//! 6. **Cycle detection** over control and data edges
//! 7. **Fork/join nesting**: every Join closes branches opened by one Fork and no Fork
//!    is left open at `Final`
//!
//! Steps 5 to 7 need sane terminals and are skipped otherwise; step 7 also needs
//! correct arity and an acyclic graph.
//!
//! # Algorithms
//!
//! ## Cycle Detection
//! DFS with a recursion stack ("three colors"). A back edge to a node on the current
//! path closes a cycle, and the path segment from that node is reported.
//! - **Time Complexity**: O(V + E)
//! - **Space Complexity**: O(V)
//!
//! ## Nesting
//! Nodes are visited in topological order carrying the stack of open forks. A Fork
//! pushes itself, a Join requires identical non-empty stacks on every incoming branch
//! and pops the top.
//! - **Time Complexity**: O((V + E) · d) where d is the nesting depth

use crate::errors::{MalformedGraph, ValidationError};
use crate::graph::{ActivityGraph, InputBinding, NodeId, NodeKind};
use crate::primitives::PrimitiveRegistry;
use std::collections::{BTreeMap, HashSet, VecDeque};

/// Validates a graph, returning every structural problem found.
pub fn validate_graph(
    graph: &ActivityGraph,
    registry: &PrimitiveRegistry,
) -> Result<(), MalformedGraph> {
    let errors = collect_errors(graph, registry);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MalformedGraph::new(graph.name(), errors))
    }
}

fn collect_errors(graph: &ActivityGraph, registry: &PrimitiveRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let terminals = validate_terminals(graph);
    let terminals_ok = terminals.is_empty();
    errors.extend(terminals);

    let arity = validate_control_arity(graph);
    let arity_ok = arity.is_empty();
    errors.extend(arity);

    errors.extend(validate_bindings(graph, registry));
    errors.extend(validate_protocol_outputs(graph));
    errors.extend(validate_resources(graph));

    if terminals_ok {
        errors.extend(validate_reachability(graph));
        match validate_acyclic_graph(graph) {
            Err(cycle) => errors.push(cycle),
            Ok(()) if arity_ok => errors.extend(validate_fork_join_nesting(graph)),
            Ok(()) => {}
        }
    }

    errors
}

fn validate_terminals(graph: &ActivityGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let initials: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|node| matches!(node.kind, NodeKind::Initial))
        .map(|node| node.name.as_str())
        .collect();
    let finals: Vec<&str> = graph
        .nodes()
        .iter()
        .filter(|node| matches!(node.kind, NodeKind::Final))
        .map(|node| node.name.as_str())
        .collect();

    match initials.len() {
        0 => errors.push(ValidationError::MissingInitial),
        1 => {}
        _ => errors.push(ValidationError::MultipleInitial {
            nodes: initials.iter().map(|name| name.to_string()).collect(),
        }),
    }
    match finals.len() {
        0 => errors.push(ValidationError::MissingFinal),
        1 => {}
        _ => errors.push(ValidationError::MultipleFinal {
            nodes: finals.iter().map(|name| name.to_string()).collect(),
        }),
    }

    for node in graph.nodes() {
        match node.kind {
            NodeKind::Initial if !graph.predecessors(node.id).is_empty() => {
                errors.push(ValidationError::InitialHasIncoming {
                    node: node.name.clone(),
                });
            }
            NodeKind::Final if !graph.successors(node.id).is_empty() => {
                errors.push(ValidationError::FinalHasOutgoing {
                    node: node.name.clone(),
                });
            }
            _ => {}
        }
    }
    errors
}

fn validate_control_arity(graph: &ActivityGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for node in graph.nodes() {
        let incoming = graph.predecessors(node.id).len();
        let outgoing = graph.successors(node.id).len();
        match node.kind {
            NodeKind::Fork => {
                if incoming != 1 || outgoing < 2 {
                    errors.push(ValidationError::ForkArity {
                        node: node.name.clone(),
                        incoming,
                        outgoing,
                    });
                }
            }
            NodeKind::Join => {
                if incoming < 2 || outgoing != 1 {
                    errors.push(ValidationError::JoinArity {
                        node: node.name.clone(),
                        incoming,
                        outgoing,
                    });
                }
            }
            _ => {
                if outgoing > 1 {
                    errors.push(ValidationError::ImplicitBranch {
                        node: node.name.clone(),
                        outgoing,
                    });
                }
                if incoming > 1 {
                    errors.push(ValidationError::ImplicitMerge {
                        node: node.name.clone(),
                        incoming,
                    });
                }
            }
        }
    }
    errors
}

/// Checks every input binding of primitive steps and sub-protocol calls.
///
/// Sub-protocol callees are validated recursively; their problems are wrapped with
/// the name of the calling node.
fn validate_bindings(graph: &ActivityGraph, registry: &PrimitiveRegistry) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for node in graph.nodes() {
        match &node.kind {
            NodeKind::Primitive(step) => {
                let Some(signature) = registry.get(&step.primitive) else {
                    errors.push(ValidationError::UnknownPrimitive {
                        node: node.name.clone(),
                        primitive: step.primitive.clone(),
                    });
                    continue;
                };

                for (input, binding) in &step.inputs {
                    let Some(spec) = signature.input(input) else {
                        errors.push(ValidationError::UnknownInput {
                            node: node.name.clone(),
                            input: input.clone(),
                        });
                        continue;
                    };
                    if let InputBinding::Literal(value) = binding {
                        if !spec.kind.accepts(value) {
                            errors.push(ValidationError::LiteralKindMismatch {
                                node: node.name.clone(),
                                input: input.clone(),
                                expected: spec.kind.to_string(),
                            });
                        }
                    }
                    errors.extend(validate_binding_source(graph, &node.name, input, binding));
                }

                for spec in &signature.inputs {
                    if spec.is_required() && !step.inputs.contains_key(&spec.name) {
                        errors.push(ValidationError::UnboundInput {
                            node: node.name.clone(),
                            input: spec.name.clone(),
                        });
                    }
                }
            }
            NodeKind::Subprotocol(call) => {
                let callee = &call.protocol;
                for (input, binding) in &call.bindings {
                    if !callee.parameters().contains_key(input) {
                        errors.push(ValidationError::UnknownInput {
                            node: node.name.clone(),
                            input: input.clone(),
                        });
                        continue;
                    }
                    errors.extend(validate_binding_source(graph, &node.name, input, binding));
                }
                for (parameter, default) in callee.parameters() {
                    if default.is_none() && !call.bindings.contains_key(parameter) {
                        errors.push(ValidationError::UnboundInput {
                            node: node.name.clone(),
                            input: parameter.clone(),
                        });
                    }
                }
                for output in &call.outputs {
                    if !callee.outputs().contains_key(output) {
                        errors.push(ValidationError::UnknownCallOutput {
                            node: node.name.clone(),
                            output: output.clone(),
                        });
                    }
                }
                errors.extend(collect_errors(callee, registry).into_iter().map(|error| {
                    ValidationError::Subprotocol {
                        call: node.name.clone(),
                        error: Box::new(error),
                    }
                }));
            }
            _ => {}
        }
    }
    errors
}

fn validate_binding_source(
    graph: &ActivityGraph,
    node: &str,
    input: &str,
    binding: &InputBinding,
) -> Option<ValidationError> {
    match binding {
        InputBinding::Literal(_) => None,
        InputBinding::Pin(pin) => match graph.node(pin.node) {
            None => Some(ValidationError::UnknownDataSource {
                node: node.to_string(),
                input: input.to_string(),
            }),
            Some(source) if !source.kind.output_pins().contains(&pin.pin) => {
                Some(ValidationError::UnknownOutputPin {
                    node: node.to_string(),
                    input: input.to_string(),
                    source_node: source.name.clone(),
                    pin: pin.pin.clone(),
                })
            }
            Some(_) => None,
        },
        InputBinding::Parameter(parameter) => {
            if graph.parameters().contains_key(parameter) {
                None
            } else {
                Some(ValidationError::UndeclaredParameter {
                    node: node.to_string(),
                    input: input.to_string(),
                    parameter: parameter.clone(),
                })
            }
        }
    }
}

fn validate_protocol_outputs(graph: &ActivityGraph) -> Vec<ValidationError> {
    graph
        .outputs()
        .iter()
        .filter(|(_, pin)| {
            graph
                .node(pin.node)
                .map(|node| !node.kind.output_pins().contains(&pin.pin))
                .unwrap_or(true)
        })
        .map(|(output, _)| ValidationError::UnknownProtocolOutput {
            output: output.clone(),
        })
        .collect()
}

fn validate_resources(graph: &ActivityGraph) -> Vec<ValidationError> {
    graph
        .resources()
        .check()
        .into_iter()
        .map(|error| ValidationError::InvalidResource {
            resource: error.resource().to_string(),
            reason: error.to_string(),
        })
        .collect()
}

/// Forward reachability from `Initial` and backward reachability from `Final`,
/// over control edges only.
fn validate_reachability(graph: &ActivityGraph) -> Vec<ValidationError> {
    let (Some(initial), Some(final_node)) = (graph.initial(), graph.final_node()) else {
        return Vec::new();
    };

    let forward = reachable(initial, |id| graph.successors(id));
    let backward = reachable(final_node, |id| graph.predecessors(id));

    let mut errors = Vec::new();
    for node in graph.nodes() {
        if !forward.contains(&node.id) {
            errors.push(ValidationError::UnreachableNode {
                node: node.name.clone(),
            });
        } else if !backward.contains(&node.id) {
            errors.push(ValidationError::FinalUnreachable {
                node: node.name.clone(),
            });
        }
    }
    errors
}

fn reachable<'g, F>(start: NodeId, neighbors: F) -> HashSet<NodeId>
where
    F: Fn(NodeId) -> &'g [NodeId],
{
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        for &next in neighbors(id) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen
}

/// Detects cycles through control and data edges with a DFS recursion stack.
fn validate_acyclic_graph(graph: &ActivityGraph) -> Result<(), ValidationError> {
    let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); graph.len()];
    for &(from, to) in graph.control_edges() {
        adjacency[from.0].push(to);
    }
    for edge in graph.data_edges() {
        if graph.contains(edge.source.node) {
            adjacency[edge.source.node.0].push(edge.target);
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in graph.nodes() {
        if !visited.contains(&node.id) {
            if let Some(cycle) =
                dfs_cycle_detection(node.id, &adjacency, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(ValidationError::CyclicDependency {
                    cycle: cycle
                        .into_iter()
                        .map(|id| graph.node_name(id).to_string())
                        .collect(),
                });
            }
        }
    }
    Ok(())
}

fn dfs_cycle_detection(
    node: NodeId,
    adjacency: &[Vec<NodeId>],
    visited: &mut HashSet<NodeId>,
    rec_stack: &mut HashSet<NodeId>,
    path: &mut Vec<NodeId>,
) -> Option<Vec<NodeId>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    for &neighbor in &adjacency[node.0] {
        if !visited.contains(&neighbor) {
            if let Some(cycle) = dfs_cycle_detection(neighbor, adjacency, visited, rec_stack, path)
            {
                return Some(cycle);
            }
        } else if rec_stack.contains(&neighbor) {
            let start = path.iter().position(|&id| id == neighbor).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(neighbor);
            return Some(cycle);
        }
    }

    rec_stack.remove(&node);
    path.pop();
    None
}

/// Propagates the stack of open forks along control edges in topological order.
fn validate_fork_join_nesting(graph: &ActivityGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut in_degree: Vec<usize> = graph
        .nodes()
        .iter()
        .map(|node| graph.predecessors(node.id).len())
        .collect();
    let mut queue: VecDeque<NodeId> = graph
        .nodes()
        .iter()
        .filter(|node| in_degree[node.id.0] == 0)
        .map(|node| node.id)
        .collect();
    let mut open_forks: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();

    while let Some(id) = queue.pop_front() {
        let incoming: Vec<&Vec<NodeId>> = graph
            .predecessors(id)
            .iter()
            .filter_map(|pred| open_forks.get(pred))
            .collect();
        let mut stack = incoming.first().map(|stack| (*stack).clone()).unwrap_or_default();

        match graph.node(id).map(|node| &node.kind) {
            Some(NodeKind::Fork) => stack.push(id),
            Some(NodeKind::Join) => {
                let balanced = !stack.is_empty() && incoming.iter().all(|other| **other == stack);
                if !balanced {
                    errors.push(ValidationError::UnbalancedJoin {
                        join: graph.node_name(id).to_string(),
                    });
                }
                stack.pop();
            }
            Some(NodeKind::Final) => {
                for fork in &stack {
                    errors.push(ValidationError::UnclosedFork {
                        fork: graph.node_name(*fork).to_string(),
                    });
                }
            }
            _ => {}
        }
        open_forks.insert(id, stack);

        for &next in graph.successors(id) {
            in_degree[next.0] -= 1;
            if in_degree[next.0] == 0 {
                queue.push_back(next);
            }
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Bindings, PrimitiveStep, ProtocolBuilder, SubprotocolCall, Value};
    use std::sync::Arc;

    fn registry() -> PrimitiveRegistry {
        PrimitiveRegistry::standard()
    }

    fn container(graph: &mut ActivityGraph, name: &str) -> NodeId {
        graph.add_step(
            name,
            PrimitiveStep::new(
                "EmptyContainer",
                Bindings::new().literal("specification", Value::location("plate")),
                vec!["samples".into()],
            ),
        )
    }

    fn errors_of(graph: &ActivityGraph) -> Vec<ValidationError> {
        match validate_graph(graph, &registry()) {
            Ok(()) => Vec::new(),
            Err(malformed) => malformed.errors,
        }
    }

    #[test]
    fn test_valid_linear_protocol() {
        let mut graph = ActivityGraph::new("linear");
        let a = container(&mut graph, "a");
        let b = container(&mut graph, "b");
        graph.chain(&[NodeId(0), a, b, NodeId(1)]);
        assert_eq!(errors_of(&graph), vec![]);
    }

    #[test]
    fn test_valid_nested_fork_join() {
        let mut graph = ActivityGraph::new("nested");
        let outer_fork = graph.add_fork("outer_fork");
        let inner_fork = graph.add_fork("inner_fork");
        let a = container(&mut graph, "a");
        let b = container(&mut graph, "b");
        let c = container(&mut graph, "c");
        let inner_join = graph.add_join("inner_join");
        let outer_join = graph.add_join("outer_join");
        graph.chain(&[NodeId(0), outer_fork, inner_fork, a, inner_join, outer_join, NodeId(1)]);
        graph.chain(&[inner_fork, b, inner_join]);
        graph.chain(&[outer_fork, c, outer_join]);
        assert_eq!(errors_of(&graph), vec![]);
    }

    #[test]
    fn test_unreachable_final() {
        let mut graph = ActivityGraph::new("dead_end");
        let a = container(&mut graph, "a");
        graph.chain(&[NodeId(0), a]);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::UnreachableNode {
            node: "final".into()
        }));
        assert!(errors.contains(&ValidationError::FinalUnreachable { node: "a".into() }));
    }

    #[test]
    fn test_fork_and_join_arity() {
        let mut graph = ActivityGraph::new("arity");
        let fork = graph.add_fork("fork");
        let a = container(&mut graph, "a");
        let join = graph.add_join("join");
        graph.chain(&[NodeId(0), fork, a, join, NodeId(1)]);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::ForkArity {
            node: "fork".into(),
            incoming: 1,
            outgoing: 1
        }));
        assert!(errors.contains(&ValidationError::JoinArity {
            node: "join".into(),
            incoming: 1,
            outgoing: 1
        }));
    }

    #[test]
    fn test_implicit_branch_and_merge() {
        let mut graph = ActivityGraph::new("implicit");
        let a = container(&mut graph, "a");
        let b = container(&mut graph, "b");
        let c = container(&mut graph, "c");
        graph.chain(&[NodeId(0), a, b, c, NodeId(1)]);
        graph.add_control_edge(a, c);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::ImplicitBranch {
            node: "a".into(),
            outgoing: 2
        }));
        assert!(errors.contains(&ValidationError::ImplicitMerge {
            node: "c".into(),
            incoming: 2
        }));
    }

    #[test]
    fn test_crossed_fork_join_is_unbalanced() {
        // fork1 opens a,b; fork2 (inside a) opens c,d; join1 wrongly merges b and c
        let mut graph = ActivityGraph::new("crossed");
        let fork1 = graph.add_fork("fork1");
        let fork2 = graph.add_fork("fork2");
        let a = container(&mut graph, "a");
        let b = container(&mut graph, "b");
        let c = container(&mut graph, "c");
        let d = container(&mut graph, "d");
        let join1 = graph.add_join("join1");
        let join2 = graph.add_join("join2");
        graph.chain(&[NodeId(0), fork1, a, fork2, c, join1, join2, NodeId(1)]);
        graph.chain(&[fork1, b, join1]);
        graph.chain(&[fork2, d, join2]);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::UnbalancedJoin {
            join: "join1".into()
        }));
    }

    #[test]
    fn test_binding_problems() {
        struct TestCase {
            name: &'static str,
            bindings: Bindings,
            expected: ValidationError,
        }

        let test_cases = vec![
            TestCase {
                name: "required input unbound",
                bindings: Bindings::new()
                    .literal("source", Value::location("plate/A1"))
                    .literal("destination", Value::location("plate/B1")),
                expected: ValidationError::UnboundInput {
                    node: "transfer".into(),
                    input: "amount".into(),
                },
            },
            TestCase {
                name: "literal of the wrong kind",
                bindings: Bindings::new()
                    .literal("source", Value::location("plate/A1"))
                    .literal("destination", Value::location("plate/B1"))
                    .literal("amount", "a lot"),
                expected: ValidationError::LiteralKindMismatch {
                    node: "transfer".into(),
                    input: "amount".into(),
                    expected: "quantity".into(),
                },
            },
            TestCase {
                name: "undeclared input",
                bindings: Bindings::new()
                    .literal("source", Value::location("plate/A1"))
                    .literal("destination", Value::location("plate/B1"))
                    .literal("amount", Value::microliters(10.0))
                    .literal("speed", 2.0),
                expected: ValidationError::UnknownInput {
                    node: "transfer".into(),
                    input: "speed".into(),
                },
            },
            TestCase {
                name: "undeclared parameter",
                bindings: Bindings::new()
                    .literal("source", Value::location("plate/A1"))
                    .literal("destination", Value::location("plate/B1"))
                    .parameter("amount", "volume"),
                expected: ValidationError::UndeclaredParameter {
                    node: "transfer".into(),
                    input: "amount".into(),
                    parameter: "volume".into(),
                },
            },
            TestCase {
                name: "pin of a missing node",
                bindings: Bindings::new()
                    .pin("source", NodeId(42), "samples")
                    .literal("destination", Value::location("plate/B1"))
                    .literal("amount", Value::microliters(10.0)),
                expected: ValidationError::UnknownDataSource {
                    node: "transfer".into(),
                    input: "source".into(),
                },
            },
        ];

        for case in test_cases {
            let mut graph = ActivityGraph::new("bindings");
            let step = graph.add_step(
                "transfer",
                PrimitiveStep::new("Transfer", case.bindings, vec![]),
            );
            graph.chain(&[NodeId(0), step, NodeId(1)]);
            let errors = errors_of(&graph);
            assert!(
                errors.contains(&case.expected),
                "case '{}': {:?}",
                case.name,
                errors
            );
        }
    }

    #[test]
    fn test_unknown_output_pin_and_primitive() {
        let mut graph = ActivityGraph::new("pins");
        let a = container(&mut graph, "a");
        let reader = graph.add_step(
            "reader",
            PrimitiveStep::new(
                "MeasureAbsorbance",
                Bindings::new()
                    .pin("samples", a, "contents")
                    .literal("wavelength", Value::nanometers(600.0)),
                vec!["measurements".into()],
            ),
        );
        let mystery = graph.add_step(
            "mystery",
            PrimitiveStep::new("Centrifuge", Bindings::new(), vec![]),
        );
        graph.chain(&[NodeId(0), a, reader, mystery, NodeId(1)]);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::UnknownOutputPin {
            node: "reader".into(),
            input: "samples".into(),
            source_node: "a".into(),
            pin: "contents".into(),
        }));
        assert!(errors.contains(&ValidationError::UnknownPrimitive {
            node: "mystery".into(),
            primitive: "Centrifuge".into(),
        }));
    }

    #[test]
    fn test_data_cycle_is_detected() {
        let mut graph = ActivityGraph::new("data_cycle");
        let a = container(&mut graph, "a");
        let reader = graph.add_step(
            "reader",
            PrimitiveStep::new(
                "MeasureAbsorbance",
                Bindings::new()
                    .pin("samples", a, "samples")
                    .literal("wavelength", Value::nanometers(600.0)),
                vec!["measurements".into()],
            ),
        );
        // reader runs before the container it reads from
        graph.chain(&[NodeId(0), reader, a, NodeId(1)]);

        let errors = errors_of(&graph);
        assert!(errors
            .iter()
            .any(|error| matches!(error, ValidationError::CyclicDependency { .. })));
    }

    #[test]
    fn test_subprotocol_problems_are_wrapped() {
        let registry = registry();
        let mut callee = ActivityGraph::new("callee");
        callee.declare_parameter("samples", None);
        let broken = callee.add_step(
            "broken",
            PrimitiveStep::new("Centrifuge", Bindings::new(), vec![]),
        );
        callee.chain(&[NodeId(0), broken, NodeId(1)]);

        let mut builder = ProtocolBuilder::new("caller", &registry);
        builder.call("read", Arc::new(callee), Bindings::new());
        let graph = builder.build();

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::UnboundInput {
            node: "read".into(),
            input: "samples".into(),
        }));
        assert!(errors.contains(&ValidationError::Subprotocol {
            call: "read".into(),
            error: Box::new(ValidationError::UnknownPrimitive {
                node: "broken".into(),
                primitive: "Centrifuge".into(),
            }),
        }));
    }

    #[test]
    fn test_call_output_must_exist_in_callee() {
        let callee = Arc::new(ActivityGraph::new("empty_callee"));
        let mut graph = ActivityGraph::new("caller");
        let mut call = SubprotocolCall::new(callee, Bindings::new());
        call.outputs.push("result".into());
        let node = graph.add_call("call", call);
        graph.chain(&[NodeId(0), node, NodeId(1)]);

        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::UnknownCallOutput {
            node: "call".into(),
            output: "result".into(),
        }));
    }

    #[test]
    fn test_terminal_problems() {
        let mut graph = ActivityGraph::empty("no_terminals");
        container(&mut graph, "a");
        let errors = errors_of(&graph);
        assert!(errors.contains(&ValidationError::MissingInitial));
        assert!(errors.contains(&ValidationError::MissingFinal));

        let mut doubled = ActivityGraph::new("two_initials");
        doubled.add_node("initial_2", NodeKind::Initial);
        doubled.chain(&[NodeId(0), NodeId(1)]);
        doubled.chain(&[NodeId(2), NodeId(1)]);
        let errors = errors_of(&doubled);
        assert!(errors.contains(&ValidationError::MultipleInitial {
            nodes: vec!["initial".into(), "initial_2".into()]
        }));
    }
}
