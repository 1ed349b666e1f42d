// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// A single structural problem found while validating an activity graph.
///
/// Node references use the display name of the node inside the graph that
/// was validated. Problems inside a sub-protocol are wrapped in
/// [`ValidationError::Subprotocol`] so the call path stays visible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("protocol has no Initial node")]
    MissingInitial,

    #[error("protocol has more than one Initial node: {}", .nodes.join(", "))]
    MultipleInitial { nodes: Vec<String> },

    #[error("protocol has no Final node")]
    MissingFinal,

    #[error("protocol has more than one Final node: {}", .nodes.join(", "))]
    MultipleFinal { nodes: Vec<String> },

    #[error("Initial node '{node}' has incoming control edges")]
    InitialHasIncoming { node: String },

    #[error("Final node '{node}' has outgoing control edges")]
    FinalHasOutgoing { node: String },

    #[error("node '{node}' is not reachable from the Initial node")]
    UnreachableNode { node: String },

    #[error("the Final node is not reachable from node '{node}'")]
    FinalUnreachable { node: String },

    /// A circular dependency through control or data edges.
    #[error("cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Fork '{node}' must have exactly 1 incoming and at least 2 outgoing edges (found {incoming} in, {outgoing} out)")]
    ForkArity {
        node: String,
        incoming: usize,
        outgoing: usize,
    },

    #[error("Join '{node}' must have at least 2 incoming and exactly 1 outgoing edge (found {incoming} in, {outgoing} out)")]
    JoinArity {
        node: String,
        incoming: usize,
        outgoing: usize,
    },

    #[error("node '{node}' branches into {outgoing} successors without a Fork")]
    ImplicitBranch { node: String, outgoing: usize },

    #[error("node '{node}' merges {incoming} predecessors without a Join")]
    ImplicitMerge { node: String, incoming: usize },

    #[error("Join '{join}' merges branches that were not opened by the same Fork")]
    UnbalancedJoin { join: String },

    #[error("Fork '{fork}' is never closed by a matching Join")]
    UnclosedFork { fork: String },

    #[error("node '{node}' uses unknown primitive '{primitive}'")]
    UnknownPrimitive { node: String, primitive: String },

    #[error("node '{node}' binds input '{input}' which is not declared")]
    UnknownInput { node: String, input: String },

    #[error("node '{node}' leaves required input '{input}' unbound with no default")]
    UnboundInput { node: String, input: String },

    #[error("node '{node}' binds input '{input}' to a literal that is not a {expected}")]
    LiteralKindMismatch {
        node: String,
        input: String,
        expected: String,
    },

    #[error("node '{node}' reads input '{input}' from a node that does not exist")]
    UnknownDataSource { node: String, input: String },

    #[error("node '{node}' reads input '{input}' from undeclared pin '{source_node}.{pin}'")]
    UnknownOutputPin {
        node: String,
        input: String,
        source_node: String,
        pin: String,
    },

    #[error("node '{node}' binds input '{input}' to undeclared protocol parameter '{parameter}'")]
    UndeclaredParameter {
        node: String,
        input: String,
        parameter: String,
    },

    #[error("protocol output '{output}' refers to an unknown pin")]
    UnknownProtocolOutput { output: String },

    #[error("sub-protocol call '{node}' declares output '{output}' which the callee does not expose")]
    UnknownCallOutput { node: String, output: String },

    #[error("resource '{resource}' is invalid: {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("in sub-protocol call '{call}': {error}")]
    Subprotocol {
        call: String,
        error: Box<ValidationError>,
    },
}

/// Every problem found in one validation pass of an activity graph.
///
/// Graph problems are detected before execution starts and are always fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedGraph {
    pub protocol: String,
    pub errors: Vec<ValidationError>,
}

impl MalformedGraph {
    pub fn new(protocol: impl Into<String>, errors: Vec<ValidationError>) -> Self {
        Self {
            protocol: protocol.into(),
            errors,
        }
    }

    pub fn contains(&self, predicate: impl Fn(&ValidationError) -> bool) -> bool {
        self.errors.iter().any(predicate)
    }
}

impl fmt::Display for MalformedGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "protocol '{}' is malformed ({} problem{})",
            self.protocol,
            self.errors.len(),
            if self.errors.len() == 1 { "" } else { "s" }
        )?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for MalformedGraph {}

/// Errors raised while assembling a protocol with the builder.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("primitive '{0}' is not registered")]
    UnknownPrimitive(String),

    #[error("a parallel section needs at least two branches, got {0}")]
    TooFewBranches(usize),

    #[error("branch {0} of a parallel section is empty")]
    EmptyBranch(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_graph_lists_every_problem() {
        let malformed = MalformedGraph::new(
            "demo",
            vec![
                ValidationError::MissingFinal,
                ValidationError::UnboundInput {
                    node: "transfer".into(),
                    input: "amount".into(),
                },
            ],
        );

        let text = malformed.to_string();
        assert!(text.starts_with("protocol 'demo' is malformed (2 problems)"));
        assert!(text.contains("no Final node"));
        assert!(text.contains("'transfer' leaves required input 'amount' unbound"));
    }

    #[test]
    fn test_subprotocol_error_keeps_call_path() {
        let error = ValidationError::Subprotocol {
            call: "read_plate".into(),
            error: Box::new(ValidationError::CyclicDependency {
                cycle: vec!["a".into(), "b".into(), "a".into()],
            }),
        };
        assert_eq!(
            error.to_string(),
            "in sub-protocol call 'read_plate': cyclic dependency detected: a -> b -> a"
        );
    }
}
