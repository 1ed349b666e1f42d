// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Activity graph model: nodes, bindings, edges, assembly, validation and inlining.

mod activity_graph;
mod builder;
mod inline;
mod node;
mod validation;
mod value;

pub use activity_graph::{ActivityGraph, Splice};
pub use builder::ProtocolBuilder;
pub use inline::inline_subprotocols;
pub use node::{
    ActivityKind, Bindings, DataEdge, InputBinding, Node, NodeId, NodeKind, PinRef,
    PrimitiveStep, SubprotocolCall,
};
pub use validation::validate_graph;
pub use value::{Outputs, Quantity, ResolvedInputs, Value, ValueKind, MICROLITER};
