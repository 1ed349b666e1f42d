// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::graph::{ActivityGraph, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Stable index of a node inside one graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An output pin of a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PinRef {
    pub node: NodeId,
    pub pin: String,
}

impl PinRef {
    pub fn new(node: NodeId, pin: impl Into<String>) -> Self {
        Self {
            node,
            pin: pin.into(),
        }
    }
}

/// Where an input pin gets its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputBinding {
    Literal(Value),
    /// Output pin of another node; implies a data edge.
    Pin(PinRef),
    /// Protocol parameter resolved when the protocol is invoked.
    Parameter(String),
}

/// Input bindings keyed by input name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings(pub BTreeMap<String, InputBinding>);

impl Bindings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn literal(mut self, input: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(input.into(), InputBinding::Literal(value.into()));
        self
    }

    pub fn pin(mut self, input: impl Into<String>, node: NodeId, pin: impl Into<String>) -> Self {
        self.0
            .insert(input.into(), InputBinding::Pin(PinRef::new(node, pin)));
        self
    }

    pub fn parameter(mut self, input: impl Into<String>, parameter: impl Into<String>) -> Self {
        self.0
            .insert(input.into(), InputBinding::Parameter(parameter.into()));
        self
    }

    pub fn into_inner(self) -> BTreeMap<String, InputBinding> {
        self.0
    }
}

impl From<BTreeMap<String, InputBinding>> for Bindings {
    fn from(map: BTreeMap<String, InputBinding>) -> Self {
        Self(map)
    }
}

/// A leaf step performed by a registered primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveStep {
    pub primitive: String,
    pub inputs: BTreeMap<String, InputBinding>,
    pub outputs: Vec<String>,
}

impl PrimitiveStep {
    pub fn new(primitive: impl Into<String>, inputs: Bindings, outputs: Vec<String>) -> Self {
        Self {
            primitive: primitive.into(),
            inputs: inputs.into_inner(),
            outputs,
        }
    }
}

/// Invocation of another complete protocol.
///
/// The template is shared and never mutated; every traversal works on a fresh copy.
#[derive(Debug, Clone)]
pub struct SubprotocolCall {
    pub protocol: Arc<ActivityGraph>,
    pub bindings: BTreeMap<String, InputBinding>,
    pub outputs: Vec<String>,
}

impl SubprotocolCall {
    /// Call exposing every output the callee declares.
    pub fn new(protocol: Arc<ActivityGraph>, bindings: Bindings) -> Self {
        let outputs = protocol.outputs().keys().cloned().collect();
        Self {
            protocol,
            bindings: bindings.into_inner(),
            outputs,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Initial,
    Final,
    Fork,
    Join,
    Primitive(PrimitiveStep),
    Subprotocol(SubprotocolCall),
}

impl NodeKind {
    pub fn activity_kind(&self) -> ActivityKind {
        match self {
            NodeKind::Initial => ActivityKind::Initial,
            NodeKind::Final => ActivityKind::Final,
            NodeKind::Fork => ActivityKind::Fork,
            NodeKind::Join => ActivityKind::Join,
            NodeKind::Primitive(_) => ActivityKind::Primitive,
            NodeKind::Subprotocol(_) => ActivityKind::Subprotocol,
        }
    }

    pub fn bindings(&self) -> Option<&BTreeMap<String, InputBinding>> {
        match self {
            NodeKind::Primitive(step) => Some(&step.inputs),
            NodeKind::Subprotocol(call) => Some(&call.bindings),
            _ => None,
        }
    }

    pub(crate) fn bindings_mut(&mut self) -> Option<&mut BTreeMap<String, InputBinding>> {
        match self {
            NodeKind::Primitive(step) => Some(&mut step.inputs),
            NodeKind::Subprotocol(call) => Some(&mut call.bindings),
            _ => None,
        }
    }

    pub fn output_pins(&self) -> &[String] {
        match self {
            NodeKind::Primitive(step) => &step.outputs,
            NodeKind::Subprotocol(call) => &call.outputs,
            _ => &[],
        }
    }

    pub fn primitive(&self) -> Option<&str> {
        match self {
            NodeKind::Primitive(step) => Some(&step.primitive),
            _ => None,
        }
    }
}

/// Serializable node classification used in execution records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Initial,
    Final,
    Fork,
    Join,
    Primitive,
    Subprotocol,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

/// Dependency from an output pin to an input of another node.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEdge {
    pub source: PinRef,
    pub target: NodeId,
    pub input: String,
}
