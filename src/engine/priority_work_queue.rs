// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready queue of the scheduler.
//!
//! Nodes are popped by ascending topological rank, ties broken by ascending node id,
//! which makes the dispatch order a deterministic linearization of the graph.

use crate::graph::NodeId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrioritizedTask {
    pub node: NodeId,
    pub rank: usize,
}

impl PrioritizedTask {
    pub fn new(node: NodeId, rank: usize) -> Self {
        Self { node, rank }
    }
}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so the lowest (rank, node) is popped first
        (other.rank, other.node).cmp(&(self.rank, self.node))
    }
}

#[derive(Debug, Default)]
pub struct PriorityWorkQueue {
    heap: BinaryHeap<PrioritizedTask>,
}

impl PriorityWorkQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, task: PrioritizedTask) {
        self.heap.push(task);
    }

    pub fn extend<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = PrioritizedTask>,
    {
        self.heap.extend(tasks);
    }

    pub fn pop(&mut self) -> Option<PrioritizedTask> {
        self.heap.pop()
    }

    pub fn peek(&self) -> Option<&PrioritizedTask> {
        self.heap.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_rank_first() {
        let mut queue = PriorityWorkQueue::new();
        queue.push(PrioritizedTask::new(NodeId(2), 2));
        queue.push(PrioritizedTask::new(NodeId(7), 0));
        queue.push(PrioritizedTask::new(NodeId(1), 1));

        let order: Vec<NodeId> = std::iter::from_fn(|| queue.pop()).map(|task| task.node).collect();
        assert_eq!(order, vec![NodeId(7), NodeId(1), NodeId(2)]);
    }

    #[test]
    fn test_ties_broken_by_node_id() {
        let mut queue = PriorityWorkQueue::new();
        queue.extend([
            PrioritizedTask::new(NodeId(9), 3),
            PrioritizedTask::new(NodeId(4), 3),
            PrioritizedTask::new(NodeId(6), 3),
        ]);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.peek().map(|task| task.node), Some(NodeId(4)));
        assert_eq!(queue.pop().map(|task| task.node), Some(NodeId(4)));
        assert_eq!(queue.pop().map(|task| task.node), Some(NodeId(6)));
        assert_eq!(queue.pop().map(|task| task.node), Some(NodeId(9)));
        assert!(queue.is_empty());
    }
}
