//! Execution ordering.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction as EdgeDirection;

use super::arena::NodeKey;

/// How the graph orders nodes for processing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionOrder {
    /// Nodes run in the order they were created. A connection from a later
    /// node to an earlier one reads the previous block's output.
    #[default]
    Registration,
    /// Every producer runs before its consumers. Ties keep registration
    /// order. Nodes that delay their input run first and edges into them are
    /// ignored, so feedback through a delay is allowed. A cycle falls back
    /// to registration order.
    Topological,
}

/// Stable topological sort of `nodes` (given in registration order).
///
/// `edges` are `(producer, consumer)` pairs. On a cycle, returns the nodes
/// involved in it instead.
pub(crate) fn topological(
    nodes: &[NodeKey],
    edges: impl IntoIterator<Item = (NodeKey, NodeKey)>,
    delays_input: impl Fn(NodeKey) -> bool,
) -> Result<Vec<NodeKey>, Vec<NodeKey>> {
    let mut graph = DiGraph::<NodeKey, ()>::with_capacity(nodes.len(), nodes.len());
    let indices: hashbrown::HashMap<NodeKey, NodeIndex> = nodes.iter().map(|&key| (key, graph.add_node(key))).collect();
    let delayed: Vec<bool> = nodes.iter().map(|&key| delays_input(key)).collect();

    for (from, to) in edges {
        if let (Some(&a), Some(&b)) = (indices.get(&from), indices.get(&to)) {
            if !delayed[b.index()] {
                graph.add_edge(a, b, ());
            }
        }
    }

    // Kahn's algorithm with a min-heap on (not a delay, registration
    // position). Node indices were assigned in registration order. Delays
    // have no ordering inputs, so they all run before anything that could
    // feed them.
    let mut indegree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.edges_directed(n, EdgeDirection::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<(bool, usize)>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == 0)
        .map(|(i, _)| Reverse((!delayed[i], i)))
        .collect();

    let mut sorted = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, i))) = ready.pop() {
        let n = NodeIndex::new(i);
        sorted.push(graph[n]);
        for next in graph.neighbors_directed(n, EdgeDirection::Outgoing) {
            let d = &mut indegree[next.index()];
            *d -= 1;
            if *d == 0 {
                ready.push(Reverse((!delayed[next.index()], next.index())));
            }
        }
    }

    if sorted.len() == nodes.len() {
        return Ok(sorted);
    }

    let cycle = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .flatten()
        .map(|n| graph[n])
        .collect();
    Err(cycle)
}
