use crate::bidirected_graph::{BiNode, BiPath};
use crate::bidirected_ops::BidirectedGraph;
use std::collections::HashMap;

/// Immutable index of the reference paths and node sequences of the
/// ORIGINAL (unpruned) graph. The unfolder queries it for walk evidence
/// and for the sequences of nodes that pruning removed.
pub struct PathIndex {
    paths: Vec<BiPath>,
    /// Per path: node id -> sorted ranks at which the node occurs.
    occurrences: Vec<HashMap<usize, Vec<usize>>>,
    sequences: HashMap<usize, Vec<u8>>,
    max_node_id: usize,
}

impl PathIndex {
    /// Index a graph that carries the original nodes and reference paths.
    pub fn from_graph(graph: &BidirectedGraph) -> Self {
        let mut occurrences = Vec::with_capacity(graph.paths.len());
        for path in &graph.paths {
            let mut by_node: HashMap<usize, Vec<usize>> = HashMap::new();
            for (rank, handle) in path.steps.iter().enumerate() {
                by_node.entry(handle.node_id()).or_default().push(rank);
            }
            occurrences.push(by_node);
        }

        let sequences = graph
            .nodes
            .values()
            .map(|node| (node.id, node.sequence.clone()))
            .collect();

        PathIndex {
            paths: graph.paths.clone(),
            occurrences,
            sequences,
            max_node_id: graph.max_node_id(),
        }
    }

    /// Number of reference paths
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// The path at the given 0-based rank
    pub fn path(&self, rank: usize) -> &BiPath {
        &self.paths[rank]
    }

    pub fn path_name(&self, rank: usize) -> &str {
        &self.paths[rank].name
    }

    /// Sorted ranks at which a node occurs within one path; empty when absent
    pub fn node_ranks_in_path(&self, id: usize, rank: usize) -> &[usize] {
        self.occurrences[rank]
            .get(&id)
            .map(|ranks| ranks.as_slice())
            .unwrap_or(&[])
    }

    /// Original sequence of a node
    pub fn node_seq(&self, id: usize) -> Option<&[u8]> {
        self.sequences.get(&id).map(|seq| seq.as_slice())
    }

    /// Node descriptor for insertion into another graph
    pub fn binode(&self, id: usize) -> Option<BiNode> {
        self.sequences
            .get(&id)
            .map(|seq| BiNode::new(id, seq.clone()))
    }

    /// Largest node id in the original graph
    pub fn max_node_id(&self) -> usize {
        self.max_node_id
    }
}
