use crate::bidirected_graph::{reverse_complement_walk, Handle};
use crate::bidirected_ops::BidirectedGraph;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sentinel successor marking the end of a thread. Real node ids start at 1,
/// so the packed-zero handle is never a graph position.
pub const ENDMARKER: Handle = Handle::from_u64(0);

/// A prefix-search cursor: the handle the matched prefix currently ends on,
/// plus every position in the index where such a prefix ends.
#[derive(Clone, Debug)]
pub struct SearchState {
    pub node: Handle,
    matches: Vec<(usize, usize)>,
}

impl SearchState {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }
}

/// Immutable index of haplotype threads. Like a GBWT it stores BOTH
/// orientations of every inserted thread, so prefix search can follow a
/// haplotype through a region in either direction.
#[derive(Default)]
pub struct HaplotypeIndex {
    sequences: Vec<Vec<Handle>>,
    /// handle -> positions (sequence, offset) where it occurs
    positions: HashMap<Handle, Vec<(usize, usize)>>,
    /// handle -> distinct observed successors, ENDMARKER for thread ends
    successors: BTreeMap<Handle, BTreeSet<Handle>>,
    node_ids: BTreeSet<usize>,
}

impl HaplotypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from the P lines of a GFA file: every path is a thread.
    pub fn from_graph_paths(graph: &BidirectedGraph) -> Self {
        let mut index = Self::new();
        for path in &graph.paths {
            index.insert(path.steps.clone());
        }
        index
    }

    /// Insert a thread. Both the thread and its reverse complement are
    /// indexed. Empty threads are ignored.
    pub fn insert(&mut self, thread: Vec<Handle>) {
        if thread.is_empty() {
            return;
        }
        let rc = reverse_complement_walk(&thread);
        self.insert_oriented(thread);
        self.insert_oriented(rc);
    }

    fn insert_oriented(&mut self, sequence: Vec<Handle>) {
        let seq_id = self.sequences.len();
        for (offset, &handle) in sequence.iter().enumerate() {
            self.positions
                .entry(handle)
                .or_default()
                .push((seq_id, offset));
            self.node_ids.insert(handle.node_id());
            let successor = sequence.get(offset + 1).copied().unwrap_or(ENDMARKER);
            self.successors.entry(handle).or_default().insert(successor);
        }
        self.sequences.push(sequence);
    }

    /// True when no threads have been inserted
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Number of stored oriented sequences (twice the inserted threads)
    pub fn sequences(&self) -> usize {
        self.sequences.len()
    }

    /// The i-th stored oriented sequence
    pub fn extract(&self, i: usize) -> &[Handle] {
        &self.sequences[i]
    }

    /// Search for the single-handle prefix: every position where it occurs
    pub fn find(&self, handle: Handle) -> SearchState {
        SearchState {
            node: handle,
            matches: self.positions.get(&handle).cloned().unwrap_or_default(),
        }
    }

    /// Extend a search state by one handle, keeping the positions whose
    /// thread continues with it.
    pub fn extend(&self, state: &SearchState, handle: Handle) -> SearchState {
        let matches = state
            .matches
            .iter()
            .filter(|&&(seq, offset)| {
                self.sequences[seq].get(offset + 1) == Some(&handle)
            })
            .map(|&(seq, offset)| (seq, offset + 1))
            .collect();
        SearchState {
            node: handle,
            matches,
        }
    }

    /// Distinct successors observed after a handle; ENDMARKER for thread
    /// ends. Callers enumerating edges filter the sentinel.
    pub fn successors(&self, handle: Handle) -> impl Iterator<Item = Handle> + '_ {
        self.successors
            .get(&handle)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// All oriented handles known to the index, in sorted order
    pub fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        self.successors.keys().copied()
    }

    /// Sorted distinct node ids occurring in any thread
    pub fn node_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.node_ids.iter().copied()
    }
}
