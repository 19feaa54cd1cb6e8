use crate::bidirected_graph::{reverse_complement_walk, BiPath, Handle};
use crate::bidirected_ops::BidirectedGraph;
use crate::haplotype_index::{HaplotypeIndex, SearchState, ENDMARKER};
use crate::node_mapping::NodeMapping;
use crate::path_index::PathIndex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// An oriented walk through the graph
pub type Walk = Vec<Handle>;

/// A haplotype search cursor together with the walk matched so far
type ThreadState = (SearchState, Walk);

/// Transforms the pruned subregions of the input graph into collections of
/// disconnected distinct traversal haplotypes. Use in combination with
/// pruning to simplify the graph for indexing without losing observed
/// variation. Requires a path index of the original graph and a haplotype
/// index over the same node ids (which may be empty).
///
/// A border-to-border walk is a) a walk from a border node to another border
/// node containing no other border nodes; or b) a maximal walk starting from
/// a border node and encountering no other border nodes. Only walks of
/// length >= 2 are considered.
pub struct PhaseUnfolder<'a> {
    path_index: &'a PathIndex,
    haplotypes: &'a HaplotypeIndex,

    /// Mapping from duplicated node ids to original ids
    mapping: NodeMapping,

    /// Internal data structures for the current component
    border: HashSet<usize>,
    states: Vec<ThreadState>,

    /// Tries for the unfolded prefixes and reverse suffixes.
    /// prefixes[(from, to)] is the duplicate for to, and
    /// suffixes[(from, to)] is the duplicate for from.
    prefixes: HashMap<(Handle, Handle), Handle>,
    suffixes: HashMap<(Handle, Handle), Handle>,
    crossing_edges: HashSet<(Handle, Handle)>,
}

impl<'a> PhaseUnfolder<'a> {
    /// Make a new unfolder backed by the given indexes. They must represent
    /// the same original graph. `next_node` should usually be
    /// `max_node_id() + 1` in the original graph.
    pub fn new(
        path_index: &'a PathIndex,
        haplotypes: &'a HaplotypeIndex,
        next_node: usize,
    ) -> Self {
        PhaseUnfolder {
            path_index,
            haplotypes,
            mapping: NodeMapping::new(next_node),
            border: HashSet::new(),
            states: Vec::new(),
            prefixes: HashMap::new(),
            suffixes: HashMap::new(),
            crossing_edges: HashSet::new(),
        }
    }

    /// Unfold the pruned regions in the input graph:
    ///
    /// - Determine the connected components of edges missing from the input
    ///   graph, as implied by the reference paths and haplotype threads.
    /// - For each component, find all border-to-border walks supported by
    ///   the indexes, and unfold the component by duplicating nodes so that
    ///   the walks are disjoint except for their endpoints.
    /// - Extend the input graph with the unfolded components.
    pub fn unfold(&mut self, graph: &mut BidirectedGraph, show_progress: bool) {
        let components = self.complement_components(graph, show_progress);

        let mut unfolded = BidirectedGraph::new();
        let mut haplotype_walks = 0;
        for component in &components {
            haplotype_walks += self.unfold_component(component, graph, &mut unfolded);
        }
        if show_progress {
            eprintln!(
                "[phase_unfolder] unfolded graph: {} nodes, {} edges on {} walks",
                unfolded.node_count(),
                unfolded.edge_count(),
                haplotype_walks
            );
        }

        graph.extend(&unfolded);
    }

    /// Restore the edges on reference paths. This is effectively the same as
    /// unfolding with an empty haplotype index, except that the inserted
    /// nodes keep their original identifiers.
    pub fn restore_paths(&self, graph: &mut BidirectedGraph, show_progress: bool) {
        let index = self.path_index;
        for rank in 0..index.path_count() {
            let path = index.path(rank);
            if path.steps.is_empty() {
                continue;
            }
            let mut prev = path.steps[0];
            for &curr in &path.steps[1..] {
                if !graph.has_edge(prev, curr) {
                    restore_edge(index, graph, prev, curr);
                }
                prev = curr;
            }
        }

        if show_progress {
            eprintln!(
                "[phase_unfolder] restored graph: {} nodes, {} edges",
                graph.node_count(),
                graph.edge_count()
            );
        }
    }

    /// The original id behind a node id
    pub fn get_mapping(&self, id: usize) -> usize {
        self.mapping.get(id)
    }

    pub fn mapping(&self) -> &NodeMapping {
        &self.mapping
    }

    /// Write the mapping to a file (non-fatal on error)
    pub fn write_mapping(&self, path: &str) {
        self.mapping.write_to_file(path);
    }

    /// Replace the mapping with one loaded from a file (non-fatal on error).
    /// Use before calling `unfold`; new duplicate ids follow the loaded ones.
    pub fn read_mapping(&mut self, path: &str) {
        self.mapping.read_from_file(path);
    }

    /// Generate a graph of the edges that appear in the evidence but not in
    /// the input graph, split into disjoint components.
    pub fn complement_components(
        &self,
        graph: &BidirectedGraph,
        show_progress: bool,
    ) -> Vec<BidirectedGraph> {
        let mut complement = BidirectedGraph::new();

        // Missing edges supported by the reference paths.
        let index = self.path_index;
        for rank in 0..index.path_count() {
            let path = index.path(rank);
            if path.steps.is_empty() {
                continue;
            }
            let mut prev = path.steps[0];
            for &curr in &path.steps[1..] {
                if !graph.has_edge(prev, curr) {
                    self.add_complement_edge(&mut complement, prev, curr);
                }
                prev = curr;
            }
        }

        // Missing edges supported by the haplotype threads.
        for from in self.haplotypes.handles() {
            for to in self.haplotypes.successors(from) {
                if to == ENDMARKER {
                    continue;
                }
                if !graph.has_edge(from, to) {
                    self.add_complement_edge(&mut complement, from, to);
                }
            }
        }

        let components = complement.disjoint_components();
        if show_progress {
            eprintln!(
                "[phase_unfolder] complement graph: {} nodes, {} edges in {} components",
                complement.node_count(),
                complement.edge_count(),
                components.len()
            );
        }
        components
    }

    /// Insert an evidence edge and its endpoint nodes into the complement.
    /// An endpoint the path index cannot resolve is inconsistent evidence:
    /// log and skip without touching the mapping.
    fn add_complement_edge(&self, complement: &mut BidirectedGraph, from: Handle, to: Handle) {
        match (
            self.path_index.binode(from.node_id()),
            self.path_index.binode(to.node_id()),
        ) {
            (Some(from_node), Some(to_node)) => {
                complement.add_binode(from_node);
                complement.add_binode(to_node);
                complement.add_edge(from, to);
            }
            _ => eprintln!(
                "[phase_unfolder] evidence edge {} -> {} is not resolvable in the path index, skipping",
                from, to
            ),
        }
    }

    /// Generate all border-to-border walks in the component supported by the
    /// indexes, unfold them through the tries, and materialize the result.
    /// Returns the number of distinct canonical walks (crossing edges).
    fn unfold_component(
        &mut self,
        component: &BidirectedGraph,
        graph: &BidirectedGraph,
        unfolded: &mut BidirectedGraph,
    ) -> usize {
        // Border nodes are shared between the component and the graph.
        self.border = component
            .nodes
            .keys()
            .filter(|id| graph.has_node(**id))
            .copied()
            .collect();

        let mut border_ids: Vec<usize> = self.border.iter().copied().collect();
        border_ids.sort_unstable();
        for from in border_ids {
            self.generate_paths(component, from);
            self.generate_threads(component, from);
        }

        // Create the unfolded component from the tries.
        for (&(from, _), &to) in &self.prefixes {
            self.insert_node(unfolded, from);
            self.insert_node(unfolded, to);
            unfolded.add_edge(from, to);
        }
        for (&(_, to), &from) in &self.suffixes {
            self.insert_node(unfolded, from);
            self.insert_node(unfolded, to);
            unfolded.add_edge(from, to);
        }
        for &(from, to) in &self.crossing_edges {
            self.insert_node(unfolded, from);
            self.insert_node(unfolded, to);
            unfolded.add_edge(from, to);
        }

        let haplotype_walks = self.crossing_edges.len();
        self.border.clear();
        self.prefixes.clear();
        self.suffixes.clear();
        self.crossing_edges.clear();
        haplotype_walks
    }

    /// Add a node to the unfolded graph: the sequence comes from the
    /// ORIGINAL id behind the handle, the id is the duplicate id it carries.
    fn insert_node(&self, unfolded: &mut BidirectedGraph, handle: Handle) {
        let id = handle.node_id();
        if unfolded.has_node(id) {
            return;
        }
        let original_id = self.mapping.get(id);
        match self.path_index.binode(original_id) {
            Some(mut node) => {
                node.id = id;
                unfolded.add_binode(node);
            }
            None => eprintln!(
                "[phase_unfolder] node {} has no sequence in the path index, skipping",
                original_id
            ),
        }
    }

    /// Walks from the reference paths: for every occurrence of the border
    /// node on a path, extend forward along the path and backward with
    /// flipped orientations, within the component, until another border node
    /// or a missing component edge.
    fn generate_paths(&mut self, component: &BidirectedGraph, from: usize) {
        let index = self.path_index;
        for rank in 0..index.path_count() {
            let path = index.path(rank);

            for &occurrence in index.node_ranks_in_path(from, rank) {
                // Forward.
                {
                    let mut prev = path.steps[occurrence];
                    let mut buffer: Walk = vec![prev];
                    for &curr in &path.steps[occurrence + 1..] {
                        if !component.has_edge(prev, curr) {
                            break; // Found a maximal walk.
                        }
                        buffer.push(curr);
                        if self.border.contains(&curr.node_id()) {
                            break; // Found a border-to-border walk.
                        }
                        prev = curr;
                    }
                    self.insert_walk(&buffer);
                }

                // Backward.
                {
                    let mut prev = path.steps[occurrence].flip();
                    let mut buffer: Walk = vec![prev];
                    for i in (0..occurrence).rev() {
                        let curr = path.steps[i].flip();
                        if !component.has_edge(prev, curr) {
                            break; // Found a maximal walk.
                        }
                        buffer.push(curr);
                        if self.border.contains(&curr.node_id()) {
                            break; // Found a border-to-border walk.
                        }
                        prev = curr;
                    }
                    self.insert_walk(&buffer);
                }
            }
        }
    }

    /// Walks from the haplotype threads: depth-first search over search
    /// states, extending along component edges compatible with the current
    /// head orientation. Emits border-to-border walks and maximal walks
    /// (dead ends within the evidence).
    fn generate_threads(&mut self, component: &BidirectedGraph, from: usize) {
        self.create_state(from, false);
        self.create_state(from, true);

        while let Some((search, walk)) = self.states.pop() {
            let node = search.node.node_id();
            let is_reverse = search.node.is_reverse();

            if walk.len() >= 2 && self.border.contains(&node) {
                self.insert_walk(&walk); // Border-to-border walk.
                continue;
            }

            let mut was_extended = false;
            for edge in component.edges_of(node) {
                if edge.from.node_id() == node && edge.from.is_reverse() == is_reverse {
                    was_extended |= self.extend_state(&search, &walk, edge.to);
                } else if edge.to.node_id() == node && edge.to.is_reverse() != is_reverse {
                    was_extended |= self.extend_state(&search, &walk, edge.from.flip());
                }
            }

            if !was_extended {
                self.insert_walk(&walk); // Maximal walk.
            }
        }
    }

    /// Create a search state from the given node orientation and stack it
    /// if the haplotype index supports it.
    fn create_state(&mut self, node: usize, is_reverse: bool) {
        let handle = Handle::new(node, is_reverse);
        let search = self.haplotypes.find(handle);
        if search.is_empty() {
            return;
        }
        self.states.push((search, vec![handle]));
    }

    /// Extend the state with the given handle and stack the extension if it
    /// is supported by the haplotype index.
    fn extend_state(&mut self, search: &SearchState, walk: &Walk, next: Handle) -> bool {
        let extended = self.haplotypes.extend(search, next);
        if extended.is_empty() {
            return false;
        }
        let mut extended_walk = walk.clone();
        extended_walk.push(next);
        self.states.push((extended, extended_walk));
        true
    }

    /// Insert the walk into the tries in its canonical orientation.
    ///
    /// The walk is broken in half. For each prefix / suffix step, reuse the
    /// existing duplicate of the next node or allocate a new one through the
    /// mapping. Finally a crossing edge joins the full prefix to the full
    /// suffix.
    pub fn insert_walk(&mut self, walk: &[Handle]) {
        if walk.len() < 2 {
            return;
        }
        let rc = reverse_complement_walk(walk);
        let to_insert: &[Handle] = if walk <= rc.as_slice() { walk } else { &rc };

        let len = to_insert.len();
        let mid = (len + 1) / 2;

        // Prefixes.
        let mut from = to_insert[0];
        for i in 1..mid {
            let key = (from, to_insert[i]);
            from = match self.prefixes.get(&key) {
                Some(&duplicate) => duplicate,
                None => {
                    let new_id = self.mapping.insert(to_insert[i].node_id());
                    let duplicate = Handle::new(new_id, to_insert[i].is_reverse());
                    self.prefixes.insert(key, duplicate);
                    duplicate
                }
            };
        }

        // Suffixes, from the tail inward.
        let mut to = to_insert[len - 1];
        for i in (mid..len - 1).rev() {
            let key = (to_insert[i], to);
            to = match self.suffixes.get(&key) {
                Some(&duplicate) => duplicate,
                None => {
                    let new_id = self.mapping.insert(to_insert[i].node_id());
                    let duplicate = Handle::new(new_id, to_insert[i].is_reverse());
                    self.suffixes.insert(key, duplicate);
                    duplicate
                }
            };
        }

        // Crossing edge.
        self.crossing_edges.insert((from, to));
    }

    /// Verify that the graph contains the reference paths and the haplotype
    /// threads of the backing indexes, modulo duplication. Returns the
    /// number of walks for which the verification failed. Walks are checked
    /// in parallel against the immutable graph.
    pub fn verify_paths(&self, unfolded: &BidirectedGraph) -> usize {
        // Mapping from original id -> candidate ids in the graph.
        let mut reverse_mapping: HashMap<usize, Vec<usize>> = HashMap::new();
        for duplicate in self.mapping.first_node()..self.mapping.next_node() {
            let original_id = self.mapping.get(duplicate);
            let candidates = reverse_mapping.entry(original_id).or_default();
            candidates.push(duplicate);
            if unfolded.has_node(original_id) {
                candidates.push(original_id);
            }
        }
        for candidates in reverse_mapping.values_mut() {
            candidates.sort_unstable();
            candidates.dedup();
        }

        let path_count = self.path_index.path_count();
        let total_walks = path_count + self.haplotypes.sequences();
        let failures = AtomicUsize::new(0);

        (0..total_walks).into_par_iter().for_each(|i| {
            let ok = if i < path_count {
                verify_walk(self.path_index.path(i), unfolded, &reverse_mapping)
            } else {
                verify_walk(
                    self.haplotypes.extract(i - path_count),
                    unfolded,
                    &reverse_mapping,
                )
            };
            if !ok {
                failures.fetch_add(1, Ordering::Relaxed);
            }
        });

        failures.into_inner()
    }
}

/// Add a reference-path edge back to the graph with its ORIGINAL ids.
fn restore_edge(index: &PathIndex, graph: &mut BidirectedGraph, from: Handle, to: Handle) {
    match (index.binode(from.node_id()), index.binode(to.node_id())) {
        (Some(from_node), Some(to_node)) => {
            if !graph.has_node(from_node.id) {
                graph.add_binode(from_node);
            }
            if !graph.has_node(to_node.id) {
                graph.add_binode(to_node);
            }
            graph.add_edge(from, to);
        }
        _ => eprintln!(
            "[phase_unfolder] path edge {} -> {} is not resolvable in the path index, skipping",
            from, to
        ),
    }
}

/// The two walk shapes the verifier sees: reference paths and extracted
/// haplotype sequences.
pub trait WalkLike: Sync {
    fn len(&self) -> usize;
    fn node(&self, i: usize) -> usize;
    fn is_reverse(&self, i: usize) -> bool;
}

impl WalkLike for BiPath {
    fn len(&self) -> usize {
        self.steps.len()
    }
    fn node(&self, i: usize) -> usize {
        self.steps[i].node_id()
    }
    fn is_reverse(&self, i: usize) -> bool {
        self.steps[i].is_reverse()
    }
}

impl WalkLike for [Handle] {
    fn len(&self) -> usize {
        <[Handle]>::len(self)
    }
    fn node(&self, i: usize) -> usize {
        self[i].node_id()
    }
    fn is_reverse(&self, i: usize) -> bool {
        self[i].is_reverse()
    }
}

/// A branching point of the verification search: which candidate to choose
/// at `offset`, and which at `offset + 1`.
#[derive(Clone, Copy, Debug)]
struct WalkBranch {
    offset: usize,
    curr: usize,
    next: usize,
}

impl WalkBranch {
    fn advance(&mut self) {
        self.offset += 1;
        self.curr = self.next;
        self.next = 0;
    }
}

/// Check that a walk is realized in the graph through some choice of
/// duplicates. All unexplored branches can be discarded whenever the graph
/// contains only one candidate for the next node: every successful
/// completion must route through it.
fn verify_walk<W: WalkLike + ?Sized>(
    walk: &W,
    graph: &BidirectedGraph,
    reverse_mapping: &HashMap<usize, Vec<usize>>,
) -> bool {
    if walk.len() < 2 {
        return true;
    }

    let mut branches = vec![WalkBranch {
        offset: 0,
        curr: 0,
        next: 0,
    }];
    while let Some(mut branch) = branches.pop() {
        let mut curr_duplicates = 0;
        let mut node_id = walk.node(branch.offset);
        if let Some(duplicates) = reverse_mapping.get(&node_id) {
            curr_duplicates = duplicates.len();
            node_id = duplicates[branch.curr];
        }

        // Extend the walk from the current branch.
        let mut curr = Handle::new(node_id, walk.is_reverse(branch.offset));
        while branch.offset + 1 < walk.len() {
            let mut next_duplicates = 0;
            let mut node_id = walk.node(branch.offset + 1);
            match reverse_mapping.get(&node_id) {
                Some(duplicates) => {
                    next_duplicates = duplicates.len();
                    node_id = duplicates[branch.next];
                    if branch.next + 1 < duplicates.len() {
                        branches.push(WalkBranch {
                            offset: branch.offset,
                            curr: branch.curr,
                            next: branch.next + 1,
                        });
                    } else if branch.curr + 1 < curr_duplicates {
                        branches.push(WalkBranch {
                            offset: branch.offset,
                            curr: branch.curr + 1,
                            next: 0,
                        });
                    }
                }
                None => {
                    if branch.curr + 1 < curr_duplicates {
                        branches.push(WalkBranch {
                            offset: branch.offset,
                            curr: branch.curr + 1,
                            next: 0,
                        });
                    }
                }
            }
            let next = Handle::new(node_id, walk.is_reverse(branch.offset + 1));
            if !graph.has_edge(curr, next) {
                break;
            }
            if next_duplicates <= 1 {
                // Every completion must go through the next node.
                branches.clear();
            }
            curr = next;
            curr_duplicates = next_duplicates;
            branch.advance();
        }
        if branch.offset + 1 >= walk.len() {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_indexes() -> (PathIndex, HaplotypeIndex) {
        let graph = BidirectedGraph::new();
        (PathIndex::from_graph(&graph), HaplotypeIndex::new())
    }

    fn walk(steps: &[(usize, bool)]) -> Walk {
        steps
            .iter()
            .map(|&(id, is_reverse)| Handle::new(id, is_reverse))
            .collect()
    }

    #[test]
    fn test_short_walks_discarded() {
        let (index, haplotypes) = empty_indexes();
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&[]);
        unfolder.insert_walk(&[Handle::forward(1)]);
        assert!(unfolder.prefixes.is_empty());
        assert!(unfolder.suffixes.is_empty());
        assert!(unfolder.crossing_edges.is_empty());
        assert_eq!(unfolder.mapping.size(), 0);
    }

    #[test]
    fn test_split_arithmetic() {
        let (index, haplotypes) = empty_indexes();

        // Length 2: no trie entries, just the crossing edge.
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&walk(&[(1, false), (2, false)]));
        assert_eq!(unfolder.prefixes.len(), 0);
        assert_eq!(unfolder.suffixes.len(), 0);
        assert_eq!(unfolder.crossing_edges.len(), 1);
        assert_eq!(unfolder.mapping.size(), 0);

        // Length 3: one prefix entry, no suffix entries.
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&walk(&[(1, false), (2, false), (3, false)]));
        assert_eq!(unfolder.prefixes.len(), 1);
        assert_eq!(unfolder.suffixes.len(), 0);
        assert_eq!(unfolder.crossing_edges.len(), 1);
        assert_eq!(unfolder.mapping.size(), 1);

        // Length 4: one prefix, one suffix.
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&walk(&[(1, false), (2, false), (3, false), (4, false)]));
        assert_eq!(unfolder.prefixes.len(), 1);
        assert_eq!(unfolder.suffixes.len(), 1);
        assert_eq!(unfolder.crossing_edges.len(), 1);
        assert_eq!(unfolder.mapping.size(), 2);

        // Length 5: two prefixes, one suffix.
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&walk(&[
            (1, false),
            (2, false),
            (3, false),
            (4, false),
            (5, false),
        ]));
        assert_eq!(unfolder.prefixes.len(), 2);
        assert_eq!(unfolder.suffixes.len(), 1);
        assert_eq!(unfolder.crossing_edges.len(), 1);
        assert_eq!(unfolder.mapping.size(), 3);
    }

    #[test]
    fn test_duplicate_preserves_orientation_and_mapping() {
        let (index, haplotypes) = empty_indexes();
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        // Canonical orientation of this walk is itself.
        unfolder.insert_walk(&walk(&[(1, false), (2, true), (3, false)]));

        let (&(from, original), &duplicate) = unfolder.prefixes.iter().next().unwrap();
        assert_eq!(from, Handle::forward(1));
        assert_eq!(original, Handle::reverse(2));
        assert!(duplicate.is_reverse());
        assert!(duplicate.node_id() >= 10);
        assert_eq!(unfolder.mapping.get(duplicate.node_id()), 2);
    }

    #[test]
    fn test_orientation_symmetry() {
        let (index, haplotypes) = empty_indexes();
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        let forward = walk(&[(1, false), (2, false), (3, true), (4, false)]);

        unfolder.insert_walk(&forward);
        let prefixes = unfolder.prefixes.clone();
        let suffixes = unfolder.suffixes.clone();
        let crossing = unfolder.crossing_edges.clone();
        let allocated = unfolder.mapping.size();

        // Inserting the reverse complement must not change anything.
        unfolder.insert_walk(&reverse_complement_walk(&forward));
        assert_eq!(unfolder.prefixes, prefixes);
        assert_eq!(unfolder.suffixes, suffixes);
        assert_eq!(unfolder.crossing_edges, crossing);
        assert_eq!(unfolder.mapping.size(), allocated);
    }

    #[test]
    fn test_shared_prefix_shares_duplicates() {
        let (index, haplotypes) = empty_indexes();
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        unfolder.insert_walk(&walk(&[
            (1, false),
            (2, false),
            (3, false),
            (4, false),
            (5, false),
        ]));
        unfolder.insert_walk(&walk(&[
            (1, false),
            (2, false),
            (6, false),
            (7, false),
            (5, false),
        ]));

        // The common first step shares one prefix entry and its duplicate.
        assert_eq!(unfolder.prefixes.len(), 3);
        assert_eq!(unfolder.suffixes.len(), 2);
        assert_eq!(unfolder.crossing_edges.len(), 2);
        assert_eq!(unfolder.mapping.size(), 5);
    }

    #[test]
    fn test_self_loop_walk_is_split() {
        let (index, haplotypes) = empty_indexes();
        let mut unfolder = PhaseUnfolder::new(&index, &haplotypes, 10);
        // First and last ids are equal; the walk is still duplicated.
        unfolder.insert_walk(&walk(&[(1, false), (2, false), (1, false)]));
        assert_eq!(unfolder.prefixes.len(), 1);
        assert_eq!(unfolder.crossing_edges.len(), 1);
        assert_eq!(unfolder.mapping.size(), 1);
        assert_eq!(
            unfolder.mapping.get(unfolder.mapping.first_node()),
            2
        );
    }

    #[test]
    fn test_verify_walk_without_duplicates() {
        let mut graph = BidirectedGraph::new();
        graph.add_node(1, b"A".to_vec());
        graph.add_node(2, b"C".to_vec());
        graph.add_node(3, b"G".to_vec());
        graph.add_edge(Handle::forward(1), Handle::forward(2));
        graph.add_edge(Handle::forward(2), Handle::forward(3));

        let reverse_mapping = HashMap::new();
        let ok_walk = walk(&[(1, false), (2, false), (3, false)]);
        assert!(verify_walk(ok_walk.as_slice(), &graph, &reverse_mapping));

        let bad_walk = walk(&[(1, false), (3, false)]);
        assert!(!verify_walk(bad_walk.as_slice(), &graph, &reverse_mapping));
    }

    #[test]
    fn test_verify_walk_through_duplicates() {
        // Node 2 was duplicated as 10 and 11; only 10 is on the chain.
        let mut graph = BidirectedGraph::new();
        graph.add_node(1, b"A".to_vec());
        graph.add_node(10, b"C".to_vec());
        graph.add_node(11, b"C".to_vec());
        graph.add_node(3, b"G".to_vec());
        graph.add_edge(Handle::forward(1), Handle::forward(10));
        graph.add_edge(Handle::forward(10), Handle::forward(3));
        graph.add_edge(Handle::forward(3), Handle::forward(11));

        let mut reverse_mapping = HashMap::new();
        reverse_mapping.insert(2, vec![10, 11]);

        let evidence = walk(&[(1, false), (2, false), (3, false)]);
        assert!(verify_walk(evidence.as_slice(), &graph, &reverse_mapping));

        let missing = walk(&[(1, false), (2, false), (2, false)]);
        assert!(!verify_walk(missing.as_slice(), &graph, &reverse_mapping));
    }

    #[test]
    fn test_verify_walk_single_candidate_commits() {
        // The middle node was never duplicated: the search must stay linear
        // and still succeed.
        let mut graph = BidirectedGraph::new();
        for id in 1..=4 {
            graph.add_node(id, b"A".to_vec());
        }
        graph.add_edge(Handle::forward(1), Handle::forward(2));
        graph.add_edge(Handle::forward(2), Handle::forward(3));
        graph.add_edge(Handle::forward(3), Handle::forward(4));

        let mut reverse_mapping = HashMap::new();
        // Node 1 has two candidates but only the original is connected.
        reverse_mapping.insert(1, vec![1, 99]);

        let evidence = walk(&[(1, false), (2, false), (3, false), (4, false)]);
        assert!(verify_walk(evidence.as_slice(), &graph, &reverse_mapping));
    }
}
