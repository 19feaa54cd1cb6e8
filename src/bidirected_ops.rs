use crate::bidirected_graph::{BiEdge, BiNode, BiPath, Handle};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use uf_rush::UFRush;

/// A mutable bidirected variation graph: nodes carry DNA sequences, edges
/// connect oriented node handles, and named paths record observed walks.
#[derive(Clone, Default)]
pub struct BidirectedGraph {
    pub nodes: HashMap<usize, BiNode>,
    pub edges: HashSet<BiEdge>,
    pub paths: Vec<BiPath>,
}

impl BidirectedGraph {
    pub fn new() -> Self {
        BidirectedGraph {
            nodes: HashMap::new(),
            edges: HashSet::new(),
            paths: Vec::new(),
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, id: usize, sequence: Vec<u8>) {
        self.nodes.insert(id, BiNode::new(id, sequence));
    }

    /// Add a node from an existing node descriptor
    pub fn add_binode(&mut self, node: BiNode) {
        self.nodes.insert(node.id, node);
    }

    /// Add an edge to the graph
    pub fn add_edge(&mut self, from: Handle, to: Handle) {
        let edge = BiEdge::new(from, to);

        // A bidirected edge and its complement are the same link; store one.
        if !self.edges.contains(&edge) && !self.edges.contains(&edge.complement()) {
            self.edges.insert(edge);
        }
    }

    /// Check if a node with the given id is present
    pub fn has_node(&self, id: usize) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Check if an edge exists (checking both the edge and its complement)
    pub fn has_edge(&self, from: Handle, to: Handle) -> bool {
        let edge = BiEdge::new(from, to);
        self.edges.contains(&edge) || self.edges.contains(&edge.complement())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Largest node id present, or 0 for an empty graph
    pub fn max_node_id(&self) -> usize {
        self.nodes.keys().copied().max().unwrap_or(0)
    }

    /// Get sequence for a handle (forward or reverse complement)
    pub fn get_sequence(&self, handle: Handle) -> Option<Vec<u8>> {
        self.nodes
            .get(&handle.node_id())
            .map(|node| node.get_sequence(handle.is_reverse()))
    }

    /// All stored edges incident to the given node id, in stored orientation
    pub fn edges_of(&self, id: usize) -> Vec<BiEdge> {
        self.edges
            .iter()
            .filter(|edge| edge.from.node_id() == id || edge.to.node_id() == id)
            .copied()
            .collect()
    }

    /// Build a path from a sequence of node IDs with orientations
    pub fn build_path(&mut self, name: String, steps: Vec<(usize, bool)>) {
        let mut path = BiPath::new(name);
        for (node_id, is_reverse) in steps {
            path.add_step(Handle::new(node_id, is_reverse));
        }
        self.paths.push(path);
    }

    /// Merge another graph into this one. Nodes are unified by id; edges are
    /// deduplicated against their complements. Paths are not merged.
    pub fn extend(&mut self, other: &BidirectedGraph) {
        for (id, node) in &other.nodes {
            if !self.nodes.contains_key(id) {
                self.nodes.insert(*id, node.clone());
            }
        }
        for edge in &other.edges {
            self.add_edge(edge.from, edge.to);
        }
    }

    /// Split into weakly connected components, ignoring edge orientation.
    /// Components come back ordered by their smallest node id; paths are
    /// not carried into the pieces.
    pub fn disjoint_components(&self) -> Vec<BidirectedGraph> {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let uf = UFRush::new(self.max_node_id() + 1);
        for edge in &self.edges {
            uf.unite(edge.from.node_id(), edge.to.node_id());
        }

        let mut by_root: HashMap<usize, BidirectedGraph> = HashMap::new();
        for (id, node) in &self.nodes {
            by_root
                .entry(uf.find(*id))
                .or_insert_with(BidirectedGraph::new)
                .add_binode(node.clone());
        }
        for edge in &self.edges {
            if let Some(component) = by_root.get_mut(&uf.find(edge.from.node_id())) {
                component.edges.insert(*edge);
            }
        }

        let mut components: Vec<BidirectedGraph> = by_root.into_values().collect();
        components.sort_by_key(|c| c.nodes.keys().copied().min().unwrap_or(0));
        components
    }

    /// Read a graph from GFA (S, L and P lines; other lines are ignored).
    /// Malformed lines are skipped with a diagnostic on standard error.
    pub fn read_gfa<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut graph = BidirectedGraph::new();

        for line in reader.lines() {
            let line = line?;
            if line.starts_with("S\t") {
                let fields: Vec<&str> = line.splitn(4, '\t').collect();
                if fields.len() < 3 {
                    eprintln!("[gfa] skipping malformed S line: {}", line);
                    continue;
                }
                match fields[1].parse::<usize>() {
                    Ok(id) => graph.add_node(id, fields[2].as_bytes().to_vec()),
                    Err(_) => eprintln!("[gfa] skipping S line with non-numeric id: {}", line),
                }
            } else if line.starts_with("L\t") {
                let fields: Vec<&str> = line.splitn(7, '\t').collect();
                if fields.len() < 5 {
                    eprintln!("[gfa] skipping malformed L line: {}", line);
                    continue;
                }
                let from = parse_oriented(fields[1], fields[2]);
                let to = parse_oriented(fields[3], fields[4]);
                match (from, to) {
                    (Some(from), Some(to)) => graph.add_edge(from, to),
                    _ => eprintln!("[gfa] skipping malformed L line: {}", line),
                }
            } else if line.starts_with("P\t") {
                let fields: Vec<&str> = line.splitn(4, '\t').collect();
                if fields.len() < 3 {
                    eprintln!("[gfa] skipping malformed P line: {}", line);
                    continue;
                }
                match parse_walk(fields[2]) {
                    Some(steps) => {
                        let mut path = BiPath::new(fields[1].to_string());
                        path.steps = steps;
                        graph.paths.push(path);
                    }
                    None => eprintln!("[gfa] skipping malformed P line: {}", line),
                }
            }
        }

        Ok(graph)
    }

    /// Read a graph from a GFA file
    pub fn from_gfa_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Self::read_gfa(BufReader::new(file))
    }

    /// Write graph in GFA format with proper orientations
    pub fn write_gfa<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "H\tVN:Z:1.0")?;

        let mut node_ids: Vec<_> = self.nodes.keys().copied().collect();
        node_ids.sort_unstable();
        for node_id in node_ids {
            if let Some(node) = self.nodes.get(&node_id) {
                let seq_str = String::from_utf8_lossy(&node.sequence);
                writeln!(writer, "S\t{}\t{}", node_id, seq_str)?;
            }
        }

        // Do not canonicalize edges when writing: if 2+ -> 3+ is stored,
        // also emitting 2- -> 3- would violate the bidirected graph property.
        let mut edges: Vec<_> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        for edge in edges {
            writeln!(
                writer,
                "L\t{}\t{}\t{}\t{}\t0M",
                edge.from.node_id(),
                edge.from.orientation_char(),
                edge.to.node_id(),
                edge.to.orientation_char()
            )?;
        }

        for path in &self.paths {
            let steps: Vec<String> = path.steps.iter().map(|h| h.to_string()).collect();
            writeln!(writer, "P\t{}\t{}\t*", path.name, steps.join(","))?;
        }

        Ok(())
    }

    /// Write the graph to a GFA file
    pub fn write_gfa_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_gfa(&mut writer)
    }
}

fn parse_oriented(id: &str, orientation: &str) -> Option<Handle> {
    let id = id.parse::<usize>().ok()?;
    match orientation {
        "+" => Some(Handle::forward(id)),
        "-" => Some(Handle::reverse(id)),
        _ => None,
    }
}

/// Parse a comma-separated oriented walk like `1+,2-,3+`
pub fn parse_walk(text: &str) -> Option<Vec<Handle>> {
    let mut steps = Vec::new();
    for step in text.split(',') {
        let step = step.trim();
        if step.len() < 2 {
            return None;
        }
        let (id, orientation) = step.split_at(step.len() - 1);
        steps.push(parse_oriented(id, orientation)?);
    }
    Some(steps)
}
