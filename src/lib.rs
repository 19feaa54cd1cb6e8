pub mod bidirected_graph;
pub mod bidirected_ops;
pub mod haplotype_index;
pub mod node_mapping;
pub mod path_index;
pub mod phase_unfolder;
