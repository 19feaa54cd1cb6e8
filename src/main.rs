use clap::{Parser, Subcommand};
use std::error::Error;

use hapfold::bidirected_ops::BidirectedGraph;
use hapfold::haplotype_index::HaplotypeIndex;
use hapfold::path_index::PathIndex;
use hapfold::phase_unfolder::PhaseUnfolder;

#[derive(Parser)]
#[command(
    name = "hapfold",
    version,
    about = "Restore haplotype-supported regions of a pruned variation graph"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unfold the pruned regions of a graph using reference paths and
    /// haplotype threads, duplicating nodes so that the restored walks are
    /// disjoint except for their endpoints
    Unfold {
        /// Pruned input graph (GFA)
        #[arg(short = 'g', long)]
        graph: String,

        /// Original graph with its reference paths (GFA)
        #[arg(short = 'x', long)]
        original: String,

        /// Haplotype threads, one per P line (GFA)
        #[arg(short = 'H', long)]
        haplotypes: Option<String>,

        /// Output graph (GFA)
        #[arg(short = 'o', long)]
        output: String,

        /// Load the node mapping from this file before unfolding
        #[arg(long)]
        mapping_in: Option<String>,

        /// Write the node mapping to this file after unfolding
        #[arg(long)]
        mapping_out: Option<String>,

        /// Number of threads for verification
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,

        /// Show progress information on standard error
        #[arg(short = 'p', long)]
        progress: bool,

        /// Verify that every path and thread survives the unfolding
        #[arg(long)]
        verify: bool,
    },

    /// Restore the edges on reference paths with their original node ids
    /// (no haplotypes, no duplication)
    Restore {
        /// Pruned input graph (GFA)
        #[arg(short = 'g', long)]
        graph: String,

        /// Original graph with its reference paths (GFA)
        #[arg(short = 'x', long)]
        original: String,

        /// Output graph (GFA)
        #[arg(short = 'o', long)]
        output: String,

        /// Show progress information on standard error
        #[arg(short = 'p', long)]
        progress: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Unfold {
            graph,
            original,
            haplotypes,
            output,
            mapping_in,
            mapping_out,
            threads,
            progress,
            verify,
        } => run_unfold(
            &graph,
            &original,
            haplotypes.as_deref(),
            &output,
            mapping_in.as_deref(),
            mapping_out.as_deref(),
            threads,
            progress,
            verify,
        ),
        Commands::Restore {
            graph,
            original,
            output,
            progress,
        } => run_restore(&graph, &original, &output, progress),
    };

    if let Err(err) = result {
        eprintln!("[hapfold] error: {}", err);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_unfold(
    graph_file: &str,
    original_file: &str,
    haplotype_file: Option<&str>,
    output_file: &str,
    mapping_in: Option<&str>,
    mapping_out: Option<&str>,
    threads: usize,
    progress: bool,
    verify: bool,
) -> Result<(), Box<dyn Error>> {
    let _ = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global();

    let mut graph = BidirectedGraph::from_gfa_file(graph_file)?;
    let original = BidirectedGraph::from_gfa_file(original_file)?;
    let path_index = PathIndex::from_graph(&original);

    let haplotypes = match haplotype_file {
        Some(file) => HaplotypeIndex::from_graph_paths(&BidirectedGraph::from_gfa_file(file)?),
        None => HaplotypeIndex::new(),
    };

    if progress {
        eprintln!(
            "[hapfold] input graph: {} nodes, {} edges; {} reference paths, {} haplotype sequences",
            graph.node_count(),
            graph.edge_count(),
            path_index.path_count(),
            haplotypes.sequences()
        );
    }

    // Duplicate ids start above every id the indexes or the graph know.
    let next_node = path_index.max_node_id().max(graph.max_node_id()) + 1;
    let mut unfolder = PhaseUnfolder::new(&path_index, &haplotypes, next_node);
    if let Some(file) = mapping_in {
        unfolder.read_mapping(file);
    }

    unfolder.unfold(&mut graph, progress);

    if let Some(file) = mapping_out {
        unfolder.write_mapping(file);
    }
    graph.write_gfa_file(output_file)?;

    if verify {
        let failures = unfolder.verify_paths(&graph);
        if failures > 0 {
            return Err(format!("verification failed for {} walks", failures).into());
        }
        if progress {
            eprintln!("[hapfold] verification passed");
        }
    }

    Ok(())
}

fn run_restore(
    graph_file: &str,
    original_file: &str,
    output_file: &str,
    progress: bool,
) -> Result<(), Box<dyn Error>> {
    let mut graph = BidirectedGraph::from_gfa_file(graph_file)?;
    let original = BidirectedGraph::from_gfa_file(original_file)?;
    let path_index = PathIndex::from_graph(&original);
    let haplotypes = HaplotypeIndex::new();

    let next_node = path_index.max_node_id().max(graph.max_node_id()) + 1;
    let unfolder = PhaseUnfolder::new(&path_index, &haplotypes, next_node);
    unfolder.restore_paths(&mut graph, progress);

    graph.write_gfa_file(output_file)?;
    Ok(())
}
