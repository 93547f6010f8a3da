//! Command-line driver for the exact k-partition solver.
//!
//! Generates a random geometric benchmark instance, runs the configured
//! algorithm, and prints the structured run report. A `decompose` command
//! reports how far the preprocessing shrinks an instance without solving it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kpart_algo::{KppSolver, KppSolverConfig, RemovalPolicy};
use kpart_core::{
    decompose, neighbors_of_neighbors, random_geometric_graph, summarize_decomposition,
    ClashGraph,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "kpart", about = "Exact graph k-partition solving via cutting planes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct InstanceArgs {
    /// Number of vertices of the random geometric instance.
    #[arg(long, default_value_t = 40)]
    vertices: usize,

    /// Connection radius of the random geometric instance.
    #[arg(long, default_value_t = 0.25)]
    radius: f64,

    /// Wrap-around (torus) distance.
    #[arg(long)]
    torus: bool,

    /// Also join vertices at distance two (densified instance).
    #[arg(long)]
    second_order: bool,

    /// RNG seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of classes.
    #[arg(short, long, default_value_t = 3)]
    k: usize,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve an instance to proven optimality.
    Solve {
        #[command(flatten)]
        instance: InstanceArgs,

        /// Secondary class count; switches to the two-level variant.
        #[arg(long)]
        k2: Option<usize>,

        /// Decompose the graph before solving.
        #[arg(long)]
        preprocess: bool,

        /// Clique sizes for the y separation phase.
        #[arg(long, value_delimiter = ',')]
        y_cuts: Vec<usize>,

        /// Removal policy after the y phase: 0 keep, 1 drop slack,
        /// 2 drop slack or zero dual.
        #[arg(long, default_value_t = 0)]
        y_cut_removal: u8,

        /// Clique sizes for the yz separation phase (two-level only).
        #[arg(long, value_delimiter = ',')]
        yz_cuts: Vec<usize>,

        /// Clique sizes for the z separation phase (two-level only).
        #[arg(long, value_delimiter = ',')]
        z_cuts: Vec<usize>,

        /// Break class-relabeling symmetry.
        #[arg(long)]
        symmetry_breaking: bool,

        /// Round a fractional y-phase bound up to the next integer.
        #[arg(long)]
        fractional_y_cut: bool,

        /// Emit the report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Report how far decomposition shrinks an instance.
    Decompose {
        #[command(flatten)]
        instance: InstanceArgs,
    },
}

fn removal_policy(level: u8) -> Result<RemovalPolicy> {
    match level {
        0 => Ok(RemovalPolicy::Keep),
        1 => Ok(RemovalPolicy::DropSlack),
        2 => Ok(RemovalPolicy::DropSlackOrZeroDual),
        other => anyhow::bail!("unknown removal level {other} (expected 0, 1 or 2)"),
    }
}

fn build_instance(args: &InstanceArgs) -> ClashGraph {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut graph = random_geometric_graph(args.vertices, args.radius, args.torus, &mut rng);
    if args.second_order {
        graph = neighbors_of_neighbors(&graph);
    }
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "generated instance"
    );
    graph
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve {
            instance,
            k2,
            preprocess,
            y_cuts,
            y_cut_removal,
            yz_cuts,
            z_cuts,
            symmetry_breaking,
            fractional_y_cut,
            json,
        } => {
            let graph = build_instance(&instance);
            let config = KppSolverConfig {
                preprocess,
                y_cut_sizes: y_cuts,
                y_cut_removal: removal_policy(y_cut_removal)?,
                yz_cut_sizes: yz_cuts,
                z_cut_sizes: z_cuts,
                symmetry_breaking,
                fractional_y_cut,
                ..KppSolverConfig::default()
            };
            let solver = KppSolver::new(config).context("invalid configuration")?;
            let report = match k2 {
                Some(k2) => solver.solve_two_level(&graph, instance.k, k2)?,
                None => solver.solve(&graph, instance.k)?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if let Some(pre) = &report.preprocess {
                    println!(
                        "decomposition: {} components, largest {} vertices",
                        pre.components, pre.largest_component
                    );
                }
                for (i, component) in report.components.iter().enumerate() {
                    println!(
                        "component {i}: {} vertices, {} edges, status {}",
                        component.vertices, component.edges, component.solve.status
                    );
                    for phase in &component.phases {
                        println!(
                            "  {}-cut phase: {} added, {} removed, bound {:.3}",
                            phase.family, phase.added, phase.removed, phase.lower_bound
                        );
                    }
                }
                match report.objective() {
                    Some(objective) => println!("optimal clash count: {objective}"),
                    None => println!("no proven optimum"),
                }
            }
        }
        Command::Decompose { instance } => {
            let graph = build_instance(&instance);
            let components = decompose(&graph, instance.k);
            let summary = summarize_decomposition(&graph, &components);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
