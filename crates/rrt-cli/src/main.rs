// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! RRT* planner CLI.
//!
//! # Usage
//! ```text
//! rrt-cli bench --samples 1000 --config maze.json
//! rrt-cli bench --samples 1000 --config maze.json --strategy ws --threads 4
//! rrt-cli sim   --samples 1000 --config maze.json --strategy bsp --threads 8 --out tree.json
//! ```
//!
//! With `--threads 1` (the default) every sample runs sequentially whatever
//! the strategy. `bench` prints the elapsed wall time in seconds; `sim` also
//! prints the goal distance and writes the tree as JSON. Logs go to stderr
//! and honour `RUST_LOG`.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rrt_core::executor::DEFAULT_STEAL_THRESHOLD;
use rrt_core::{plan, ExecutorStats, PlanOutcome, PlannerConfig, Strategy, TreeSnapshot};
use rrt_geom::ConfigSpace;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Concurrent RRT* path planner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the planner and print the elapsed time.
    Bench(RunArgs),
    /// Run the planner, print the goal distance and write the tree as JSON.
    Sim {
        #[command(flatten)]
        run: RunArgs,
        /// Output file (defaults to `rrt_<samples>.json`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of samples drawn to grow the tree.
    #[arg(long)]
    samples: usize,
    /// JSON configuration space.
    #[arg(long)]
    config: PathBuf,
    /// Parallel scheduling strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::Ws)]
    strategy: StrategyArg,
    /// Worker threads; 1 runs sequentially.
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Maximum tasks moved by one steal (work stealing only).
    #[arg(long, default_value_t = DEFAULT_STEAL_THRESHOLD)]
    steal_threshold: usize,
    /// Base random seed; fresh entropy when absent.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    /// Work stealing.
    Ws,
    /// Bulk-synchronous parallel.
    Bsp,
}

impl RunArgs {
    fn planner_config(&self) -> PlannerConfig {
        let strategy = match (self.threads, self.strategy) {
            (0 | 1, _) => Strategy::Sequential,
            (workers, StrategyArg::Ws) => Strategy::WorkStealing {
                workers,
                steal_threshold: self.steal_threshold,
            },
            (workers, StrategyArg::Bsp) => Strategy::Bsp { workers },
        };
        PlannerConfig {
            samples: self.samples,
            strategy,
            seed: self.seed,
        }
    }
}

/// What `sim` writes to disk.
#[derive(Serialize)]
struct SimDump<'a> {
    space: &'a ConfigSpace,
    planner: &'a PlannerConfig,
    stats: ExecutorStats,
    tree: TreeSnapshot,
}

fn load_space(path: &Path) -> Result<ConfigSpace> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read config space {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse config space {}", path.display()))
}

fn run(args: &RunArgs) -> Result<(ConfigSpace, PlannerConfig, PlanOutcome, f64)> {
    let space = load_space(&args.config)?;
    let config = args.planner_config();
    info!(strategy = ?config.strategy, samples = config.samples, "planning");

    let started = Instant::now();
    let outcome = plan(space.clone(), &config).context("planner run failed")?;
    Ok((space, config, outcome, started.elapsed().as_secs_f64()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Bench(args) => {
            let (_, _, _, elapsed) = run(&args)?;
            println!("{elapsed:.2}");
        }
        Command::Sim { run: args, out } => {
            let (space, config, outcome, elapsed) = run(&args)?;
            println!("{elapsed:.2}");
            match outcome.tree.goal_cost() {
                Some(cost) => println!("Goal distance: {cost}"),
                None => println!("Goal distance: unreached"),
            }

            let out = out.unwrap_or_else(|| PathBuf::from(format!("rrt_{}.json", args.samples)));
            let dump = SimDump {
                space: &space,
                planner: &config,
                stats: outcome.stats,
                tree: outcome.tree.snapshot(),
            };
            let json = serde_json::to_string_pretty(&dump).context("serialise tree")?;
            fs::write(&out, json).with_context(|| format!("write {}", out.display()))?;
            println!("Tree written to {}", out.display());
        }
    }
    Ok(())
}
