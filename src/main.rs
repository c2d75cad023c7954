use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use std::time::Instant;

use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cluster_sieve::config::{self, Algorithm, DEFAULT_LIMIT, DEFAULT_SHOW, RunConfig};
use cluster_sieve::error::Result;
use cluster_sieve::transport::{CoordinatorListener, TcpTransport};
use cluster_sieve::{cluster, report};

#[derive(Parser)]
#[command(name = "cluster-sieve")]
#[command(about = "Count primes below N across nodes and threads with a segmented sieve", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SieveArgs {
    #[arg(default_value_t = DEFAULT_LIMIT, help = "Search for primes below this bound")]
    limit: u64,
    #[arg(
        short,
        long,
        help = "Worker threads per node (defaults to the number of CPUs)"
    )]
    workers: Option<usize>,
    #[arg(short, long, value_enum, default_value_t = Algorithm::Sieve, help = "Per-segment algorithm")]
    algorithm: Algorithm,
    #[arg(short, long, help = "Collect the primes themselves, not only the count")]
    enumerate: bool,
    #[arg(long, default_value_t = DEFAULT_SHOW, help = "Primes to print from each end when enumerating")]
    show: usize,
    #[arg(long, help = "Abort unless the cluster has exactly this many nodes")]
    expect_nodes: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run every node of the cluster inside this process")]
    Count {
        #[command(flatten)]
        sieve: SieveArgs,
        #[arg(short, long, default_value = "1", help = "Number of simulated nodes")]
        nodes: usize,
    },
    #[command(about = "Run one node of a multi-process cluster over TCP")]
    Node {
        #[command(flatten)]
        sieve: SieveArgs,
        #[arg(short, long, help = "Total number of nodes in the cluster")]
        nodes: usize,
        #[arg(short, long, help = "This node's rank, 0 is the coordinator")]
        rank: usize,
        #[arg(
            short,
            long,
            default_value = "127.0.0.1:7878",
            help = "Coordinator address (rank 0 listens here)"
        )]
        coordinator: String,
        #[arg(
            long,
            default_value = "40",
            help = "Connection attempts before a non-coordinator gives up"
        )]
        connect_attempts: usize,
    },
}

impl SieveArgs {
    fn into_config(self, nodes: usize) -> RunConfig {
        RunConfig {
            limit: self.limit,
            nodes,
            workers: self.workers.unwrap_or_else(config::default_workers),
            algorithm: self.algorithm,
            enumerate: self.enumerate,
            show: self.show,
            expected_nodes: self.expect_nodes,
        }
    }
}

/// Logs go to stderr, `RUST_LOG` overrides the default `info` level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("Error: {}", e);
            if e.is_config() {
                eprintln!("Check the limit, --nodes, --workers and --expect-nodes arguments.");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Count { sieve, nodes } => {
            let config = sieve.into_config(nodes);
            config.validate()?;

            info!(
                limit = config.limit,
                nodes = config.nodes,
                workers = config.workers,
                "starting in-process cluster"
            );

            let started_at = Local::now();
            let start = Instant::now();
            let global = cluster::run_local(&config)?;
            let elapsed = start.elapsed();

            print!(
                "{}",
                report::render(&global, config.algorithm, started_at, elapsed, config.show)
            );
        }
        Commands::Node {
            sieve,
            nodes,
            rank,
            coordinator,
            connect_attempts,
        } => {
            let config = sieve.into_config(nodes);
            config.validate_rank(rank)?;

            let started_at = Local::now();
            let start = Instant::now();

            if rank == cluster::COORDINATOR {
                let listener = CoordinatorListener::bind(coordinator.as_str())?;
                let mut transport = listener.accept(nodes)?;
                if let Some(global) = cluster::run_node(&config, &mut transport)? {
                    let elapsed = start.elapsed();
                    print!(
                        "{}",
                        report::render(&global, config.algorithm, started_at, elapsed, config.show)
                    );
                }
            } else {
                let mut transport =
                    TcpTransport::connect(coordinator.as_str(), rank, nodes, connect_attempts)?;
                cluster::run_node(&config, &mut transport)?;
                info!(rank, elapsed_us = start.elapsed().as_micros() as u64, "node complete");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_count_defaults() {
        let cli = Cli::try_parse_from(["cluster-sieve", "count"]).unwrap();
        match cli.command {
            Commands::Count { sieve, nodes } => {
                let config = sieve.into_config(nodes);
                assert_eq!(config.limit, DEFAULT_LIMIT);
                assert_eq!(config.nodes, 1);
                assert_eq!(config.algorithm, Algorithm::Sieve);
                assert!(!config.enumerate);
                assert_eq!(config.show, DEFAULT_SHOW);
                assert!(config.workers >= 1);
            }
            Commands::Node { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_count_flags() {
        let cli = Cli::try_parse_from([
            "cluster-sieve",
            "count",
            "1000",
            "--nodes",
            "3",
            "--workers",
            "2",
            "--algorithm",
            "trial",
            "--enumerate",
            "--expect-nodes",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Count { sieve, nodes } => {
                let config = sieve.into_config(nodes);
                let expected = RunConfig::new(1000, 3, 2)
                    .with_algorithm(Algorithm::Trial)
                    .with_enumerate(true)
                    .with_expected_nodes(Some(3));
                assert_eq!(config, expected);
            }
            Commands::Node { .. } => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn test_node_requires_rank_and_nodes() {
        assert!(Cli::try_parse_from(["cluster-sieve", "node"]).is_err());
        let cli = Cli::try_parse_from([
            "cluster-sieve",
            "node",
            "--nodes",
            "4",
            "--rank",
            "2",
            "--coordinator",
            "10.0.0.1:9000",
        ])
        .unwrap();
        match cli.command {
            Commands::Node {
                nodes,
                rank,
                coordinator,
                connect_attempts,
                ..
            } => {
                assert_eq!((nodes, rank), (4, 2));
                assert_eq!(coordinator, "10.0.0.1:9000");
                assert_eq!(connect_attempts, 40);
            }
            Commands::Count { .. } => panic!("parsed the wrong subcommand"),
        }
    }
}
