//! Arbor CLI
//!
//! Plan tree allocations, keep a payer funded, and diagnose failed
//! transactions against a cluster's JSON-RPC endpoint.

use anyhow::{bail, Context};
use arbor_core::{
    check_feasible, compute_requirements, diagnose, require_feasible, LedgerClient, LogReport,
};
use arbor_minter::{MinterConfig, RpcClient};
use arbor_types::{
    Address, Cluster, DepthSizePair, Lamports, TreeSizingParams, SUPPORTED_DEPTH_SIZE_PAIRS,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Compressed-record tree provisioning toolkit")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cluster: devnet, testnet, mainnet-beta or an RPC URL
    #[arg(long, global = true)]
    cluster: Option<Cluster>,

    /// RPC endpoint (defaults to the cluster's public endpoint)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// RPC request timeout (e.g., "10s", "1m")
    #[arg(long, global = true)]
    timeout: Option<humantime::Duration>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported depth/buffer-size pairs
    Pairs,

    /// Compute the account size and allocation cost of a tree
    Plan {
        /// Maximum tree depth
        #[arg(long)]
        max_depth: u32,

        /// Maximum concurrent-change buffer size
        #[arg(long)]
        max_buffer_size: u32,

        /// Canopy depth (defaults to max depth minus 5)
        #[arg(long)]
        canopy_depth: Option<u32>,

        /// Payer to check the cost against
        #[arg(long)]
        payer: Option<Address>,
    },

    /// Top an address up when its balance is below the floor
    Fund {
        /// Address to check
        #[arg(long)]
        address: Address,

        /// Floor in lamports
        #[arg(long)]
        floor: Option<u64>,

        /// Top-up amount in lamports
        #[arg(long)]
        amount: Option<u64>,

        /// Top up regardless of the current balance
        #[arg(long)]
        force: bool,
    },

    /// Extract the transaction signature from an error and show its logs
    Diagnose {
        /// Error text as printed by the failing tool
        #[arg(long)]
        error: String,

        /// Fetch program logs for the transaction
        #[arg(long)]
        fetch_logs: bool,
    },
}

impl Cli {
    fn config(&self) -> anyhow::Result<MinterConfig> {
        let mut config = match &self.config {
            Some(path) => MinterConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => MinterConfig::default(),
        };
        if let Some(cluster) = &self.cluster {
            config = config.with_cluster(cluster.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(timeout) = self.timeout {
            config = config.with_request_timeout(timeout.into());
        }
        Ok(config)
    }
}

/// Tree shape for `plan`, with the default canopy when none is given.
fn plan_params(max_depth: u32, max_buffer_size: u32, canopy_depth: Option<u32>) -> TreeSizingParams {
    match canopy_depth {
        Some(canopy) => TreeSizingParams::new(max_depth, max_buffer_size, canopy),
        None => TreeSizingParams::with_default_canopy(DepthSizePair::new(max_depth, max_buffer_size)),
    }
}

fn client(config: &MinterConfig) -> anyhow::Result<RpcClient> {
    RpcClient::with_timeout(config.rpc_url(), config.request_timeout)
        .context("creating RPC client")
}

fn print_pairs() {
    println!(
        "{:>6} {:>7} {:>14} {:>7} {:>12}",
        "depth", "buffer", "capacity", "canopy", "size"
    );
    for pair in SUPPORTED_DEPTH_SIZE_PAIRS {
        let params = TreeSizingParams::with_default_canopy(*pair);
        println!(
            "{:>6} {:>7} {:>14} {:>7} {:>12}",
            pair.max_depth,
            pair.max_buffer_size,
            arbor_types::group_thousands(pair.capacity()),
            params.canopy_depth,
            arbor_types::group_thousands(params.account_size()),
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Pairs = cli.command {
        // No tracing: output goes to stdout
        print_pairs();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli.config()?;
    let client = client(&config)?;

    match cli.command {
        Commands::Pairs => {}

        Commands::Plan {
            max_depth,
            max_buffer_size,
            canopy_depth,
            payer,
        } => {
            let params = plan_params(max_depth, max_buffer_size, canopy_depth);
            let requirement = compute_requirements(&client, params).await?;

            println!("Shape:      {}", params.pair());
            println!("Canopy:     {}", params.canopy_depth);
            println!("Capacity:   {}", arbor_types::group_thousands(requirement.capacity));
            println!("Size:       {} bytes", arbor_types::group_thousands(requirement.size_bytes));
            println!("Cost:       {} SOL", requirement.allocation_cost.format_sol(false));

            if let Some(payer) = payer {
                let balance = client.get_balance(&payer).await?;
                println!("Balance:    {} SOL", balance.format_sol(false));
                if check_feasible(balance, requirement.allocation_cost) {
                    println!("Feasible:   yes");
                } else {
                    println!("Feasible:   no");
                    require_feasible(balance, requirement.allocation_cost)?;
                }
            }
        }

        Commands::Fund {
            address,
            floor,
            amount,
            force,
        } => {
            if !config.cluster.has_faucet() {
                bail!("{} has no faucet", config.cluster);
            }
            let mut config = config;
            if let Some(floor) = floor {
                config = config.with_balance_floor(Lamports(floor));
            }
            if let Some(amount) = amount {
                config = config.with_top_up_amount(Lamports(amount));
            }

            let check = config
                .balance_guard()
                .ensure_minimum_balance(&client, &address, force)
                .await?;

            println!("Balance:    {} SOL", check.observed().format_sol(false));
            match check.top_up {
                Some(signature) => {
                    println!("Top-up:     {}", config.cluster.explorer_signature_url(&signature));
                    match check.after {
                        Some(after) => println!("Now:        {} SOL", after.format_sol(false)),
                        None => println!("Now:        unknown"),
                    }
                }
                None => println!("Top-up:     not needed"),
            }
        }

        Commands::Diagnose { error, fetch_logs } => {
            let diagnosis = diagnose(&client, &config.cluster, error.as_str(), fetch_logs).await;

            let (Some(signature), Some(explorer)) = (&diagnosis.signature, &diagnosis.explorer_url)
            else {
                println!("No transaction signature found");
                return Ok(());
            };
            println!("Signature:  {}", signature);
            println!("Explorer:   {}", explorer);
            match diagnosis.logs {
                Some(LogReport::Logs(lines)) => {
                    println!("Logs:");
                    for line in lines {
                        println!("  {}", line);
                    }
                }
                Some(LogReport::NoLogMessages) => println!("Logs:       none recorded"),
                Some(LogReport::NotFound) => println!("Logs:       transaction not found"),
                Some(LogReport::FetchFailed(reason)) => println!("Logs:       fetch failed: {}", reason),
                None => {}
            }
        }
    }

    Ok(())
}
