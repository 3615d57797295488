//! # CLI Interface
//!
//! Defines the command-line argument structure for `presale-node` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `status`,
//! and `version`.

use clap::{Parser, Subcommand};
use presale_protocol::config::{
    DEFAULT_API_PORT, DEFAULT_METRICS_PORT, DEFAULT_PRESALE_DURATION,
};
use std::path::PathBuf;

/// NFT presale node.
///
/// Hosts a single presale contract, serializes every call against it,
/// persists the ledger after each accepted change, and exposes it over
/// JSON-RPC, REST, WebSocket and Prometheus.
#[derive(Parser, Debug)]
#[command(
    name = "presale-node",
    about = "NFT presale contract host",
    version,
    propagate_version = true
)]
pub struct PresaleNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the presale node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the contract.
    Run(RunArgs),
    /// Write a deployment file describing a new contract.
    Init(InitArgs),
    /// Query the status of a running node.
    Status(StatusArgs),
    /// Print version information and exit.
    Version,
}

/// Contract parameters that can be given on the command line. Each one
/// overrides the same field from the deployment file.
#[derive(Parser, Debug, Default, Clone)]
pub struct ContractArgs {
    /// Owner address (0x-prefixed hex).
    #[arg(long, env = "PRESALE_OWNER")]
    pub owner: Option<String>,

    /// Collection name.
    #[arg(long, env = "PRESALE_NAME")]
    pub name: Option<String>,

    /// Collection symbol.
    #[arg(long, env = "PRESALE_SYMBOL")]
    pub symbol: Option<String>,

    /// Base URI for token metadata.
    #[arg(long, env = "PRESALE_BASE_URI")]
    pub base_uri: Option<String>,

    /// Maximum number of tokens that can ever be minted.
    #[arg(long, env = "PRESALE_MAX_SUPPLY")]
    pub max_supply: Option<u64>,

    /// Presale window length in seconds, counted from the open time.
    #[arg(long, env = "PRESALE_DURATION_SECS")]
    pub presale_duration_secs: Option<u64>,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to a deployment file (JSON) written by `init`.
    #[arg(long, short = 'c', env = "PRESALE_DEPLOYMENT")]
    pub deployment: Option<PathBuf>,

    /// Directory holding the ledger database.
    ///
    /// Created on first run if it does not exist. An existing ledger found
    /// here takes precedence over the deployment parameters.
    #[arg(long, short = 'd', env = "PRESALE_DATA_DIR", default_value = "./presale-data")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "PRESALE_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "PRESALE_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "PRESALE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(flatten)]
    pub contract: ContractArgs,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the deployment file.
    #[arg(long, short = 'o', default_value = "deployment.json")]
    pub output: PathBuf,

    /// Owner address (0x-prefixed hex).
    #[arg(long)]
    pub owner: String,

    /// Collection name.
    #[arg(long, default_value = "NFTPresale")]
    pub name: String,

    /// Collection symbol.
    #[arg(long, default_value = "NPS")]
    pub symbol: String,

    /// Base URI for token metadata.
    #[arg(long, default_value = "google.com")]
    pub base_uri: String,

    /// Maximum number of tokens that can ever be minted.
    #[arg(long, default_value_t = 1200)]
    pub max_supply: u64,

    /// Presale window length in seconds.
    #[arg(long, default_value_t = DEFAULT_PRESALE_DURATION.as_secs())]
    pub presale_duration_secs: u64,

    /// Overwrite an existing deployment file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// API endpoint of the running node.
    #[arg(long, default_value = "http://127.0.0.1:9841")]
    pub api_url: String,
}
