// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # NFT Presale Node
//!
//! Entry point for the `presale-node` binary. Parses CLI arguments,
//! initializes logging and metrics, loads or deploys the contract, and
//! serves the HTTP/WS API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     start the node
//! - `init`    write a deployment file
//! - `status`  query a running node's status endpoint
//! - `version` print build version information

mod api;
mod cli;
mod deployment;
mod logging;
mod metrics;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;

use presale_contracts::{NftPresale, PresaleConfig};
use presale_protocol::{Address, SystemClock};

use cli::{Commands, PresaleNodeCli};
use deployment::Deployment;
use logging::LogFormat;
use metrics::PresaleMetrics;
use store::{LedgerPersistence, LedgerStore};

/// Broadcast channel capacity for live event streaming.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How often the phase watcher looks at the clock.
const PHASE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = PresaleNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_deployment(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: ledger, API server, metrics endpoint and phase watcher.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "presale_node=info,presale_contracts=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting presale-node"
    );

    // --- Persistent storage ---
    let db_path = args.data_dir.join("ledger");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create ledger directory: {}", db_path.display()))?;
    let store = LedgerStore::open(&db_path)
        .with_context(|| format!("failed to open ledger at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "ledger store opened");

    // --- Contract ---
    let ledger = load_or_deploy(&store, &args)?;

    // --- Metrics ---
    let node_metrics = Arc::new(PresaleMetrics::new());
    node_metrics.observe(&ledger);

    // --- Event broadcast ---
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            presale_protocol::config::PROTOCOL_VERSION,
        ),
        ledger: Arc::new(Mutex::new(ledger)),
        store: Arc::new(store),
        event_tx,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Phase watcher ---
    let phase_watcher = tokio::spawn(api::watch_phase(app_state, PHASE_POLL_INTERVAL));

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    phase_watcher.abort();
    tracing::info!("presale-node stopped");
    Ok(())
}

/// Resumes the ledger saved in `store`, or deploys a new contract from the
/// resolved deployment and saves it.
fn load_or_deploy(store: &LedgerStore, args: &cli::RunArgs) -> Result<NftPresale> {
    let clock = Arc::new(SystemClock);

    if let Some(state) = store.load().context("failed to read saved ledger")? {
        let ledger = NftPresale::from_state(state, clock)
            .context("saved ledger failed its consistency check")?;
        if args.deployment.is_some() || args.contract.max_supply.is_some() {
            tracing::warn!("existing ledger found; deployment parameters ignored");
        }
        tracing::info!(
            name = ledger.name(),
            owner = %ledger.owner(),
            total_supply = ledger.total_supply(),
            maximum_nft_supply = ledger.maximum_nft_supply(),
            phase = %ledger.phase(),
            "ledger resumed"
        );
        return Ok(ledger);
    }

    let deployment = Deployment::resolve(args.deployment.as_deref(), &args.contract)?;
    let ledger = NftPresale::deploy(deployment.contract, deployment.owner, clock)
        .context("contract deployment rejected")?;
    store
        .save(ledger.state())
        .context("failed to save freshly deployed ledger")?;
    tracing::info!(
        name = ledger.name(),
        symbol = ledger.symbol(),
        owner = %ledger.owner(),
        maximum_nft_supply = ledger.maximum_nft_supply(),
        "contract deployed"
    );
    Ok(ledger)
}

/// Writes a deployment file for a new contract.
fn init_deployment(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("presale_node=info", LogFormat::Pretty);

    let owner: Address = args
        .owner
        .parse()
        .with_context(|| format!("invalid owner address {:?}", args.owner))?;
    let contract = PresaleConfig::new(args.name, args.symbol, args.base_uri, args.max_supply)
        .with_presale_duration(Duration::from_secs(args.presale_duration_secs));
    contract.validate()?;

    let deployment = Deployment { owner, contract };
    deployment.save(&args.output, args.force)?;
    tracing::info!(path = %args.output.display(), "deployment file written");

    println!("Deployment written to {}", args.output.display());
    println!("  Owner          : {}", deployment.owner);
    println!("  Collection     : {} ({})", deployment.contract.name, deployment.contract.symbol);
    println!("  Base URI       : {}", deployment.contract.base_uri);
    println!("  Max supply     : {}", deployment.contract.maximum_nft_supply);
    println!("  Presale window : {}s", deployment.contract.presale_duration_secs);

    Ok(())
}

/// Queries a running node's status endpoint and prints the result.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    let url = format!("{}/status", args.api_url.trim_end_matches('/'));
    let body = http_get(&url).await?;
    println!("{}", body);
    Ok(())
}

/// Plain HTTP/1.1 GET over a tokio TCP stream.
async fn http_get(url: &str) -> Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let target = HttpTarget::parse(url)?;
    let addr = format!("{}:{}", target.host, target.port);
    let mut stream = tokio::net::TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        target.path, target.host,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());
    Ok(body)
}

/// Host, port and path of a `http://` URL.
#[derive(Debug, PartialEq, Eq)]
struct HttpTarget {
    host: String,
    port: u16,
    path: String,
}

impl HttpTarget {
    fn parse(url: &str) -> Result<Self> {
        let rest = url.strip_prefix("http://").unwrap_or(url);
        if rest.starts_with("https://") {
            anyhow::bail!("https is not supported by the status client");
        }

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>()
                    .with_context(|| format!("bad port in {:?}", url))?,
            ),
            None => (authority, 80),
        };
        if host.is_empty() {
            anyhow::bail!("missing host in {:?}", url);
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("presale-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol     {}", presale_protocol::config::PROTOCOL_VERSION);
    println!("rustc        {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
