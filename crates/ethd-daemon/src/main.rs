// crates/ethd-daemon/src/main.rs
//
// Binary entrypoint for ethereumd.
//
// Parses CLI arguments, loads ethereum.conf from the data directory,
// initializes tracing, connects to the node over IPC or HTTP, starts the
// poller when hooks are configured, and serves the legacy RPC API until
// Ctrl-C.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use config::{config_path, expand_tilde, DaemonConfig};
use ethd_core::transport::NodeTransport;
use ethd_core::HttpTransport;
use ethd_poller::{Poller, CommandNotifier};
use ethd_rpc::{EthereumProxy, ProxyRpcServer};

/// ethereumd: serves a Bitcoin-Core-style RPC API backed by an Ethereum node.
#[derive(Parser, Debug)]
#[command(name = "ethereumd", version = "0.1.0", about = "Bitcoin-style RPC proxy for Ethereum nodes")]
struct Args {
    /// Data directory.
    #[arg(long, default_value = "~/.ethereum")]
    datadir: String,

    /// Configuration file, relative to the data directory unless absolute.
    #[arg(long, default_value = "ethereum.conf")]
    conf: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let datadir = PathBuf::from(expand_tilde(&args.datadir));
    if !datadir.is_dir() {
        return Err(format!(
            "Specified data directory \"{}\" does not exist.",
            datadir.display()
        )
        .into());
    }
    let conf_path = config_path(&datadir, &args.conf);

    // The config file decides the default log level, so it is read before
    // tracing is installed and reported right after.
    let loaded = DaemonConfig::load(&conf_path);
    let log_level = match &loaded {
        Ok(cfg) => cfg.log_level.clone(),
        Err(_) => DaemonConfig::default().log_level,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let daemon_config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", conf_path.display());
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                conf_path.display(),
                e
            );
            DaemonConfig::default()
        }
    }
    .resolved(&datadir);

    tracing::info!("ethereumd v0.1.0");
    tracing::info!("Data directory: {}", datadir.display());
    tracing::info!(
        "RPC endpoint: {}:{}",
        daemon_config.ethpconnect,
        daemon_config.ethpport
    );

    // ---------------------------------------------------------------
    // Node connection, proxy and poller.
    // ---------------------------------------------------------------
    let node = connect_node(&daemon_config).await?;
    let proxy = Arc::new(EthereumProxy::new(Arc::clone(&node)));

    let notifier = Arc::new(CommandNotifier::new(daemon_config.notify_commands(&datadir)));
    let poller = Arc::new(Poller::new(node, notifier));
    if poller.has_blocknotify() || poller.has_walletnotify() {
        poller.start(daemon_config.poll_period());
    } else {
        tracing::info!("No blocknotify or walletnotify configured, poller idle");
    }
    if poller.has_alertnotify() {
        tracing::info!("alertnotify enabled");
    }

    // ---------------------------------------------------------------
    // Legacy RPC server, until Ctrl-C.
    // ---------------------------------------------------------------
    let server = ProxyRpcServer::new(daemon_config.rpc_config(), proxy);
    let served = server.start(shutdown_signal()).await;

    poller.stop();
    served?;
    tracing::info!("ethereumd stopped");
    Ok(())
}

/// Connect to the node: the IPC socket when configured, HTTP otherwise.
async fn connect_node(
    config: &DaemonConfig,
) -> Result<Arc<dyn NodeTransport>, Box<dyn std::error::Error>> {
    let timeout = config.request_timeout();

    if let Some(path) = &config.ipcconnect {
        return connect_ipc(Path::new(path), timeout).await;
    }

    let transport = HttpTransport::new(&config.rpcconnect, config.rpcport, config.rpctls, timeout)?;
    tracing::info!("Node endpoint: {}", transport.url());
    Ok(Arc::new(transport))
}

#[cfg(unix)]
async fn connect_ipc(
    path: &Path,
    timeout: std::time::Duration,
) -> Result<Arc<dyn NodeTransport>, Box<dyn std::error::Error>> {
    let transport = ethd_core::IpcTransport::connect(path, timeout).await?;
    tracing::info!("Node endpoint: ipc://{}", path.display());
    Ok(Arc::new(transport))
}

#[cfg(not(unix))]
async fn connect_ipc(
    path: &Path,
    _timeout: std::time::Duration,
) -> Result<Arc<dyn NodeTransport>, Box<dyn std::error::Error>> {
    Err(format!(
        "ipcconnect ({}) requires Unix domain sockets, use rpcconnect instead",
        path.display()
    )
    .into())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
    }
}
