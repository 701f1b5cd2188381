// crates/ethd-cli/src/main.rs
//
// CLI entrypoint for ethereum-cli.
//
// Sends one legacy command to a running ethereumd and prints the reply the
// way bitcoin-cli does.

mod output;
mod rpc_client;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use output::{format_error, format_result, CONNECT_HINT};
use rpc_client::{parse_param, rpc_call, ClientError, ProxyEndpoint};

/// ethereum-cli: send a command to the ethereumd proxy.
#[derive(Parser, Debug)]
#[command(
    name = "ethereum-cli",
    version = "0.1.0",
    about = "Send a Bitcoin-style RPC command to ethereumd"
)]
struct Cli {
    /// Data directory holding the proxy's configuration.
    #[arg(long, default_value = "~/.ethereum")]
    datadir: String,

    /// Configuration file, relative to the data directory unless absolute.
    #[arg(long, default_value = "ethereum.conf")]
    conf: String,

    /// Proxy URL, overriding ethpconnect/ethpport from the config file.
    #[arg(long)]
    rpcconnect: Option<String>,

    /// Command to run (see `ethereum-cli help`).
    command: String,

    /// Positional parameters, parsed as JSON where possible.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let endpoint = match &cli.rpcconnect {
        Some(url) => url.clone(),
        None => {
            let datadir = PathBuf::from(expand_tilde(&cli.datadir));
            let conf = PathBuf::from(expand_tilde(&cli.conf));
            let path = if conf.is_absolute() { conf } else { datadir.join(conf) };
            ProxyEndpoint::load(&path).unwrap_or_default().url()
        }
    };

    let params = cli.params.iter().map(|p| parse_param(p)).collect();
    let response = match rpc_call(&endpoint, &cli.command, params).await {
        Ok(response) => response,
        Err(ClientError::Connect) => {
            eprintln!("error: {}", ClientError::Connect);
            eprintln!("{}", CONNECT_HINT);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(error) = &response.error {
        eprintln!("{}", format_error(error, &cli.command));
        return Ok(ExitCode::FAILURE);
    }
    if let Some(text) = format_result(&response.result) {
        println!("{}", text);
    }
    Ok(ExitCode::SUCCESS)
}

/// Expand a leading `~/` to the home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
