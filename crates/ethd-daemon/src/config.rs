// crates/ethd-daemon/src/config.rs
//
// Runtime configuration for the ethereumd daemon.
// Loaded from a TOML file in the data directory or populated with defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use ethd_poller::NotifyCommands;
use ethd_rpc::RpcConfig;

/// Runtime configuration for the daemon. Key names follow the legacy
/// `ethereum.conf` vocabulary.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Host the legacy RPC server binds to.
    #[serde(default = "default_ethpconnect")]
    pub ethpconnect: String,

    /// Port the legacy RPC server listens on.
    #[serde(default = "default_ethpport")]
    pub ethpport: u16,

    /// Host of the node's JSON-RPC endpoint.
    #[serde(default = "default_rpcconnect")]
    pub rpcconnect: String,

    #[serde(default = "default_rpcport")]
    pub rpcport: u16,

    /// Use https for the node endpoint.
    #[serde(default)]
    pub rpctls: bool,

    /// Path of the node's IPC socket. Takes precedence over the HTTP
    /// endpoint. Relative paths are resolved against the data directory.
    #[serde(default)]
    pub ipcconnect: Option<String>,

    /// Command run for every new block, `%s` is the block hash.
    #[serde(default)]
    pub blocknotify: Option<String>,

    /// Command run for wallet transactions, `%s` is the txid.
    #[serde(default)]
    pub walletnotify: Option<String>,

    /// Command run when polling fails, `%s` is the error text.
    #[serde(default)]
    pub alertnotify: Option<String>,

    /// Node request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll period in milliseconds.
    #[serde(default = "default_pollinterval")]
    pub pollinterval: u64,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ethpconnect() -> String {
    "127.0.0.1".to_string()
}

fn default_ethpport() -> u16 {
    9500
}

fn default_rpcconnect() -> String {
    "127.0.0.1".to_string()
}

fn default_rpcport() -> u16 {
    8545
}

fn default_timeout() -> u64 {
    60
}

fn default_pollinterval() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            ethpconnect: default_ethpconnect(),
            ethpport: default_ethpport(),
            rpcconnect: default_rpcconnect(),
            rpcport: default_rpcport(),
            rpctls: false,
            ipcconnect: None,
            blocknotify: None,
            walletnotify: None,
            alertnotify: None,
            timeout: default_timeout(),
            pollinterval: default_pollinterval(),
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Expand `~` in paths and hook commands, and anchor a relative
    /// `ipcconnect` in `datadir`.
    pub fn resolved(mut self, datadir: &Path) -> Self {
        self.ipcconnect = self.ipcconnect.map(|raw| {
            let path = PathBuf::from(expand_tilde(&raw));
            if path.is_absolute() {
                path.display().to_string()
            } else {
                datadir.join(path).display().to_string()
            }
        });
        for hook in [
            &mut self.blocknotify,
            &mut self.walletnotify,
            &mut self.alertnotify,
        ] {
            if let Some(command) = hook.as_mut() {
                *command = expand_tilde(command);
            }
        }
        self
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.ethpconnect.clone(),
            port: self.ethpport,
        }
    }

    /// Hook commands, run from `datadir`.
    pub fn notify_commands(&self, datadir: &Path) -> NotifyCommands {
        NotifyCommands {
            blocknotify: self.blocknotify.clone(),
            walletnotify: self.walletnotify.clone(),
            alertnotify: self.alertnotify.clone(),
            workdir: Some(datadir.to_path_buf()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.pollinterval.max(1))
    }
}

/// Location of the config file: `conf` as given when absolute, otherwise
/// relative to the data directory.
pub fn config_path(datadir: &Path, conf: &str) -> PathBuf {
    let conf = PathBuf::from(expand_tilde(conf));
    if conf.is_absolute() {
        conf
    } else {
        datadir.join(conf)
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.ethpconnect, "127.0.0.1");
        assert_eq!(config.ethpport, 9500);
        assert_eq!(config.rpcport, 8545);
        assert!(!config.rpctls);
        assert!(config.ipcconnect.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.poll_period(), Duration::from_millis(1000));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ethereum.conf");
        fs::write(
            &path,
            r#"
ethpport = 9575
rpcconnect = "10.0.0.2"
blocknotify = "./notify.sh block %s"
pollinterval = 250
"#,
        )
        .unwrap();

        let config = DaemonConfig::load(&path).unwrap();
        assert_eq!(config.ethpport, 9575);
        assert_eq!(config.rpcconnect, "10.0.0.2");
        assert_eq!(config.blocknotify.as_deref(), Some("./notify.sh block %s"));
        assert_eq!(config.poll_period(), Duration::from_millis(250));
        assert!(config.walletnotify.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DaemonConfig::load(&dir.path().join("absent.conf")).is_err());
    }

    #[test]
    fn test_relative_ipc_path_uses_datadir() {
        let datadir = Path::new("/var/lib/ethereum");
        let config = DaemonConfig {
            ipcconnect: Some("geth.ipc".into()),
            ..Default::default()
        }
        .resolved(datadir);
        assert_eq!(config.ipcconnect.as_deref(), Some("/var/lib/ethereum/geth.ipc"));

        let config = DaemonConfig {
            ipcconnect: Some("/tmp/geth.ipc".into()),
            ..Default::default()
        }
        .resolved(datadir);
        assert_eq!(config.ipcconnect.as_deref(), Some("/tmp/geth.ipc"));
    }

    #[test]
    fn test_config_path() {
        let datadir = Path::new("/data");
        assert_eq!(config_path(datadir, "ethereum.conf"), PathBuf::from("/data/ethereum.conf"));
        assert_eq!(config_path(datadir, "/etc/eth.conf"), PathBuf::from("/etc/eth.conf"));
    }

    #[test]
    fn test_notify_commands_run_in_datadir() {
        let config = DaemonConfig {
            walletnotify: Some("echo %s".into()),
            ..Default::default()
        };
        let commands = config.notify_commands(Path::new("/data"));
        assert_eq!(commands.walletnotify.as_deref(), Some("echo %s"));
        assert_eq!(commands.workdir, Some(PathBuf::from("/data")));
        assert!(commands.blocknotify.is_none());
    }

    #[test]
    fn test_expand_tilde_leaves_other_paths() {
        assert_eq!(expand_tilde("/abs/path"), "/abs/path");
        assert_eq!(expand_tilde("relative"), "relative");
    }
}
