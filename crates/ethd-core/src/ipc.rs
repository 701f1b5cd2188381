// crates/ethd-core/src/ipc.rs
//
// JSON-RPC over the node's local Unix domain socket (geth.ipc).
//
// One JSON object per line in each direction. The socket carries a single
// request/response pair at a time; a failed exchange drops the connection
// and the next call reconnects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::error::{EthdError, TransportError};
use crate::transport::{into_result, NodeRequest, NodeTransport, RequestIds};

struct IpcConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl IpcConnection {
    async fn open(path: &Path) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path).await.map_err(|e| {
            tracing::error!("IPC connect to {} failed: {}", path.display(), e);
            TransportError::from(e)
        })?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer: write,
        })
    }

    async fn exchange(&mut self, line: &[u8]) -> Result<Value, TransportError> {
        self.writer.write_all(line).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            tracing::error!("IPC receive: no data, connection refused");
            return Err(TransportError::NoData);
        }
        serde_json::from_str(buf.trim_end()).map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

/// Client for a node's IPC endpoint.
pub struct IpcTransport {
    path: PathBuf,
    timeout: Duration,
    ids: RequestIds,
    conn: Mutex<Option<IpcConnection>>,
}

impl std::fmt::Debug for IpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcTransport")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl IpcTransport {
    /// Connect to the socket at `path`. Fails if the node is not listening.
    pub async fn connect(path: impl Into<PathBuf>, timeout: Duration) -> Result<Self, EthdError> {
        let path = path.into();
        let conn = IpcConnection::open(&path).await?;
        tracing::info!("Connected to node IPC socket {}", path.display());
        Ok(Self {
            path,
            timeout,
            ids: RequestIds::new(),
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl NodeTransport for IpcTransport {
    async fn call_with_id(
        &self,
        method: &str,
        params: Vec<Value>,
        id: Option<u64>,
    ) -> Result<Value, EthdError> {
        let request = NodeRequest::new(method, params, self.ids.resolve(id));
        let line = serde_json::to_vec(&request)?;
        tracing::trace!("-> ipc {} (id {})", method, request.id);

        let mut guard = self.conn.lock().await;
        let outcome = tokio::time::timeout(self.timeout, async {
            if guard.is_none() {
                tracing::debug!("Reconnecting to {}", self.path.display());
                *guard = Some(IpcConnection::open(&self.path).await?);
            }
            match guard.as_mut() {
                Some(conn) => conn.exchange(&line).await,
                None => Err(TransportError::ConnectionRefused),
            }
        })
        .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                if e == TransportError::BrokenPipe {
                    tracing::error!("IPC call: pipe broken, connection refused");
                }
                *guard = None;
                return Err(e.into());
            }
            Err(_) => {
                *guard = None;
                return Err(TransportError::Timeout(self.timeout).into());
            }
        };
        drop(guard);

        into_result(response)
    }
}
