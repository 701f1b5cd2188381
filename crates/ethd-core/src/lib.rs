// crates/ethd-core/src/lib.rs
//
// ethd-core: Shared foundation of the ethd compatibility proxy.
//
// Defines the error taxonomy and its legacy numeric codes, wei/ether/gwei
// unit conversion, and the `NodeTransport` seam with its HTTP, IPC and
// in-memory implementations.

pub mod error;
pub mod http;
#[cfg(unix)]
pub mod ipc;
pub mod memory;
pub mod transport;
pub mod units;

// Re-export key types for ergonomic access from downstream crates.
pub use error::{ErrorKind, EthdError, TransportError};
pub use http::HttpTransport;
#[cfg(unix)]
pub use ipc::IpcTransport;
pub use memory::{InMemoryNode, MemoryTransaction};
pub use transport::NodeTransport;
pub use units::Wei;
