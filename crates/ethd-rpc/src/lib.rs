// crates/ethd-rpc/src/lib.rs
//
// ethd-rpc: Legacy RPC translation layer for the ethd proxy.
//
// Provides the `EthereumProxy` method translators (grouped into handler
// modules per API category), the static method registry behind `help`, the
// dispatcher that produces `{id, result, error}` envelopes, and an axum
// HTTP front end.

pub mod dispatch;
pub mod handlers;
pub mod proxy;
pub mod registry;
pub mod server;

// Re-export the main types for ergonomic access.
pub use dispatch::{Dispatcher, RpcErrorBody, RpcRequest, RpcResponse};
pub use proxy::{EthereumProxy, GasQuote};
pub use registry::{Category, MethodSpec};
pub use server::{ProxyRpcServer, RpcConfig};
