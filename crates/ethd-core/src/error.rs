// crates/ethd-core/src/error.rs
//
// Error taxonomy shared by every ethd crate.
//
// Each variant maps to the fixed numeric code a Bitcoin-Core-style client
// expects in the `error` member of a response envelope.

use std::time::Duration;

use thiserror::Error;

/// Generic local failure (bad argument type, transport failure, ...).
pub const RPC_MISC_ERROR: i64 = -1;
/// Amount out of range (non-positive fee or amount).
pub const RPC_AMOUNT_OUT_OF_RANGE: i64 = -3;
/// Requested block or transaction does not exist.
pub const RPC_NOT_FOUND: i64 = -5;
/// No translator registered under the requested method name.
pub const RPC_METHOD_NOT_FOUND: i64 = -32601;
/// Inbound envelope is missing `method` or `params`.
pub const RPC_INVALID_REQUEST: i64 = -32602;

/// Failures of a single request/response exchange with the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The node refused the connection (not running, wrong port/socket).
    #[error("connection refused")]
    ConnectionRefused,

    /// The stream was closed by the node while writing.
    #[error("broken pipe")]
    BrokenPipe,

    /// The node closed the stream without answering.
    #[error("no data returned")]
    NoData,

    /// The exchange did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The node answered with something that is not a JSON-RPC response.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => {
                TransportError::ConnectionRefused
            }
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
                TransportError::BrokenPipe
            }
            std::io::ErrorKind::UnexpectedEof => TransportError::NoData,
            _ => TransportError::Io(e.to_string()),
        }
    }
}

/// Protocol-wide error type for the proxy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EthdError {
    /// The node could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The node answered with a JSON-RPC error object.
    #[error("node error {code}: {message}")]
    BadResponse { code: i64, message: String },

    /// A locally detected bad argument.
    #[error("{0}")]
    InvalidParameter(String),

    /// A numeric argument outside its permitted range.
    #[error("{0}")]
    AmountOutOfRange(String),

    /// No translator is registered under this name.
    #[error("Method not found")]
    MethodNotFound(String),

    /// The inbound envelope is missing required members.
    #[error("Invalid rpc 2.0 structure")]
    InvalidRequest,

    /// The node reports no chain head yet.
    #[error("Blockchain not synced")]
    ChainNotSynced,
}

/// Coarse classification of [`EthdError`], used to describe sets of errors
/// (for example the errors that should raise an alert notification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    BadResponse,
    InvalidParameter,
    AmountOutOfRange,
    MethodNotFound,
    InvalidRequest,
    ChainNotSynced,
}

impl EthdError {
    /// Build a node-style error with a fixed code.
    pub fn bad_response(code: i64, message: impl Into<String>) -> Self {
        EthdError::BadResponse {
            code,
            message: message.into(),
        }
    }

    /// The -5 error returned when a block hash or height cannot be resolved.
    pub fn block_not_found() -> Self {
        Self::bad_response(RPC_NOT_FOUND, "Block not found")
    }

    /// The -5 error returned when a transaction id cannot be resolved.
    pub fn transaction_not_found() -> Self {
        Self::bad_response(RPC_NOT_FOUND, "Invalid or non-wallet transaction id")
    }

    /// Legacy numeric code for this error.
    pub fn code(&self) -> i64 {
        match self {
            EthdError::Transport(_) => RPC_MISC_ERROR,
            EthdError::BadResponse { code, .. } => *code,
            EthdError::InvalidParameter(_) => RPC_MISC_ERROR,
            EthdError::AmountOutOfRange(_) => RPC_AMOUNT_OUT_OF_RANGE,
            EthdError::MethodNotFound(_) => RPC_METHOD_NOT_FOUND,
            EthdError::InvalidRequest => RPC_INVALID_REQUEST,
            EthdError::ChainNotSynced => RPC_MISC_ERROR,
        }
    }

    /// Message placed in the response envelope. Node messages pass through
    /// verbatim.
    pub fn message(&self) -> String {
        match self {
            EthdError::BadResponse { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EthdError::Transport(_) => ErrorKind::Transport,
            EthdError::BadResponse { .. } => ErrorKind::BadResponse,
            EthdError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            EthdError::AmountOutOfRange(_) => ErrorKind::AmountOutOfRange,
            EthdError::MethodNotFound(_) => ErrorKind::MethodNotFound,
            EthdError::InvalidRequest => ErrorKind::InvalidRequest,
            EthdError::ChainNotSynced => ErrorKind::ChainNotSynced,
        }
    }
}

impl From<serde_json::Error> for EthdError {
    fn from(e: serde_json::Error) -> Self {
        EthdError::Transport(TransportError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(EthdError::block_not_found().code(), -5);
        assert_eq!(EthdError::transaction_not_found().code(), -5);
        assert_eq!(EthdError::AmountOutOfRange("x".into()).code(), -3);
        assert_eq!(EthdError::InvalidParameter("x".into()).code(), -1);
        assert_eq!(EthdError::MethodNotFound("foo".into()).code(), -32601);
        assert_eq!(EthdError::InvalidRequest.code(), -32602);
        assert_eq!(EthdError::Transport(TransportError::NoData).code(), -1);
    }

    #[test]
    fn test_node_code_passes_through() {
        let err = EthdError::bad_response(-32000, "filter not found");
        assert_eq!(err.code(), -32000);
        assert_eq!(err.message(), "filter not found");
        assert_eq!(err.kind(), ErrorKind::BadResponse);
    }

    #[test]
    fn test_envelope_messages() {
        assert_eq!(EthdError::InvalidRequest.message(), "Invalid rpc 2.0 structure");
        assert_eq!(
            EthdError::MethodNotFound("foo".into()).message(),
            "Method not found"
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        assert_eq!(TransportError::from(refused), TransportError::ConnectionRefused);

        let pipe = std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert_eq!(TransportError::from(pipe), TransportError::BrokenPipe);
    }
}
