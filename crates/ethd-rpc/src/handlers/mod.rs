// crates/ethd-rpc/src/handlers/mod.rs
//
// Legacy RPC translators, one module per API group.
//
// Each module implements its translators as typed `EthereumProxy` methods,
// wraps them in type-erased `Handler` functions that read positional
// params, and lists them in a `METHODS` table picked up by the registry.

pub mod blockchain;
pub mod control;
pub mod network;
pub mod util;
pub mod wallet;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use ethd_core::error::EthdError;

use crate::proxy::EthereumProxy;

/// Type-erased translator: positional params in, JSON result out.
pub type Handler = for<'a> fn(&'a EthereumProxy, Params) -> BoxFuture<'a, Result<Value, EthdError>>;

pub(crate) fn to_json<T: Serialize>(value: T) -> Result<Value, EthdError> {
    Ok(serde_json::to_value(value)?)
}

/// Positional arguments of one legacy call.
///
/// Accessors are lenient the way a shell-driven client needs them to be:
/// numbers may arrive as numeric strings and booleans as "true"/"false"
/// or 0/1.
#[derive(Debug, Clone)]
pub struct Params {
    method: String,
    values: Vec<Value>,
}

impl Params {
    pub fn new(method: &str, values: Vec<Value>) -> Self {
        Self {
            method: method.to_string(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The argument at `index`, treating JSON `null` as absent.
    pub fn raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    fn invalid(&self, name: &str, expected: &str) -> EthdError {
        EthdError::InvalidParameter(format!(
            "{}: argument '{}' must be {}",
            self.method, name, expected
        ))
    }

    /// A required string argument.
    pub fn string(&self, index: usize, name: &str) -> Result<String, EthdError> {
        match self.raw(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(self.invalid(name, "a string")),
            None => Err(EthdError::InvalidParameter(format!(
                "{}() missing required argument: '{}'",
                self.method, name
            ))),
        }
    }

    pub fn opt_string(&self, index: usize, name: &str) -> Result<Option<String>, EthdError> {
        match self.raw(index) {
            None => Ok(None),
            Some(_) => self.string(index, name).map(Some),
        }
    }

    pub fn bool_or(&self, index: usize, name: &str, default: bool) -> Result<bool, EthdError> {
        match self.raw(index) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(self.invalid(name, "a boolean")),
            },
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.invalid(name, "a boolean")),
            },
            Some(_) => Err(self.invalid(name, "a boolean")),
        }
    }

    /// A required unsigned integer argument.
    pub fn u64(&self, index: usize, name: &str) -> Result<u64, EthdError> {
        let parsed = match self.raw(index) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
            None => {
                return Err(EthdError::InvalidParameter(format!(
                    "{}() missing required argument: '{}'",
                    self.method, name
                )))
            }
        };
        parsed.ok_or_else(|| self.invalid(name, "a non-negative integer"))
    }

    pub fn u64_or(&self, index: usize, name: &str, default: u64) -> Result<u64, EthdError> {
        match self.raw(index) {
            None => Ok(default),
            Some(_) => self.u64(index, name),
        }
    }

    /// A finite number, or `None` when absent or unparseable.
    pub fn f64(&self, index: usize) -> Option<f64> {
        let parsed = match self.raw(index)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.filter(|x| x.is_finite())
    }
}
