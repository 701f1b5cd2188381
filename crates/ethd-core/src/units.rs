// crates/ethd-core/src/units.rs
//
// Amount types and unit conversion between the node's base unit (wei),
// the display unit (ether) and the fee-quoting unit (gwei).
//
// 1 ETH = 10^18 wei, 1 gwei = 10^9 wei. Sums are done in integer wei and
// converted to floating point only at the edge, when building a response.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EthdError, TransportError};

/// Number of wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Number of wei in one gwei.
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// An amount in wei, the node's smallest denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Wei(pub u128);

impl Wei {
    /// Create an amount from a display-unit value. Negative input clamps to zero.
    ///
    /// # Example
    /// ```
    /// use ethd_core::units::Wei;
    /// assert_eq!(Wei::from_ether(1.5).0, 1_500_000_000_000_000_000);
    /// ```
    pub fn from_ether(ether: f64) -> Self {
        Self(ether_to_wei(ether))
    }

    /// Create an amount from a fee-unit value.
    pub fn from_gwei(gwei: f64) -> Self {
        Self(gwei_to_wei(gwei))
    }

    pub fn to_ether(&self) -> f64 {
        wei_to_ether(self.0)
    }

    pub fn to_gwei(&self) -> f64 {
        wei_to_gwei(self.0)
    }

    /// Hex quantity form, as the node expects it in request params.
    pub fn to_quantity(&self) -> String {
        to_quantity(self.0)
    }

    pub fn zero() -> Self {
        Self(0)
    }
}

impl Add for Wei {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Wei {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl std::iter::Sum for Wei {
    fn sum<I: Iterator<Item = Wei>>(iter: I) -> Self {
        iter.fold(Wei::zero(), |acc, w| acc + w)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            write!(f, "{} ETH", whole)
        } else {
            // Up to 18 decimal places, trailing zeros trimmed
            let frac_str = format!("{:018}", frac);
            write!(f, "{}.{} ETH", whole, frac_str.trim_end_matches('0'))
        }
    }
}

pub fn wei_to_ether(wei: u128) -> f64 {
    wei as f64 / WEI_PER_ETHER as f64
}

pub fn ether_to_wei(ether: f64) -> u128 {
    (ether * WEI_PER_ETHER as f64).round() as u128
}

pub fn wei_to_gwei(wei: u128) -> f64 {
    wei as f64 / WEI_PER_GWEI as f64
}

pub fn gwei_to_wei(gwei: f64) -> u128 {
    (gwei * WEI_PER_GWEI as f64).round() as u128
}

pub fn ether_to_gwei(ether: f64) -> f64 {
    ether * (WEI_PER_ETHER / WEI_PER_GWEI) as f64
}

pub fn gwei_to_ether(gwei: f64) -> f64 {
    gwei / (WEI_PER_ETHER / WEI_PER_GWEI) as f64
}

/// Convert a (possibly negative) hex string such as `"-0x8"` to an integer.
pub fn hex_to_dec(hex: &str) -> Result<i128, EthdError> {
    let (negative, rest) = match hex.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, hex),
    };
    let digits = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .unwrap_or(rest);
    if digits.is_empty() {
        return Ok(0);
    }
    let value = i128::from_str_radix(digits, 16)
        .map_err(|e| malformed(format!("invalid hex quantity {:?}: {}", hex, e)))?;
    Ok(if negative { -value } else { value })
}

/// Read an unsigned quantity out of a node response value.
///
/// Hex strings and JSON integers are accepted; `null` reads as zero.
pub fn parse_quantity(value: &Value) -> Result<u128, EthdError> {
    match value {
        Value::Null => Ok(0),
        Value::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            if digits.is_empty() {
                return Ok(0);
            }
            u128::from_str_radix(digits, 16)
                .map_err(|e| malformed(format!("invalid hex quantity {:?}: {}", s, e)))
        }
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| malformed(format!("quantity {} is not an unsigned integer", n))),
        other => Err(malformed(format!("expected a quantity, got {}", other))),
    }
}

/// Like [`parse_quantity`] but for values that must fit in 64 bits
/// (block numbers, nonces, timestamps).
pub fn parse_u64_quantity(value: &Value) -> Result<u64, EthdError> {
    let wide = parse_quantity(value)?;
    u64::try_from(wide).map_err(|_| malformed(format!("quantity {} exceeds 64 bits", wide)))
}

pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

fn malformed(msg: String) -> EthdError {
    EthdError::Transport(TransportError::Malformed(msg))
}
