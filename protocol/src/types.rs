//! # Core Types
//!
//! [`Address`] identifies an account (owner or buyer). [`Wei`] is an exact
//! amount of the native currency in its smallest unit. Both serialize as
//! strings: addresses as `0x`-prefixed hex, amounts as decimal wei, because
//! a `u128` does not survive a round trip through a JSON number.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::config::{ADDRESS_LENGTH, NATIVE_DECIMALS, NATIVE_SYMBOL, WEI_PER_ETHER};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from parsing an [`Address`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The input was not valid hex.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded bytes had the wrong length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length in bytes.
        expected: usize,
        /// Length actually decoded.
        got: usize,
    },
}

/// Errors from parsing or combining [`Wei`] amounts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    /// The string was not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),

    /// More fractional digits than the currency has.
    #[error("too many decimal places: {got} (max {max})")]
    TooPrecise {
        /// Fractional digits supplied.
        got: usize,
        /// Fractional digits supported.
        max: u32,
    },

    /// The amount does not fit in 128 bits of wei.
    #[error("amount overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address::new([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// An address with every byte set to `byte`. Handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self::new([byte; ADDRESS_LENGTH])
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts 40 hex characters, with or without `0x`, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let array: [u8; ADDRESS_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self::new(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Wei
// ---------------------------------------------------------------------------

/// An exact amount of native currency, in wei.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    /// Parses a decimal ether string such as `"0.25"` or `"3"` into wei
    /// without passing through floating point.
    pub fn parse_ether(s: &str) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if frac.len() > NATIVE_DECIMALS as usize {
            return Err(AmountError::TooPrecise {
                got: frac.len(),
                max: NATIVE_DECIMALS,
            });
        }

        let whole_wei = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|_| AmountError::Overflow)?
                .checked_mul(WEI_PER_ETHER)
                .ok_or(AmountError::Overflow)?
        };

        let frac_wei = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(NATIVE_DECIMALS - frac.len() as u32);
            frac.parse::<u128>()
                .map_err(|_| AmountError::Invalid(s.to_string()))?
                * scale
        };

        whole_wei
            .checked_add(frac_wei)
            .map(Wei)
            .ok_or(AmountError::Overflow)
    }

    /// Decimal ether representation with trailing zeros trimmed, e.g. `"0.25"`.
    pub fn to_ether_string(&self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_str = format!("{:0width$}", frac, width = NATIVE_DECIMALS as usize);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_sub(self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Wei)
    }

    /// Multiplies a unit price by a token count.
    pub fn checked_mul(self, quantity: u64) -> Option<Wei> {
        self.0.checked_mul(u128::from(quantity)).map(Wei)
    }

    pub fn saturating_sub(self, other: Wei) -> Wei {
        Wei(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_ether_string(), NATIVE_SYMBOL)
    }
}

impl fmt::Debug for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wei({})", self.0)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .parse::<u128>()
            .map(Wei)
            .map_err(serde::de::Error::custom)
    }
}
