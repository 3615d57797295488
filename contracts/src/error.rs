//! Error types for the presale contract.
//!
//! Every rejected call returns a [`PresaleError`] and leaves the ledger
//! exactly as it was. None of these are transient: retrying the same call
//! against the same state fails the same way.

use presale_protocol::{Address, Wei};
use thiserror::Error;

use crate::nft_presale::TokenId;

/// Reasons a presale operation can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresaleError {
    /// A non-owner called an owner-only operation.
    #[error("unauthorized: {caller} is not the contract owner")]
    Unauthorized {
        /// The identity that attempted the call.
        caller: Address,
    },

    /// A presale purchase from an address that is not on the whitelist.
    #[error("not whitelisted: {caller} cannot mint during the presale")]
    NotWhitelisted {
        /// The buyer that was turned away.
        caller: Address,
    },

    /// The attached payment does not cover `quantity * price`.
    #[error("insufficient funds: required {required}, paid {paid}")]
    InsufficientFunds {
        /// Payment needed for the requested quantity.
        required: Wei,
        /// Payment actually attached.
        paid: Wei,
    },

    /// The buyer would hold more than the per-address presale cap.
    #[error("presale cap exceeded: holding {held}, requested {requested}, cap {cap}")]
    PresaleCapExceeded {
        /// Tokens the buyer already holds.
        held: u64,
        /// Tokens requested in this call.
        requested: u64,
        /// Per-address presale cap.
        cap: u64,
    },

    /// The mint would push total supply past the ceiling.
    #[error("supply exceeded: {total_supply} minted, requested {requested}, maximum {maximum}")]
    SupplyExceeded {
        /// Tokens minted so far.
        total_supply: u64,
        /// Tokens requested in this call.
        requested: u64,
        /// Immutable supply ceiling.
        maximum: u64,
    },

    /// `mint` was called with a quantity of zero.
    #[error("invalid quantity: must mint at least one token")]
    InvalidQuantity,

    /// The presale open time has already been fixed.
    #[error("presale open time already set to {open_time}")]
    PresaleTimeLocked {
        /// The open time currently in force.
        open_time: u64,
    },

    /// A price, balance or supply computation would overflow.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The token id has not been minted.
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),

    /// Deployment parameters are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl PresaleError {
    /// A stable, lowercase label for the rejection reason. Used as a metric
    /// label and in RPC error data.
    pub fn reason(&self) -> &'static str {
        match self {
            PresaleError::Unauthorized { .. } => "unauthorized",
            PresaleError::NotWhitelisted { .. } => "not_whitelisted",
            PresaleError::InsufficientFunds { .. } => "insufficient_funds",
            PresaleError::PresaleCapExceeded { .. } => "presale_cap_exceeded",
            PresaleError::SupplyExceeded { .. } => "supply_exceeded",
            PresaleError::InvalidQuantity => "invalid_quantity",
            PresaleError::PresaleTimeLocked { .. } => "presale_time_locked",
            PresaleError::ArithmeticOverflow => "arithmetic_overflow",
            PresaleError::TokenNotFound(_) => "token_not_found",
            PresaleError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}
