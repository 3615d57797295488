//! # Ledger Invariants
//!
//! Structural checks over a [`LedgerState`]. They hold after every accepted
//! call; the contract asserts them in debug builds and hosts run them when
//! loading a saved ledger.

use std::collections::BTreeMap;

use presale_protocol::config::PER_ADDRESS_PRESALE_CAP;
use presale_protocol::Address;
use thiserror::Error;

use crate::nft_presale::LedgerState;

/// A broken ledger invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("total supply {total_supply} != sum of balances {sum_of_balances}")]
    SupplyMismatch {
        total_supply: u64,
        sum_of_balances: u128,
    },

    #[error("total supply {total_supply} exceeds maximum {maximum}")]
    SupplyAboveCeiling { total_supply: u64, maximum: u64 },

    #[error("total supply {total_supply} != number of tracked tokens {tracked}")]
    TokenCountMismatch { total_supply: u64, tracked: usize },

    #[error("balance of {address} is {recorded} but it holds {held} tokens")]
    BalanceMismatch {
        address: Address,
        recorded: u64,
        held: u64,
    },

    #[error("{address} minted {minted} tokens during presale (cap {cap})")]
    PresaleCapBreached {
        address: Address,
        minted: u64,
        cap: u64,
    },

    #[error("{address} minted {minted} tokens during presale but holds {balance}")]
    PresaleMintsAboveBalance {
        address: Address,
        minted: u64,
        balance: u64,
    },
}

/// Checks every structural invariant of `state`.
///
/// None of the checks read the clock: a ledger that was valid when saved
/// stays valid however the host's time moves afterwards.
pub fn verify(state: &LedgerState) -> Result<(), InvariantViolation> {
    let sum_of_balances: u128 = state.balances.values().map(|b| u128::from(*b)).sum();
    if sum_of_balances != u128::from(state.total_supply) {
        return Err(InvariantViolation::SupplyMismatch {
            total_supply: state.total_supply,
            sum_of_balances,
        });
    }

    if state.total_supply > state.maximum_nft_supply {
        return Err(InvariantViolation::SupplyAboveCeiling {
            total_supply: state.total_supply,
            maximum: state.maximum_nft_supply,
        });
    }

    if state.holders.len() as u64 != state.total_supply {
        return Err(InvariantViolation::TokenCountMismatch {
            total_supply: state.total_supply,
            tracked: state.holders.len(),
        });
    }

    let mut held: BTreeMap<&Address, u64> = BTreeMap::new();
    for holder in &state.holders {
        *held.entry(holder).or_insert(0) += 1;
    }
    for (address, recorded) in &state.balances {
        let count = held.remove(address).unwrap_or(0);
        if count != *recorded {
            return Err(InvariantViolation::BalanceMismatch {
                address: *address,
                recorded: *recorded,
                held: count,
            });
        }
    }
    // Tokens held by an address with no balance entry.
    if let Some((address, count)) = held.into_iter().next() {
        return Err(InvariantViolation::BalanceMismatch {
            address: *address,
            recorded: 0,
            held: count,
        });
    }

    for (address, minted) in &state.presale_minted {
        if *minted > PER_ADDRESS_PRESALE_CAP {
            return Err(InvariantViolation::PresaleCapBreached {
                address: *address,
                minted: *minted,
                cap: PER_ADDRESS_PRESALE_CAP,
            });
        }
        let balance = state.balances.get(address).copied().unwrap_or(0);
        if *minted > balance {
            return Err(InvariantViolation::PresaleMintsAboveBalance {
                address: *address,
                minted: *minted,
                balance,
            });
        }
    }

    Ok(())
}
