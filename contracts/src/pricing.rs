//! # Phase & Pricing Policy
//!
//! The sale has exactly two phases and exactly two prices:
//!
//! | Phase   | Window                                      | Price    |
//! |---------|---------------------------------------------|----------|
//! | Presale | open time unset, or `now < open + duration` | 0.25 ETH |
//! | Public  | `now >= open + duration`                    | 0.50 ETH |
//!
//! An unset open time (`0`) keeps the sale in presale, so nothing goes on
//! public sale until the owner has scheduled it. Everything here is a pure
//! function of its inputs.

use std::fmt;
use std::time::Duration;

use presale_protocol::config::{DEFAULT_PRESALE_DURATION, PRESALE_PRICE_WEI, PUBLIC_PRICE_WEI};
use presale_protocol::Wei;
use serde::{Deserialize, Serialize};

/// Which rule set a mint is judged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalePhase {
    /// Whitelisted buyers only, discounted, capped per address.
    Presale,
    /// Anyone, full price, bounded only by total supply.
    Public,
}

impl SalePhase {
    /// Unit price for this phase.
    pub fn price(self) -> Wei {
        match self {
            SalePhase::Presale => Wei::from_wei(PRESALE_PRICE_WEI),
            SalePhase::Public => Wei::from_wei(PUBLIC_PRICE_WEI),
        }
    }
}

impl fmt::Display for SalePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalePhase::Presale => write!(f, "Presale"),
            SalePhase::Public => write!(f, "Public"),
        }
    }
}

/// Decides the phase from the presale open time and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    presale_duration_secs: u64,
}

impl PricingPolicy {
    pub fn new(presale_duration: Duration) -> Self {
        Self {
            presale_duration_secs: presale_duration.as_secs(),
        }
    }

    pub fn presale_duration(&self) -> Duration {
        Duration::from_secs(self.presale_duration_secs)
    }

    /// Unix time at which the presale ends, or `None` while the open time
    /// is unset.
    pub fn presale_end(&self, open_time: u64) -> Option<u64> {
        if open_time == 0 {
            return None;
        }
        Some(open_time.saturating_add(self.presale_duration_secs))
    }

    pub fn phase_at(&self, open_time: u64, now: u64) -> SalePhase {
        match self.presale_end(open_time) {
            Some(end) if now >= end => SalePhase::Public,
            _ => SalePhase::Presale,
        }
    }

    pub fn price_at(&self, open_time: u64, now: u64) -> Wei {
        self.phase_at(open_time, now).price()
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRESALE_DURATION)
    }
}
