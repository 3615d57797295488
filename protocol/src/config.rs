//! # Sale Configuration & Constants
//!
//! Every number that shapes the sale lives here. The prices and the presale
//! cap are part of the sale's public terms: buyers were promised them, so
//! they are constants, not knobs.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Version of the presale contract semantics implemented by this workspace.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Decimal places of the native currency. 1 ether = 10^18 wei.
pub const NATIVE_DECIMALS: u32 = 18;

/// Wei in one whole unit of the native currency.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Wei in one gwei. Used where a value has to fit an `i64` gauge.
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Ticker shown next to formatted amounts.
pub const NATIVE_SYMBOL: &str = "ETH";

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Per-token price while the presale window is open: 0.25 ETH.
pub const PRESALE_PRICE_WEI: u128 = 250_000_000_000_000_000;

/// Per-token price once the sale is public: 0.50 ETH.
pub const PUBLIC_PRICE_WEI: u128 = 500_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum tokens a single address may hold while the presale is running.
pub const PER_ADDRESS_PRESALE_CAP: u64 = 2;

/// How long the presale lasts after its open time unless a deployment says
/// otherwise.
pub const DEFAULT_PRESALE_DURATION: Duration = Duration::from_secs(86_400);

/// Largest collection a single contract will accept. Each minted token is
/// tracked individually, so the ceiling bounds ledger memory.
pub const MAX_COLLECTION_SIZE: u64 = 1_000_000;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Default port for the JSON-RPC / REST API.
pub const DEFAULT_API_PORT: u16 = 9841;

/// Default port for the Prometheus endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Key under which the node stores the ledger snapshot.
pub const LEDGER_SNAPSHOT_KEY: &[u8] = b"ledger_snapshot";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_price_is_double_presale_price() {
        assert_eq!(PUBLIC_PRICE_WEI, PRESALE_PRICE_WEI * 2);
    }

    #[test]
    fn prices_match_their_ether_values() {
        assert_eq!(PRESALE_PRICE_WEI * 4, WEI_PER_ETHER);
        assert_eq!(PUBLIC_PRICE_WEI * 2, WEI_PER_ETHER);
        assert_eq!(10u128.pow(NATIVE_DECIMALS), WEI_PER_ETHER);
    }

    #[test]
    fn ports_are_distinct() {
        assert_ne!(DEFAULT_API_PORT, DEFAULT_METRICS_PORT);
    }
}
