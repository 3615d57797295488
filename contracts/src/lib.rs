//! # NFT Presale Contract
//!
//! On-chain logic for a two-phase NFT sale. One [`NftPresale`] instance owns
//! the whole ledger and exposes it to two roles:
//!
//! - **Owner**: schedules the presale, curates the whitelist, withdraws
//!   proceeds, and may hand the contract to someone else.
//! - **Buyers**: mint tokens against an attached payment.
//!
//! ## Modules
//!
//! - [`ownership`]: the single-owner access guard.
//! - [`pricing`]: sale phase and unit price as a function of time.
//! - [`whitelist`]: presale allowlist.
//! - [`nft_presale`]: ledger state and the public operation surface.
//! - [`invariants`]: structural checks over a ledger snapshot.
//!
//! ## Design Principles
//!
//! 1. All money is integer wei. Arithmetic is checked; overflow is an error,
//!    never a wrap.
//! 2. Validate everything, then write. A rejected call changes nothing.
//! 3. Time is injected, never read ambiently.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod error;
pub mod invariants;
pub mod nft_presale;
pub mod ownership;
pub mod pricing;
pub mod whitelist;

pub use error::PresaleError;
pub use nft_presale::{LedgerState, MintReceipt, NftPresale, PresaleConfig, SaleStatus, TokenId};
pub use pricing::SalePhase;
