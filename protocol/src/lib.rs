// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Presale Protocol: Shared Primitives
//!
//! The small vocabulary every other crate in the workspace speaks:
//!
//! - **types**: [`Address`](types::Address) identities and exact
//!   [`Wei`](types::Wei) amounts. No floats anywhere near money.
//! - **clock**: the [`Clock`](clock::Clock) seam that decides what "now"
//!   means. Production reads the wall clock; tests drive a manual one.
//! - **config**: sale constants (prices, caps, durations, ports).
//!
//! Nothing in here holds mutable sale state. That lives in the contracts
//! crate, which owns the ledger outright.

pub mod clock;
pub mod config;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{Address, Wei};
