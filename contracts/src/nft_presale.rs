//! # NFT Presale Contract
//!
//! The ledger for a fixed-size NFT collection sold in two phases: a
//! whitelisted, discounted, per-address-capped presale followed by an open
//! public sale at full price.
//!
//! ## Call discipline
//!
//! Every mutating call validates first and writes last. Checks run in a
//! fixed order, cheapest and most restrictive first:
//!
//! 1. access guard (owner-only operations)
//! 2. phase / whitelist
//! 3. payment against `quantity * price`
//! 4. per-address presale cap
//! 5. global supply ceiling
//!
//! Nothing is written until every check has passed, so a rejected call
//! leaves the ledger exactly as it found it. The host is responsible for
//! running calls one at a time; the ledger itself holds no locks.
//!
//! ## State vs. clock
//!
//! [`LedgerState`] is plain data and serializes as-is. [`NftPresale`] pairs
//! it with an injected [`Clock`] so the presale/public transition can be
//! driven deterministically in tests.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use presale_protocol::config::{
    DEFAULT_PRESALE_DURATION, MAX_COLLECTION_SIZE, PER_ADDRESS_PRESALE_CAP,
};
use presale_protocol::{Address, Clock, Wei};
use serde::{Deserialize, Serialize};

use crate::error::PresaleError;
use crate::invariants::{self, InvariantViolation};
use crate::ownership::Ownable;
use crate::pricing::{PricingPolicy, SalePhase};
use crate::whitelist::Whitelist;

/// Sequential token identifier. The first token minted is `1`.
pub type TokenId = u64;

// ---------------------------------------------------------------------------
// Deployment parameters
// ---------------------------------------------------------------------------

/// Parameters fixed at deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleConfig {
    /// Collection name (e.g., "NFTPresale").
    pub name: String,
    /// Collection ticker (e.g., "NPS").
    pub symbol: String,
    /// Prefix for token metadata URIs.
    pub base_uri: String,
    /// Hard ceiling on tokens ever minted.
    pub maximum_nft_supply: u64,
    /// Length of the presale window once it opens.
    #[serde(default = "default_presale_duration_secs")]
    pub presale_duration_secs: u64,
}

fn default_presale_duration_secs() -> u64 {
    DEFAULT_PRESALE_DURATION.as_secs()
}

impl PresaleConfig {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        base_uri: impl Into<String>,
        maximum_nft_supply: u64,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            base_uri: base_uri.into(),
            maximum_nft_supply,
            presale_duration_secs: default_presale_duration_secs(),
        }
    }

    pub fn with_presale_duration(mut self, duration: Duration) -> Self {
        self.presale_duration_secs = duration.as_secs();
        self
    }

    /// Rejects parameters no sale could run with.
    pub fn validate(&self) -> Result<(), PresaleError> {
        if self.name.trim().is_empty() {
            return Err(PresaleError::InvalidConfiguration(
                "name must not be empty".into(),
            ));
        }
        if self.symbol.trim().is_empty() {
            return Err(PresaleError::InvalidConfiguration(
                "symbol must not be empty".into(),
            ));
        }
        if self.maximum_nft_supply == 0 {
            return Err(PresaleError::InvalidConfiguration(
                "maximum supply must be positive".into(),
            ));
        }
        if self.maximum_nft_supply > MAX_COLLECTION_SIZE {
            return Err(PresaleError::InvalidConfiguration(format!(
                "maximum supply {} exceeds collection limit {}",
                self.maximum_nft_supply, MAX_COLLECTION_SIZE
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger state
// ---------------------------------------------------------------------------

/// All mutable and immutable state of one presale contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) name: String,
    pub(crate) symbol: String,
    pub(crate) base_uri: String,
    pub(crate) ownership: Ownable,
    /// Unix seconds; `0` until the owner schedules the presale.
    pub(crate) presale_open_time: u64,
    pub(crate) pricing: PricingPolicy,
    pub(crate) maximum_nft_supply: u64,
    pub(crate) total_supply: u64,
    pub(crate) balances: BTreeMap<Address, u64>,
    /// Tokens each address bought while the presale was running. Only ever
    /// grows, so the per-address cap holds no matter where the clock goes.
    pub(crate) presale_minted: BTreeMap<Address, u64>,
    /// `holders[i]` owns token id `i + 1`.
    pub(crate) holders: Vec<Address>,
    pub(crate) whitelist: Whitelist,
    /// Payments received and not yet withdrawn.
    pub(crate) proceeds: Wei,
    pub(crate) deployed_at: DateTime<Utc>,
}

impl LedgerState {
    fn deploy(config: PresaleConfig, owner: Address, now: u64) -> Self {
        Self {
            name: config.name,
            symbol: config.symbol,
            base_uri: config.base_uri,
            ownership: Ownable::new(owner),
            presale_open_time: 0,
            pricing: PricingPolicy::new(Duration::from_secs(config.presale_duration_secs)),
            maximum_nft_supply: config.maximum_nft_supply,
            total_supply: 0,
            balances: BTreeMap::new(),
            presale_minted: BTreeMap::new(),
            holders: Vec::new(),
            whitelist: Whitelist::new(),
            proceeds: Wei::ZERO,
            deployed_at: i64::try_from(now)
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts and status
// ---------------------------------------------------------------------------

/// What an accepted mint did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub buyer: Address,
    /// First token id issued by this call.
    pub first_token_id: TokenId,
    pub quantity: u64,
    pub phase: SalePhase,
    /// Unit price charged.
    pub price: Wei,
    /// `quantity * price`.
    pub required: Wei,
    /// Payment attached to the call. All of it is retained.
    pub paid: Wei,
    /// `paid - required`.
    pub excess: Wei,
}

impl MintReceipt {
    /// Every token id issued by this call. Empty when `quantity` is zero.
    pub fn token_ids(&self) -> Range<TokenId> {
        self.first_token_id..self.first_token_id.saturating_add(self.quantity)
    }
}

/// Point-in-time summary of the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleStatus {
    pub name: String,
    pub symbol: String,
    pub owner: Address,
    pub phase: SalePhase,
    pub price: Wei,
    pub now: u64,
    pub presale_open_time: u64,
    pub presale_end: Option<u64>,
    pub presale_duration_secs: u64,
    pub deployed_at: DateTime<Utc>,
    pub total_supply: u64,
    pub maximum_nft_supply: u64,
    pub remaining_supply: u64,
    pub whitelist_size: usize,
    pub proceeds: Wei,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A presale contract instance: ledger state plus the clock it reads.
pub struct NftPresale {
    state: LedgerState,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for NftPresale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NftPresale")
            .field("state", &self.state)
            .field("now", &self.clock.now())
            .finish()
    }
}

impl NftPresale {
    /// Deploys a fresh contract owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`PresaleError::InvalidConfiguration`] if `config` fails
    /// [`PresaleConfig::validate`].
    pub fn deploy(
        config: PresaleConfig,
        owner: Address,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PresaleError> {
        config.validate()?;
        tracing::info!(
            name = %config.name,
            symbol = %config.symbol,
            maximum_nft_supply = config.maximum_nft_supply,
            %owner,
            "presale contract deployed"
        );
        Ok(Self {
            state: LedgerState::deploy(config, owner, clock.now()),
            clock,
        })
    }

    /// Rehydrates a contract from previously saved state.
    ///
    /// The state is checked against the ledger invariants before it is
    /// accepted, so a corrupt snapshot cannot come back to life.
    pub fn from_state(state: LedgerState, clock: Arc<dyn Clock>) -> Result<Self, InvariantViolation> {
        invariants::verify(&state)?;
        Ok(Self { state, clock })
    }

    /// The full ledger state. Clone it to take a snapshot.
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Replaces the ledger state wholesale. Used by hosts to roll back an
    /// accepted call whose side effects (e.g. persistence) failed.
    pub fn restore(&mut self, state: LedgerState) {
        self.state = state;
    }

    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        invariants::verify(&self.state)
    }

    // -- Queries ------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn symbol(&self) -> &str {
        &self.state.symbol
    }

    pub fn base_uri(&self) -> &str {
        &self.state.base_uri
    }

    pub fn owner(&self) -> Address {
        self.state.ownership.owner()
    }

    pub fn presale_open_time(&self) -> u64 {
        self.state.presale_open_time
    }

    pub fn presale_end(&self) -> Option<u64> {
        self.state.pricing.presale_end(self.state.presale_open_time)
    }

    pub fn presale_duration(&self) -> Duration {
        self.state.pricing.presale_duration()
    }

    pub fn deployed_at(&self) -> DateTime<Utc> {
        self.state.deployed_at
    }

    /// Current sale phase according to the injected clock.
    pub fn phase(&self) -> SalePhase {
        self.state
            .pricing
            .phase_at(self.state.presale_open_time, self.clock.now())
    }

    /// Current unit price.
    pub fn get_price(&self) -> Wei {
        self.phase().price()
    }

    pub fn is_whitelisted(&self, identity: &Address) -> bool {
        self.state.whitelist.contains(identity)
    }

    /// Alias matching the contract's public mapping name.
    pub fn whitelisted_addresses(&self, identity: &Address) -> bool {
        self.is_whitelisted(identity)
    }

    pub fn whitelist_len(&self) -> usize {
        self.state.whitelist.len()
    }

    pub fn balance_of(&self, identity: &Address) -> u64 {
        self.state.balances.get(identity).copied().unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.state.total_supply
    }

    pub fn maximum_nft_supply(&self) -> u64 {
        self.state.maximum_nft_supply
    }

    /// Payments held by the contract and not yet withdrawn.
    pub fn proceeds(&self) -> Wei {
        self.state.proceeds
    }

    /// Holder of `token_id`.
    pub fn owner_of(&self, token_id: TokenId) -> Result<Address, PresaleError> {
        token_id
            .checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.state.holders.get(idx))
            .copied()
            .ok_or(PresaleError::TokenNotFound(token_id))
    }

    /// Metadata URI for a minted token: the base URI joined with the id.
    pub fn token_uri(&self, token_id: TokenId) -> Result<String, PresaleError> {
        self.owner_of(token_id)?;
        let base = &self.state.base_uri;
        if base.is_empty() || base.ends_with('/') {
            Ok(format!("{}{}", base, token_id))
        } else {
            Ok(format!("{}/{}", base, token_id))
        }
    }

    /// Token ids held by `identity`, ascending.
    ///
    /// Scans every minted token; there is no per-owner index.
    pub fn tokens_of_owner(&self, identity: &Address) -> Vec<TokenId> {
        self.state
            .holders
            .iter()
            .zip(1u64..)
            .filter(|(holder, _)| *holder == identity)
            .map(|(_, id)| id)
            .collect()
    }

    pub fn status(&self) -> SaleStatus {
        let now = self.clock.now();
        let phase = self
            .state
            .pricing
            .phase_at(self.state.presale_open_time, now);
        SaleStatus {
            name: self.state.name.clone(),
            symbol: self.state.symbol.clone(),
            owner: self.owner(),
            phase,
            price: phase.price(),
            now,
            presale_open_time: self.state.presale_open_time,
            presale_end: self.presale_end(),
            presale_duration_secs: self.presale_duration().as_secs(),
            deployed_at: self.deployed_at(),
            total_supply: self.state.total_supply,
            maximum_nft_supply: self.state.maximum_nft_supply,
            remaining_supply: self
                .state
                .maximum_nft_supply
                .saturating_sub(self.state.total_supply),
            whitelist_size: self.state.whitelist.len(),
            proceeds: self.state.proceeds,
        }
    }

    // -- Owner operations ---------------------------------------------------

    /// Schedules the presale to open at `timestamp` (unix seconds).
    ///
    /// The open time can be written any number of times while it is still
    /// `0`. Once it holds a non-zero value it is fixed for good.
    ///
    /// # Errors
    ///
    /// - [`PresaleError::Unauthorized`] if `caller` is not the owner.
    /// - [`PresaleError::PresaleTimeLocked`] if an open time is already set.
    pub fn set_presale_open_time(
        &mut self,
        caller: &Address,
        timestamp: u64,
    ) -> Result<(), PresaleError> {
        self.state.ownership.ensure_owner(caller)?;
        if self.state.presale_open_time != 0 {
            return Err(PresaleError::PresaleTimeLocked {
                open_time: self.state.presale_open_time,
            });
        }

        self.state.presale_open_time = timestamp;
        tracing::info!(
            open_time = timestamp,
            presale_end = ?self.presale_end(),
            "presale open time set"
        );
        Ok(())
    }

    /// Admits every address in `identities` to the presale. Re-adding a
    /// member is not an error. Returns the number of newly admitted members.
    ///
    /// # Errors
    ///
    /// [`PresaleError::Unauthorized`] if `caller` is not the owner.
    pub fn whitelist_users(
        &mut self,
        caller: &Address,
        identities: &[Address],
    ) -> Result<usize, PresaleError> {
        self.state.ownership.ensure_owner(caller)?;
        let added = self.state.whitelist.add_all(identities);
        tracing::info!(
            requested = identities.len(),
            added,
            whitelist_size = self.state.whitelist.len(),
            "whitelist updated"
        );
        Ok(added)
    }

    /// Hands the contract to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, PresaleError> {
        let previous = self.state.ownership.transfer(caller, new_owner)?;
        tracing::info!(%previous, %new_owner, "ownership transferred");
        Ok(previous)
    }

    /// Drains all accumulated proceeds to the owner and returns the amount.
    pub fn withdraw(&mut self, caller: &Address) -> Result<Wei, PresaleError> {
        self.state.ownership.ensure_owner(caller)?;
        let amount = std::mem::replace(&mut self.state.proceeds, Wei::ZERO);
        tracing::info!(%amount, owner = %caller, "proceeds withdrawn");
        Ok(amount)
    }

    // -- Buyer operations ---------------------------------------------------

    /// Mints `quantity` tokens to `caller` against an attached `payment`.
    ///
    /// Overpayment is accepted and kept in the contract's proceeds along
    /// with the rest of the payment.
    ///
    /// # Errors
    ///
    /// Checked in this order, before any state is touched:
    ///
    /// - [`PresaleError::InvalidQuantity`] if `quantity` is zero.
    /// - [`PresaleError::NotWhitelisted`] during presale for unlisted callers.
    /// - [`PresaleError::InsufficientFunds`] if `payment < quantity * price`.
    /// - [`PresaleError::PresaleCapExceeded`] during presale if the caller
    ///   would end up holding more than the per-address cap.
    /// - [`PresaleError::SupplyExceeded`] if total supply would pass the
    ///   ceiling.
    /// - [`PresaleError::ArithmeticOverflow`] if any counter would overflow.
    pub fn mint(
        &mut self,
        caller: Address,
        quantity: u64,
        payment: Wei,
    ) -> Result<MintReceipt, PresaleError> {
        if quantity == 0 {
            return Err(PresaleError::InvalidQuantity);
        }

        let phase = self.phase();
        if phase == SalePhase::Presale && !self.state.whitelist.contains(&caller) {
            return Err(PresaleError::NotWhitelisted { caller });
        }

        let price = phase.price();
        let required = price
            .checked_mul(quantity)
            .ok_or(PresaleError::ArithmeticOverflow)?;
        if payment < required {
            return Err(PresaleError::InsufficientFunds {
                required,
                paid: payment,
            });
        }

        let held = self.balance_of(&caller);
        let new_balance = held
            .checked_add(quantity)
            .ok_or(PresaleError::ArithmeticOverflow)?;
        if phase == SalePhase::Presale && new_balance > PER_ADDRESS_PRESALE_CAP {
            return Err(PresaleError::PresaleCapExceeded {
                held,
                requested: quantity,
                cap: PER_ADDRESS_PRESALE_CAP,
            });
        }

        let new_supply = match self.state.total_supply.checked_add(quantity) {
            Some(supply) if supply <= self.state.maximum_nft_supply => supply,
            _ => {
                return Err(PresaleError::SupplyExceeded {
                    total_supply: self.state.total_supply,
                    requested: quantity,
                    maximum: self.state.maximum_nft_supply,
                })
            }
        };

        let new_proceeds = self
            .state
            .proceeds
            .checked_add(payment)
            .ok_or(PresaleError::ArithmeticOverflow)?;
        let issued = usize::try_from(quantity).map_err(|_| PresaleError::ArithmeticOverflow)?;
        let presale_minted = match phase {
            SalePhase::Presale => Some(
                self.state
                    .presale_minted
                    .get(&caller)
                    .copied()
                    .unwrap_or(0)
                    .checked_add(quantity)
                    .ok_or(PresaleError::ArithmeticOverflow)?,
            ),
            SalePhase::Public => None,
        };

        // All checks passed. Commit.
        let first_token_id = self.state.total_supply + 1;
        self.state.balances.insert(caller, new_balance);
        if let Some(minted) = presale_minted {
            self.state.presale_minted.insert(caller, minted);
        }
        self.state.total_supply = new_supply;
        self.state
            .holders
            .extend(std::iter::repeat(caller).take(issued));
        self.state.proceeds = new_proceeds;

        debug_assert!(self.verify_invariants().is_ok());

        let receipt = MintReceipt {
            buyer: caller,
            first_token_id,
            quantity,
            phase,
            price,
            required,
            paid: payment,
            excess: payment.saturating_sub(required),
        };
        tracing::info!(
            buyer = %caller,
            quantity,
            %phase,
            first_token_id,
            total_supply = new_supply,
            paid = %payment,
            "tokens minted"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presale_protocol::config::{PRESALE_PRICE_WEI, PUBLIC_PRICE_WEI};
    use presale_protocol::ManualClock;

    const OPEN: u64 = 1_700_000_000;
    const HOUR: Duration = Duration::from_secs(3_600);

    fn owner() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn buyer(n: u8) -> Address {
        Address::repeat_byte(n)
    }

    fn presale(max: u64) -> (NftPresale, ManualClock) {
        let clock = ManualClock::new(OPEN);
        let config = PresaleConfig::new("NFTPresale", "NPS", "https://meta.example/", max)
            .with_presale_duration(HOUR);
        let contract = NftPresale::deploy(config, owner(), Arc::new(clock.clone())).unwrap();
        (contract, clock)
    }

    fn ether(s: &str) -> Wei {
        Wei::parse_ether(s).unwrap()
    }

    #[test]
    fn deploy_starts_empty() {
        let (c, _) = presale(100);
        assert_eq!(c.owner(), owner());
        assert_eq!(c.name(), "NFTPresale");
        assert_eq!(c.symbol(), "NPS");
        assert_eq!(c.presale_open_time(), 0);
        assert_eq!(c.total_supply(), 0);
        assert_eq!(c.maximum_nft_supply(), 100);
        assert_eq!(c.whitelist_len(), 0);
        assert_eq!(c.proceeds(), Wei::ZERO);
        assert_eq!(c.phase(), SalePhase::Presale);
        assert!(c.verify_invariants().is_ok());
    }

    #[test]
    fn deploy_rejects_bad_config() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        for config in [
            PresaleConfig::new("", "NPS", "", 10),
            PresaleConfig::new("N", " ", "", 10),
            PresaleConfig::new("N", "S", "", 0),
            PresaleConfig::new("N", "S", "", MAX_COLLECTION_SIZE + 1),
        ] {
            let err = NftPresale::deploy(config, owner(), clock.clone()).unwrap_err();
            assert!(matches!(err, PresaleError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn open_time_is_set_once() {
        let (mut c, _) = presale(100);
        c.set_presale_open_time(&owner(), 0).unwrap();
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        assert_eq!(c.presale_open_time(), OPEN);
        assert_eq!(c.presale_end(), Some(OPEN + 3_600));

        let err = c.set_presale_open_time(&owner(), OPEN + 5).unwrap_err();
        assert_eq!(err, PresaleError::PresaleTimeLocked { open_time: OPEN });
        assert_eq!(c.presale_open_time(), OPEN);
    }

    #[test]
    fn mint_zero_is_rejected() {
        let (mut c, _) = presale(100);
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        assert_eq!(
            c.mint(buyer(1), 0, Wei::ZERO),
            Err(PresaleError::InvalidQuantity)
        );
    }

    #[test]
    fn receipt_records_price_and_excess() {
        let (mut c, _) = presale(100);
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();

        let receipt = c.mint(buyer(1), 2, ether("0.6")).unwrap();
        assert_eq!(receipt.phase, SalePhase::Presale);
        assert_eq!(receipt.price.as_u128(), PRESALE_PRICE_WEI);
        assert_eq!(receipt.required.as_u128(), PUBLIC_PRICE_WEI);
        assert_eq!(receipt.excess, ether("0.1"));
        assert_eq!(receipt.token_ids(), 1..3);
        assert_eq!(c.proceeds(), ether("0.6"));
    }

    #[test]
    fn token_ids_are_sequential_across_buyers() {
        let (mut c, clock) = presale(100);
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        clock.advance(HOUR);

        c.mint(buyer(1), 3, ether("1.5")).unwrap();
        let second = c.mint(buyer(2), 2, ether("1")).unwrap();
        assert_eq!(second.token_ids(), 4..6);

        assert_eq!(c.owner_of(1), Ok(buyer(1)));
        assert_eq!(c.owner_of(3), Ok(buyer(1)));
        assert_eq!(c.owner_of(4), Ok(buyer(2)));
        assert_eq!(c.owner_of(0), Err(PresaleError::TokenNotFound(0)));
        assert_eq!(c.owner_of(6), Err(PresaleError::TokenNotFound(6)));
        assert_eq!(c.tokens_of_owner(&buyer(2)), vec![4, 5]);
        assert!(c.tokens_of_owner(&buyer(9)).is_empty());
    }

    #[test]
    fn token_uri_joins_base_and_id() {
        let (mut c, clock) = presale(10);
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        clock.advance(HOUR);
        c.mint(buyer(1), 1, ether("0.5")).unwrap();
        assert_eq!(c.token_uri(1).unwrap(), "https://meta.example/1");
        assert_eq!(c.token_uri(2), Err(PresaleError::TokenNotFound(2)));

        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let mut bare = NftPresale::deploy(
            PresaleConfig::new("NFTPresale", "NPS", "google.com", 5),
            owner(),
            clock,
        )
        .unwrap();
        bare.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        bare.mint(buyer(1), 1, ether("0.25")).unwrap();
        assert_eq!(bare.token_uri(1).unwrap(), "google.com/1");
    }

    #[test]
    fn withdraw_drains_proceeds_to_owner_only() {
        let (mut c, _) = presale(100);
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        c.mint(buyer(1), 1, ether("0.3")).unwrap();

        assert_eq!(
            c.withdraw(&buyer(1)),
            Err(PresaleError::Unauthorized { caller: buyer(1) })
        );
        assert_eq!(c.withdraw(&owner()), Ok(ether("0.3")));
        assert_eq!(c.proceeds(), Wei::ZERO);
        assert_eq!(c.withdraw(&owner()), Ok(Wei::ZERO));
    }

    #[test]
    fn new_owner_takes_over_privileges() {
        let (mut c, _) = presale(100);
        let heir = buyer(7);
        assert_eq!(c.transfer_ownership(&owner(), heir), Ok(owner()));
        assert_eq!(c.owner(), heir);
        assert!(c.whitelist_users(&owner(), &[buyer(1)]).is_err());
        assert!(c.whitelist_users(&heir, &[buyer(1)]).is_ok());
    }

    #[test]
    fn status_reflects_phase_and_supply() {
        let (mut c, clock) = presale(10);
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        c.whitelist_users(&owner(), &[buyer(1), buyer(2)]).unwrap();
        c.mint(buyer(1), 2, ether("0.5")).unwrap();

        let s = c.status();
        assert_eq!(s.phase, SalePhase::Presale);
        assert_eq!(s.price.as_u128(), PRESALE_PRICE_WEI);
        assert_eq!(s.total_supply, 2);
        assert_eq!(s.remaining_supply, 8);
        assert_eq!(s.whitelist_size, 2);
        assert_eq!(s.presale_end, Some(OPEN + 3_600));

        clock.advance(HOUR);
        let s = c.status();
        assert_eq!(s.phase, SalePhase::Public);
        assert_eq!(s.price.as_u128(), PUBLIC_PRICE_WEI);
    }

    #[test]
    fn restore_rolls_back_a_mint() {
        let (mut c, _) = presale(100);
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        let before = c.state().clone();

        c.mint(buyer(1), 1, ether("0.25")).unwrap();
        assert_ne!(c.state(), &before);

        c.restore(before.clone());
        assert_eq!(c.state(), &before);
        assert_eq!(c.total_supply(), 0);
        assert_eq!(c.balance_of(&buyer(1)), 0);
    }

    #[test]
    fn from_state_round_trips_through_serde() {
        let (mut c, clock) = presale(100);
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        c.mint(buyer(1), 2, ether("0.5")).unwrap();

        let json = serde_json::to_string(c.state()).unwrap();
        let state: LedgerState = serde_json::from_str(&json).unwrap();
        let back = NftPresale::from_state(state, Arc::new(clock)).unwrap();
        assert_eq!(back.balance_of(&buyer(1)), 2);
        assert_eq!(back.total_supply(), 2);
        assert!(back.is_whitelisted(&buyer(1)));
    }

    #[test]
    fn deployment_time_comes_from_the_clock() {
        let (c, _) = presale(10);
        assert_eq!(c.deployed_at().timestamp(), OPEN as i64);

        let s = c.status();
        assert_eq!(s.deployed_at, c.deployed_at());
        assert_eq!(s.presale_duration_secs, 3_600);
    }

    #[test]
    fn empty_receipt_has_no_token_ids() {
        let receipt = MintReceipt {
            buyer: buyer(1),
            first_token_id: 0,
            quantity: 0,
            phase: SalePhase::Public,
            price: Wei::ZERO,
            required: Wei::ZERO,
            paid: Wei::ZERO,
            excess: Wei::ZERO,
        };
        assert!(receipt.token_ids().is_empty());
    }

    #[test]
    fn only_presale_mints_count_against_the_cap() {
        let (mut c, clock) = presale(100);
        c.set_presale_open_time(&owner(), OPEN).unwrap();
        c.whitelist_users(&owner(), &[buyer(1)]).unwrap();
        c.mint(buyer(1), 1, ether("0.25")).unwrap();

        clock.advance(HOUR);
        c.mint(buyer(1), 4, ether("2")).unwrap();

        assert_eq!(c.balance_of(&buyer(1)), 5);
        assert_eq!(c.state().presale_minted.get(&buyer(1)), Some(&1));
        assert!(c.verify_invariants().is_ok());
    }
}
