//! Integration tests for the presale contract.
//!
//! These walk the sale through its lifecycle the way a deployment would:
//! deploy, schedule, whitelist, presale mints, time passes, public mints,
//! sell-out, withdrawal.

use std::sync::Arc;
use std::time::Duration;

use presale_contracts::{NftPresale, PresaleConfig, PresaleError, SalePhase};
use presale_protocol::config::{PER_ADDRESS_PRESALE_CAP, PRESALE_PRICE_WEI, PUBLIC_PRICE_WEI};
use presale_protocol::{Address, ManualClock, Wei};

const PRESALE_WINDOW: Duration = Duration::from_secs(86_400);
const START: u64 = 1_735_689_600; // 2025-01-01T00:00:00Z

/// Deploys the contract the way the deploy script does, with `max` supply.
fn deploy(max: u64) -> (NftPresale, ManualClock) {
    let clock = ManualClock::new(START);
    let config = PresaleConfig::new("NFTPresale", "NPS", "google.com", max)
        .with_presale_duration(PRESALE_WINDOW);
    let contract = NftPresale::deploy(config, owner(), Arc::new(clock.clone())).unwrap();
    (contract, clock)
}

fn owner() -> Address {
    Address::repeat_byte(0x01)
}

fn user2() -> Address {
    Address::repeat_byte(0x02)
}

fn user3() -> Address {
    Address::repeat_byte(0x03)
}

fn ether(s: &str) -> Wei {
    Wei::parse_ether(s).unwrap()
}

// ---------------------------------------------------------------------------
// Access control
// ---------------------------------------------------------------------------

#[test]
fn non_owner_cannot_configure() {
    let (mut c, _) = deploy(100);

    assert_eq!(
        c.set_presale_open_time(&user2(), 1),
        Err(PresaleError::Unauthorized { caller: user2() })
    );
    assert_eq!(
        c.whitelist_users(&user3(), &[user3()]),
        Err(PresaleError::Unauthorized { caller: user3() })
    );
    assert_eq!(
        c.transfer_ownership(&user2(), user2()),
        Err(PresaleError::Unauthorized { caller: user2() })
    );

    assert_eq!(c.presale_open_time(), 0);
    assert!(!c.is_whitelisted(&user3()));
    assert_eq!(c.owner(), owner());
}

#[test]
fn owner_accepts_small_and_current_open_times() {
    let (mut small, _) = deploy(100);
    small.set_presale_open_time(&owner(), 100).unwrap();
    assert_eq!(small.presale_open_time(), 100);

    let (mut current, _) = deploy(100);
    current.set_presale_open_time(&owner(), START).unwrap();
    assert_eq!(current.presale_open_time(), START);
}

// ---------------------------------------------------------------------------
// Presale scenario
// ---------------------------------------------------------------------------

#[test]
fn presale_scenario() {
    let (mut c, _) = deploy(100);
    c.set_presale_open_time(&owner(), START).unwrap();
    assert_eq!(c.phase(), SalePhase::Presale);
    assert_eq!(c.get_price().as_u128(), PRESALE_PRICE_WEI);

    // Not on the list yet.
    assert_eq!(
        c.mint(user2(), 1, ether("0.25")),
        Err(PresaleError::NotWhitelisted { caller: user2() })
    );

    c.whitelist_users(&owner(), &[user2()]).unwrap();
    assert!(c.whitelisted_addresses(&user2()));

    let receipt = c.mint(user2(), 1, ether("0.25")).unwrap();
    assert_eq!(receipt.first_token_id, 1);
    assert_eq!(c.balance_of(&user2()), 1);
    assert_eq!(c.total_supply(), 1);

    // Short by 0.01.
    assert_eq!(
        c.mint(user2(), 1, ether("0.24")),
        Err(PresaleError::InsufficientFunds {
            required: ether("0.25"),
            paid: ether("0.24"),
        })
    );

    // Holding 1, asking for 2 more: 3 > cap.
    assert_eq!(
        c.mint(user2(), 2, ether("0.5")),
        Err(PresaleError::PresaleCapExceeded {
            held: 1,
            requested: 2,
            cap: PER_ADDRESS_PRESALE_CAP,
        })
    );

    // Topping up to exactly the cap is fine.
    c.mint(user2(), 1, ether("0.25")).unwrap();
    assert_eq!(c.balance_of(&user2()), 2);
    assert_eq!(
        c.mint(user2(), 1, ether("0.25")),
        Err(PresaleError::PresaleCapExceeded {
            held: 2,
            requested: 1,
            cap: PER_ADDRESS_PRESALE_CAP,
        })
    );
}

#[test]
fn presale_single_call_above_cap_is_rejected() {
    let (mut c, _) = deploy(100);
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    assert!(matches!(
        c.mint(user2(), 3, ether("0.75")),
        Err(PresaleError::PresaleCapExceeded { held: 0, .. })
    ));
    assert_eq!(c.total_supply(), 0);
}

#[test]
fn whitelist_check_precedes_payment_check() {
    let (mut c, _) = deploy(100);
    // Unlisted and underpaying: the whitelist rejection wins.
    assert_eq!(
        c.mint(user3(), 1, Wei::ZERO),
        Err(PresaleError::NotWhitelisted { caller: user3() })
    );
}

#[test]
fn payment_check_precedes_cap_check() {
    let (mut c, _) = deploy(100);
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    assert!(matches!(
        c.mint(user2(), 5, ether("0.25")),
        Err(PresaleError::InsufficientFunds { .. })
    ));
}

// ---------------------------------------------------------------------------
// Public scenario
// ---------------------------------------------------------------------------

#[test]
fn public_phase_doubles_price_and_drops_whitelist() {
    let (mut c, clock) = deploy(100);
    c.set_presale_open_time(&owner(), START).unwrap();
    let presale_price = c.get_price();

    clock.advance(PRESALE_WINDOW);
    assert_eq!(c.phase(), SalePhase::Public);
    assert_eq!(c.get_price().as_u128(), presale_price.as_u128() * 2);
    assert_eq!(c.get_price().as_u128(), PUBLIC_PRICE_WEI);

    // user3 was never whitelisted.
    assert!(matches!(
        c.mint(user3(), 1, ether("0.25")),
        Err(PresaleError::InsufficientFunds { .. })
    ));
    c.mint(user3(), 1, ether("0.5")).unwrap();
    assert_eq!(c.balance_of(&user3()), 1);

    // No per-address cap once public.
    c.mint(user3(), 5, ether("2.5")).unwrap();
    assert_eq!(c.balance_of(&user3()), 6);
    assert_eq!(c.total_supply(), 6);
}

#[test]
fn presale_buyers_keep_buying_after_transition() {
    let (mut c, clock) = deploy(100);
    c.set_presale_open_time(&owner(), START).unwrap();
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    c.mint(user2(), 2, ether("0.5")).unwrap();

    clock.advance(PRESALE_WINDOW);
    c.mint(user2(), 3, ether("1.5")).unwrap();
    assert_eq!(c.balance_of(&user2()), 5);
    assert!(c.verify_invariants().is_ok());
}

// ---------------------------------------------------------------------------
// Supply ceiling
// ---------------------------------------------------------------------------

#[test]
fn supply_ceiling_holds_regardless_of_payment() {
    let (mut c, clock) = deploy(3);
    c.set_presale_open_time(&owner(), START).unwrap();
    clock.advance(PRESALE_WINDOW);

    c.mint(user2(), 2, ether("1")).unwrap();
    assert_eq!(
        c.mint(user3(), 2, ether("100")),
        Err(PresaleError::SupplyExceeded {
            total_supply: 2,
            requested: 2,
            maximum: 3,
        })
    );
    assert_eq!(c.balance_of(&user3()), 0);

    c.mint(user3(), 1, ether("0.5")).unwrap();
    assert_eq!(c.total_supply(), 3);
    assert!(matches!(
        c.mint(user3(), 1, ether("0.5")),
        Err(PresaleError::SupplyExceeded { .. })
    ));
}

#[test]
fn supply_ceiling_applies_during_presale() {
    let (mut c, _) = deploy(1);
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    assert!(matches!(
        c.mint(user2(), 2, ether("0.5")),
        Err(PresaleError::SupplyExceeded { .. })
    ));
}

#[test]
fn huge_quantity_is_rejected_without_overflow() {
    let (mut c, clock) = deploy(100);
    c.set_presale_open_time(&owner(), START).unwrap();
    clock.advance(PRESALE_WINDOW);

    // u64::MAX * 0.5 ETH still fits in u128 wei, so the payment clears and
    // the supply ceiling is what stops it.
    assert!(matches!(
        c.mint(user2(), u64::MAX, Wei::from_wei(u128::MAX)),
        Err(PresaleError::SupplyExceeded { .. })
    ));
    assert_eq!(c.total_supply(), 0);
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

#[test]
fn rejected_calls_leave_state_untouched() {
    let (mut c, _) = deploy(10);
    c.set_presale_open_time(&owner(), START).unwrap();
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    c.mint(user2(), 1, ether("0.25")).unwrap();
    let before = c.state().clone();

    let _ = c.mint(user3(), 1, ether("0.25"));
    let _ = c.mint(user2(), 1, ether("0.1"));
    let _ = c.mint(user2(), 2, ether("0.5"));
    let _ = c.mint(user2(), 0, ether("1"));
    let _ = c.set_presale_open_time(&user2(), 5);
    let _ = c.set_presale_open_time(&owner(), 5);
    let _ = c.whitelist_users(&user2(), &[user3()]);
    let _ = c.withdraw(&user3());

    assert_eq!(c.state(), &before);
}

#[test]
fn successful_mint_changes_only_buyer_and_supply() {
    let (mut c, _) = deploy(10);
    c.whitelist_users(&owner(), &[user2(), user3()]).unwrap();
    c.mint(user3(), 1, ether("0.25")).unwrap();

    let supply = c.total_supply();
    let other = c.balance_of(&user3());
    c.mint(user2(), 2, ether("0.5")).unwrap();

    assert_eq!(c.total_supply(), supply + 2);
    assert_eq!(c.balance_of(&user2()), 2);
    assert_eq!(c.balance_of(&user3()), other);
    assert_eq!(c.whitelist_len(), 2);
    assert_eq!(c.presale_open_time(), 0);
}

// ---------------------------------------------------------------------------
// Proceeds
// ---------------------------------------------------------------------------

#[test]
fn excess_payment_is_retained_and_withdrawable() {
    let (mut c, clock) = deploy(100);
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    let receipt = c.mint(user2(), 1, ether("1")).unwrap();
    assert_eq!(receipt.excess, ether("0.75"));

    c.set_presale_open_time(&owner(), START).unwrap();
    clock.advance(PRESALE_WINDOW);
    c.mint(user3(), 2, ether("1")).unwrap();

    assert_eq!(c.proceeds(), ether("2"));
    assert_eq!(c.withdraw(&owner()).unwrap(), ether("2"));
    assert_eq!(c.proceeds(), Wei::ZERO);
}

#[test]
fn state_survives_bincode_round_trip() {
    let (mut c, clock) = deploy(10);
    c.set_presale_open_time(&owner(), START).unwrap();
    c.whitelist_users(&owner(), &[user2()]).unwrap();
    c.mint(user2(), 2, ether("0.5")).unwrap();

    let bytes = bincode::serialize(c.state()).unwrap();
    let state = bincode::deserialize(&bytes).unwrap();
    let restored = NftPresale::from_state(state, Arc::new(clock)).unwrap();

    assert_eq!(restored.state(), c.state());
    assert_eq!(restored.owner_of(2).unwrap(), user2());
}

// ---------------------------------------------------------------------------
// Clock moving backwards
// ---------------------------------------------------------------------------

#[test]
fn clock_stepping_back_into_presale_keeps_ledger_valid() {
    let clock = ManualClock::new(START);
    let config = PresaleConfig::new("NFTPresale", "NPS", "google.com", 100)
        .with_presale_duration(Duration::from_secs(3_600));
    let mut c = NftPresale::deploy(config, owner(), Arc::new(clock.clone())).unwrap();
    c.set_presale_open_time(&owner(), START).unwrap();
    c.whitelist_users(&owner(), &[user2()]).unwrap();

    clock.advance(Duration::from_secs(3_600));
    c.mint(owner(), 5, ether("2.5")).unwrap();

    clock.set(START + 3_599);
    assert_eq!(c.phase(), SalePhase::Presale);
    assert!(c.verify_invariants().is_ok());

    let reloaded = NftPresale::from_state(c.state().clone(), Arc::new(clock.clone())).unwrap();
    assert_eq!(reloaded.balance_of(&owner()), 5);

    let receipt = c.mint(user2(), 1, ether("0.25")).unwrap();
    assert_eq!(receipt.phase, SalePhase::Presale);
    assert_eq!(receipt.token_ids(), 6..7);

    // A public-phase holder is still held to the cap while presale runs.
    c.whitelist_users(&owner(), &[owner()]).unwrap();
    assert!(matches!(
        c.mint(owner(), 1, ether("0.25")),
        Err(PresaleError::PresaleCapExceeded { held: 5, .. })
    ));
}

#[test]
fn tokens_of_owner_agrees_with_balances() {
    let (mut c, clock) = deploy(20);
    c.set_presale_open_time(&owner(), START).unwrap();
    c.whitelist_users(&owner(), &[user2(), user3()]).unwrap();
    c.mint(user2(), 1, ether("0.25")).unwrap();
    c.mint(user3(), 2, ether("0.5")).unwrap();
    clock.advance(PRESALE_WINDOW);
    c.mint(user2(), 3, ether("1.5")).unwrap();

    for holder in [owner(), user2(), user3()] {
        let tokens = c.tokens_of_owner(&holder);
        assert_eq!(tokens.len() as u64, c.balance_of(&holder));
        assert!(tokens.windows(2).all(|w| w[0] < w[1]));
        assert!(tokens.iter().all(|id| c.owner_of(*id) == Ok(holder)));
    }
    assert_eq!(c.tokens_of_owner(&user2()), vec![1, 4, 5, 6]);
}
