//! Shopper flows through a cart persisted in file storage.
//!
//! Each flow reopens the store from disk between steps, the way a page
//! reload would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::fs;

use rust_decimal::Decimal;

use marketplace_cart::{
    AddOutcome, CartPersister, CartState, CartStore, DEFAULT_STORAGE_KEY, FileStorage,
    KeyValueStorage,
};
use marketplace_core::{FulfillmentMode, ProductId, StoreId};
use marketplace_integration_tests::{invariant_failure, item};

fn open(dir: &tempfile::TempDir) -> CartStore {
    CartPersister::with_default_key(FileStorage::new(dir.path())).open_store()
}

fn acme(product: &str, price: i64) -> marketplace_cart::CartItem {
    item(product, "s1", "Acme", Decimal::new(price, 0))
}

fn assert_valid(state: &CartState) {
    if let Some(failure) = invariant_failure(state) {
        panic!("invariant broken: {failure}");
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_add_to_empty_cart() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);

    assert_eq!(store.add_item(acme("p1", 100)), AddOutcome::Added);

    let store = open(&dir);
    let state = store.state();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].product_id(), &ProductId::new("p1"));
    assert_eq!(state.items()[0].quantity(), 1);
    assert_eq!(state.store_id(), Some(&StoreId::new("s1")));
    assert_eq!(state.total_item_count(), 1);
    assert_eq!(state.cart_subtotal(), Decimal::new(100, 0));
    assert_valid(state);
}

#[test]
fn test_other_store_conflicts_and_leaves_cart_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100));
    let before = store.state().clone();

    let outcome = store.add_item(item("p2", "s2", "Other", Decimal::new(7, 0)));

    assert_eq!(outcome, AddOutcome::Conflict);
    assert_eq!(store.state(), &before);
    assert_eq!(open(&dir).state(), &before);
}

#[test]
fn test_adding_same_product_merges_lines() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100));

    let mut store = open(&dir);
    assert_eq!(store.add_item(acme("p1", 100)), AddOutcome::Added);

    let state = open(&dir).state().clone();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].quantity(), 2);
    assert_eq!(state.cart_subtotal(), Decimal::new(200, 0));
}

#[test]
fn test_removing_last_item_resets_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 50).with_quantity(2).unwrap());

    store.remove_item(&ProductId::new("p1"), None);

    let store = open(&dir);
    let state = store.state();
    assert!(state.items().is_empty());
    assert!(state.store_id().is_none());
    assert_eq!(state.total_item_count(), 0);
    assert_eq!(state.cart_subtotal(), Decimal::ZERO);
}

#[test]
fn test_force_add_discards_previous_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100));

    store.force_add_item(item("p9", "s9", "NewShop", Decimal::new(500, 0)));

    let store = open(&dir);
    let state = store.state();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].product_id(), &ProductId::new("p9"));
    assert_eq!(state.store_id(), Some(&StoreId::new("s9")));
    assert_eq!(state.store_name(), Some("NewShop"));
    assert_eq!(state.cart_subtotal(), Decimal::new(500, 0));
}

#[test]
fn test_zero_quantity_update_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100));
    let before = store.state().clone();

    store.update_quantity(&ProductId::new("p1"), None, 0);

    assert_eq!(store.state(), &before);
    assert_eq!(open(&dir).state(), &before);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_checkout_clear_resets_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100));
    store.set_fulfillment_mode(FulfillmentMode::Pickup);
    assert_eq!(
        open(&dir).state().fulfillment_mode(),
        FulfillmentMode::Pickup
    );

    store.clear();

    assert_eq!(open(&dir).state(), &CartState::default());
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    storage.set(DEFAULT_STORAGE_KEY, "]]] definitely not json").unwrap();

    let mut store = open(&dir);
    assert_eq!(store.state(), &CartState::default());

    // The next mutation overwrites the corrupt blob.
    let _ = store.add_item(acme("p1", 1));
    assert_eq!(open(&dir).state().total_item_count(), 1);
}

#[test]
fn test_out_of_range_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path());
    storage
        .set(
            DEFAULT_STORAGE_KEY,
            &serde_json::json!({
                "state": {
                    "items": [{
                        "productId": "p1",
                        "storeId": "s1",
                        "storeName": "Acme",
                        "unitPrice": Decimal::MAX.to_string(),
                        "quantity": 2
                    }],
                    "storeId": "s1",
                    "storeName": "Acme"
                },
                "version": 1
            })
            .to_string(),
        )
        .unwrap();

    let store = open(&dir);
    assert_eq!(store.state(), &CartState::default());
}

#[test]
fn test_snapshot_is_versioned_json() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = open(&dir);
    let _ = store.add_item(acme("p1", 100).with_variant("red"));

    let path = FileStorage::new(dir.path())
        .path_for(DEFAULT_STORAGE_KEY)
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    assert_eq!(json["version"], 1);
    assert_eq!(json["state"]["storeId"], "s1");
    assert_eq!(json["state"]["fulfillmentMode"], "delivery");
    assert_eq!(json["state"]["totalItemCount"], 1);
    assert_eq!(json["state"]["items"][0]["variant"], "red");
    assert_eq!(json["state"]["items"][0]["unitPrice"], "100");
}

#[test]
fn test_unwritable_storage_keeps_session_cart() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "a file where the directory should be").unwrap();

    let mut store = CartPersister::with_default_key(FileStorage::new(&blocker)).open_store();
    assert_eq!(store.add_item(acme("p1", 100)), AddOutcome::Added);
    store.update_quantity(&ProductId::new("p1"), None, 3);

    assert_eq!(store.state().total_item_count(), 3);
    assert_eq!(store.state().cart_subtotal(), Decimal::new(300, 0));
}
