//! Integration tests for the marketplace cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - Shopper flows through a persisted store
//! - `cart_properties` - Invariants over random operation sequences
//!
//! This library holds the shared fixtures: item builders, a random
//! operation model, and an invariant checker built on the public API only.

use std::collections::HashSet;

use proptest::prelude::*;
use rust_decimal::Decimal;

use marketplace_cart::{CartItem, CartState, CartStore};
use marketplace_core::{FulfillmentMode, ProductId, VariantId};

/// Build a single-unit item, panicking on invalid fixture data.
#[must_use]
pub fn item(product: &str, store: &str, store_name: &str, price: Decimal) -> CartItem {
    CartItem::new(product, store, store_name, price)
        .unwrap_or_else(|e| panic!("invalid fixture item {product}: {e}"))
}

/// One intent dispatched to a [`CartStore`].
#[derive(Debug, Clone)]
pub enum CartOp {
    Add(CartItem),
    ForceAdd(CartItem),
    Remove {
        product: ProductId,
        variant: Option<VariantId>,
    },
    Update {
        product: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    },
    SetMode(FulfillmentMode),
    Clear,
}

impl CartOp {
    /// Dispatch this intent.
    pub fn apply(&self, store: &mut CartStore) {
        match self {
            Self::Add(item) => {
                let _ = store.add_item(item.clone());
            }
            Self::ForceAdd(item) => store.force_add_item(item.clone()),
            Self::Remove { product, variant } => store.remove_item(product, variant.as_ref()),
            Self::Update {
                product,
                variant,
                quantity,
            } => store.update_quantity(product, variant.as_ref(), *quantity),
            Self::SetMode(mode) => store.set_fulfillment_mode(*mode),
            Self::Clear => store.clear(),
        }
    }
}

fn product_id() -> impl Strategy<Value = ProductId> {
    prop::sample::select(vec!["p1", "p2", "p3", "p4"]).prop_map(ProductId::new)
}

fn variant() -> impl Strategy<Value = Option<VariantId>> {
    prop::option::of(prop::sample::select(vec!["s", "m"]).prop_map(VariantId::new))
}

prop_compose! {
    /// A valid candidate from one of two stores.
    pub fn cart_item()(
        product in product_id(),
        store in prop::sample::select(vec!["s1", "s2"]),
        variant in variant(),
        cents in 0i64..10_000,
        quantity in 1u32..=5,
    ) -> CartItem {
        let item = item(product.as_str(), store, &format!("Store {store}"), Decimal::new(cents, 2));
        let item = match variant {
            Some(v) => item.with_variant(v),
            None => item,
        };
        item.with_quantity(quantity).unwrap_or_else(|_| unreachable!("quantity is at least 1"))
    }
}

/// Any intent, including rejected ones (quantity 0, unknown lines).
pub fn cart_op() -> impl Strategy<Value = CartOp> {
    prop_oneof![
        4 => cart_item().prop_map(CartOp::Add),
        1 => cart_item().prop_map(CartOp::ForceAdd),
        2 => (product_id(), variant())
            .prop_map(|(product, variant)| CartOp::Remove { product, variant }),
        2 => (product_id(), variant(), 0u32..=6).prop_map(|(product, variant, quantity)| {
            CartOp::Update {
                product,
                variant,
                quantity,
            }
        }),
        1 => prop_oneof![
            Just(FulfillmentMode::Delivery),
            Just(FulfillmentMode::Pickup)
        ]
        .prop_map(CartOp::SetMode),
        1 => Just(CartOp::Clear),
    ]
}

/// Describe the first broken invariant, if any.
#[must_use]
pub fn invariant_failure(state: &CartState) -> Option<String> {
    let items = state.items();

    if items.is_empty() != state.store_id().is_none() {
        return Some(format!(
            "store {:?} with {} items",
            state.store_id(),
            items.len()
        ));
    }

    if let Some(store) = state.store_id()
        && let Some(stray) = items.iter().find(|i| i.store_id() != store)
    {
        return Some(format!("{} from {} in cart for {store}", stray.product_id(), stray.store_id()));
    }

    let mut seen = HashSet::new();
    for i in items {
        if !seen.insert((i.product_id(), i.variant())) {
            return Some(format!("duplicate line {}", i.product_id()));
        }
        if i.quantity() < 1 {
            return Some(format!("quantity {} on {}", i.quantity(), i.product_id()));
        }
    }

    let count: u64 = items.iter().map(|i| u64::from(i.quantity())).sum();
    if count != state.total_item_count() {
        return Some(format!("count {} != {count}", state.total_item_count()));
    }

    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |sum, i| sum.checked_add(i.line_total()?));
    if subtotal != Some(state.cart_subtotal()) {
        return Some(format!("subtotal {} != {subtotal:?}", state.cart_subtotal()));
    }

    None
}
