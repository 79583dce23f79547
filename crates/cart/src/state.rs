//! Cart state and its invariants.
//!
//! [`CartState`] is the read model handed to views. It is only ever mutated
//! through [`CartStore`](crate::CartStore), which recomputes the derived
//! aggregates after every change.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{FulfillmentMode, Price, ProductId, StoreId, VariantId};

use crate::item::{CartItem, CartItemError};

/// A broken cart invariant, reported when validating restored state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An item failed its own type constraints.
    #[error("invalid item {product_id}: {source}")]
    InvalidItem {
        product_id: ProductId,
        #[source]
        source: CartItemError,
    },
    /// Items are present but no store is set, or the reverse.
    #[error("store must be set exactly when the cart has items")]
    StoreMismatch,
    /// An item belongs to a different retailer than the cart.
    #[error("item {product_id} belongs to store {found}, cart is for {expected}")]
    MixedStores {
        product_id: ProductId,
        expected: StoreId,
        found: StoreId,
    },
    /// Two lines share the same product and variant.
    #[error("duplicate line for product {0}")]
    DuplicateLine(ProductId),
    /// The cart subtotal does not fit in a `Decimal`.
    #[error("cart subtotal is out of range")]
    SubtotalOverflow,
}

/// Checked sum of line totals.
fn subtotal_of(items: &[CartItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.line_total()?))
}

/// The full cart as seen by views and as written to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub(crate) items: Vec<CartItem>,
    #[serde(default)]
    pub(crate) store_id: Option<StoreId>,
    #[serde(default)]
    pub(crate) store_name: Option<String>,
    #[serde(default)]
    pub(crate) fulfillment_mode: FulfillmentMode,
    #[serde(default)]
    pub(crate) total_item_count: u64,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub(crate) cart_subtotal: Decimal,
}

impl Default for CartState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            store_id: None,
            store_name: None,
            fulfillment_mode: FulfillmentMode::Delivery,
            total_item_count: 0,
            cart_subtotal: Decimal::ZERO,
        }
    }
}

impl CartState {
    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The retailer currently represented, if any.
    #[must_use]
    pub const fn store_id(&self) -> Option<&StoreId> {
        self.store_id.as_ref()
    }

    #[must_use]
    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    #[must_use]
    pub const fn fulfillment_mode(&self) -> FulfillmentMode {
        self.fulfillment_mode
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub const fn total_item_count(&self) -> u64 {
        self.total_item_count
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub const fn cart_subtotal(&self) -> Decimal {
        self.cart_subtotal
    }

    /// Subtotal formatted for display (e.g., "$200.00").
    #[must_use]
    pub fn display_subtotal(&self) -> String {
        Price::from_amount(self.cart_subtotal).display()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line for `(product_id, variant)`.
    #[must_use]
    pub fn line(&self, product_id: &ProductId, variant: Option<&VariantId>) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(product_id, variant))
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId, variant: Option<&VariantId>) -> bool {
        self.line(product_id, variant).is_some()
    }

    pub(crate) fn position(
        &self,
        product_id: &ProductId,
        variant: Option<&VariantId>,
    ) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.matches(product_id, variant))
    }

    /// Recompute derived aggregates and reset the store fields when empty.
    ///
    /// Leaves `self` untouched if the subtotal is out of range.
    pub(crate) fn recompute(&mut self) -> Result<(), InvariantViolation> {
        let cart_subtotal = subtotal_of(&self.items).ok_or(InvariantViolation::SubtotalOverflow)?;
        if self.items.is_empty() {
            self.store_id = None;
            self.store_name = None;
        }
        self.total_item_count = self
            .items
            .iter()
            .map(|item| u64::from(item.quantity()))
            .sum();
        self.cart_subtotal = cart_subtotal;
        Ok(())
    }

    /// Check every structural invariant.
    ///
    /// Stored aggregates are not compared here: callers recompute them
    /// instead. A subtotal that cannot be computed is a violation.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(expected) = &self.store_id else {
            return if self.items.is_empty() {
                Ok(())
            } else {
                Err(InvariantViolation::StoreMismatch)
            };
        };
        if self.items.is_empty() {
            return Err(InvariantViolation::StoreMismatch);
        }

        let mut seen = HashSet::with_capacity(self.items.len());

        for item in &self.items {
            item.validate()
                .map_err(|source| InvariantViolation::InvalidItem {
                    product_id: item.product_id().clone(),
                    source,
                })?;

            if item.store_id() != expected {
                return Err(InvariantViolation::MixedStores {
                    product_id: item.product_id().clone(),
                    expected: expected.clone(),
                    found: item.store_id().clone(),
                });
            }

            if !seen.insert((item.product_id(), item.variant())) {
                return Err(InvariantViolation::DuplicateLine(item.product_id().clone()));
            }
        }

        if subtotal_of(&self.items).is_none() {
            return Err(InvariantViolation::SubtotalOverflow);
        }

        Ok(())
    }
}
