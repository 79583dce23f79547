//! The cart store: the only place cart state is mutated.
//!
//! Every operation runs to completion synchronously. Effective mutations
//! recompute the derived aggregates and then notify subscribed listeners
//! (persistence, views). Rejected or no-op calls notify nobody.
//!
//! # Example
//!
//! ```rust
//! use marketplace_cart::{AddOutcome, CartItem, CartStore};
//! use rust_decimal::Decimal;
//!
//! let mut store = CartStore::new();
//! let item = CartItem::new("p1", "s1", "Acme", Decimal::new(100, 0)).unwrap();
//!
//! assert_eq!(store.add_item(item), AddOutcome::Added);
//! assert_eq!(store.state().total_item_count(), 1);
//! ```

use tracing::{debug, info};

use marketplace_core::{FulfillmentMode, ProductId, StoreId, VariantId};

use crate::item::CartItem;
use crate::state::{CartState, InvariantViolation};

/// Result of [`CartStore::add_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum AddOutcome {
    /// The item was appended or merged into an existing line.
    Added,
    /// The cart holds another retailer's items; nothing changed.
    ///
    /// Callers surface this to the shopper and may follow up with
    /// [`CartStore::force_add_item`].
    Conflict,
    /// The merged quantity or the cart subtotal would be out of range;
    /// nothing changed.
    Rejected,
}

/// What changed in an effective mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// A new line was appended.
    ItemAdded {
        product_id: ProductId,
        variant: Option<VariantId>,
    },
    /// An existing line's quantity grew.
    ItemMerged {
        product_id: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    },
    /// The cart was replaced by a single line from another retailer.
    Replaced { store_id: StoreId },
    /// A line was removed.
    ItemRemoved {
        product_id: ProductId,
        variant: Option<VariantId>,
    },
    /// A line's quantity was set to a new value.
    QuantityUpdated {
        product_id: ProductId,
        variant: Option<VariantId>,
        quantity: u32,
    },
    /// The shopper switched between delivery and pickup.
    FulfillmentModeChanged(FulfillmentMode),
    /// The cart was emptied and the mode reset.
    Cleared,
}

/// Observer notified after every effective mutation.
///
/// Implemented for any `Fn(&CartState, &CartEvent)`.
pub trait CartListener {
    fn on_change(&self, state: &CartState, event: &CartEvent);
}

impl<F> CartListener for F
where
    F: Fn(&CartState, &CartEvent),
{
    fn on_change(&self, state: &CartState, event: &CartEvent) {
        self(state, event);
    }
}

/// Authoritative cart state plus its subscribers.
///
/// Owned by the composition root; views read through [`CartStore::state`]
/// and dispatch intents through the operation methods.
#[derive(Default)]
pub struct CartStore {
    state: CartState,
    listeners: Vec<Box<dyn CartListener>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store around previously restored state.
    ///
    /// Aggregates are recomputed rather than trusted.
    ///
    /// # Errors
    ///
    /// Returns the first broken invariant if `state` is not a valid cart.
    pub fn from_state(mut state: CartState) -> Result<Self, InvariantViolation> {
        state.check_invariants()?;
        state.recompute()?;
        Ok(Self {
            state,
            listeners: Vec::new(),
        })
    }

    /// Subscribe a listener to future changes.
    pub fn subscribe(&mut self, listener: impl CartListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Read-only view of the current cart.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Add a candidate line, enforcing the single-retailer rule.
    ///
    /// A line with the same `(product_id, variant)` has its quantity
    /// increased by the candidate's quantity. Otherwise the candidate is
    /// appended, and an empty cart adopts the candidate's retailer.
    pub fn add_item(&mut self, candidate: CartItem) -> AddOutcome {
        if let Some(current) = &self.state.store_id
            && current != candidate.store_id()
        {
            info!(
                cart_store = %current,
                candidate_store = %candidate.store_id(),
                product_id = %candidate.product_id(),
                "Rejected item from another store"
            );
            return AddOutcome::Conflict;
        }

        let mut next = self.state.clone();
        let existing = next
            .items
            .iter_mut()
            .find(|item| item.matches(candidate.product_id(), candidate.variant()));

        let event = match existing {
            Some(line) => {
                let Some(quantity) = line.quantity().checked_add(candidate.quantity()) else {
                    debug!(
                        product_id = %line.product_id(),
                        quantity = line.quantity(),
                        added = candidate.quantity(),
                        "Add rejected: quantity out of range"
                    );
                    return AddOutcome::Rejected;
                };
                line.set_quantity(quantity);
                CartEvent::ItemMerged {
                    product_id: line.product_id().clone(),
                    variant: line.variant().cloned(),
                    quantity,
                }
            }
            None => {
                if next.items.is_empty() {
                    next.store_id = Some(candidate.store_id().clone());
                    next.store_name = Some(candidate.store_name().to_owned());
                }
                let event = CartEvent::ItemAdded {
                    product_id: candidate.product_id().clone(),
                    variant: candidate.variant().cloned(),
                };
                next.items.push(candidate);
                event
            }
        };

        if self.commit(next, &event) {
            AddOutcome::Added
        } else {
            AddOutcome::Rejected
        }
    }

    /// Replace the whole cart with a single line.
    ///
    /// Used once the shopper confirms discarding another retailer's cart.
    /// The fulfillment mode is kept. A line whose total is out of range
    /// leaves the cart as it was.
    pub fn force_add_item(&mut self, candidate: CartItem) {
        let store_id = candidate.store_id().clone();
        info!(
            store_id = %store_id,
            discarded = self.state.items.len(),
            "Replacing cart contents"
        );

        let next = CartState {
            store_id: Some(store_id.clone()),
            store_name: Some(candidate.store_name().to_owned()),
            items: vec![candidate],
            ..self.state.clone()
        };
        self.commit(next, &CartEvent::Replaced { store_id });
    }

    /// Remove the line for `(product_id, variant)`. Missing lines are ignored.
    pub fn remove_item(&mut self, product_id: &ProductId, variant: Option<&VariantId>) {
        let Some(index) = self.state.position(product_id, variant) else {
            debug!(product_id = %product_id, "Remove ignored: line not in cart");
            return;
        };

        let mut next = self.state.clone();
        next.items.remove(index);
        self.commit(
            next,
            &CartEvent::ItemRemoved {
                product_id: product_id.clone(),
                variant: variant.cloned(),
            },
        );
    }

    /// Set a line's quantity.
    ///
    /// A quantity of 0 is rejected without touching the cart; use
    /// [`CartStore::remove_item`] to delete a line.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        variant: Option<&VariantId>,
        quantity: u32,
    ) {
        if quantity < 1 {
            debug!(product_id = %product_id, "Quantity update rejected: below 1");
            return;
        }

        let Some(index) = self.state.position(product_id, variant) else {
            debug!(product_id = %product_id, "Quantity update ignored: line not in cart");
            return;
        };
        if self.state.items.get(index).map(CartItem::quantity) == Some(quantity) {
            return;
        }

        let mut next = self.state.clone();
        if let Some(line) = next.items.get_mut(index) {
            line.set_quantity(quantity);
        }
        self.commit(
            next,
            &CartEvent::QuantityUpdated {
                product_id: product_id.clone(),
                variant: variant.cloned(),
                quantity,
            },
        );
    }

    pub fn set_fulfillment_mode(&mut self, mode: FulfillmentMode) {
        if self.state.fulfillment_mode == mode {
            return;
        }
        let next = CartState {
            fulfillment_mode: mode,
            ..self.state.clone()
        };
        self.commit(next, &CartEvent::FulfillmentModeChanged(mode));
    }

    /// Empty the cart and reset the fulfillment mode, e.g. after checkout.
    pub fn clear(&mut self) {
        self.commit(CartState::default(), &CartEvent::Cleared);
    }

    /// Install `next` and notify listeners. Returns `false`, leaving the
    /// current state in place, if `next` has an out-of-range subtotal.
    fn commit(&mut self, mut next: CartState, event: &CartEvent) -> bool {
        if let Err(e) = next.recompute() {
            debug!(?event, error = %e, "Change rejected");
            return false;
        }
        self.state = next;
        debug!(
            ?event,
            total_item_count = self.state.total_item_count,
            cart_subtotal = %self.state.cart_subtotal,
            "Cart updated"
        );
        for listener in &self.listeners {
            listener.on_change(&self.state, event);
        }
        true
    }
}
