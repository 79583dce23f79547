//! Cart commands.
//!
//! Each invocation restores the stored cart, subscribes the persister,
//! dispatches one intent and prints the resulting cart.
//!
//! # Usage
//!
//! ```bash
//! # Add two units of a product
//! mp-cart add -p p1 -s s1 -n Acme --price 19.99 -q 2
//!
//! # Replace a cart from another store after a conflict
//! mp-cart force-add -p p9 -s s9 -n NewShop --price 500
//!
//! # Switch to pickup and show the cart as JSON
//! mp-cart fulfillment pickup
//! mp-cart show --json
//!
//! # Delete the stored cart
//! mp-cart reset
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use marketplace_cart::{
    AddOutcome, CartConfig, CartItem, CartItemError, CartPersister, CartState, CartStore,
    FileStorage, StorageError,
};
use marketplace_core::{FulfillmentMode, Price, ProductId, VariantId};

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// The candidate item failed validation.
    #[error("Invalid item: {0}")]
    InvalidItem(#[from] CartItemError),

    /// The cart could not be rendered as JSON.
    #[error("Failed to render cart: {0}")]
    Render(#[from] serde_json::Error),

    /// The stored cart could not be deleted.
    #[error("Failed to delete stored cart: {0}")]
    Storage(#[from] StorageError),
}

/// Catalog data for a candidate line.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub product: String,
    pub store: String,
    pub store_name: String,
    pub price: Decimal,
    pub variant: Option<String>,
    pub quantity: u32,
}

impl Candidate {
    fn into_item(self) -> Result<CartItem, CartItemError> {
        let item = CartItem::new(self.product, self.store, self.store_name, self.price)?
            .with_quantity(self.quantity)?;
        Ok(match self.variant {
            Some(variant) => item.with_variant(variant),
            None => item,
        })
    }
}

fn persister(config: &CartConfig) -> CartPersister<FileStorage> {
    CartPersister::new(config.file_storage(), config.storage_key.clone())
}

/// Open the stored cart described by `config`.
#[must_use]
pub fn open(config: &CartConfig) -> CartStore {
    persister(config).open_store()
}

/// Delete the stored cart. Unlike `clear`, nothing is written back.
///
/// # Errors
///
/// Returns an error if the storage delete fails.
pub fn reset(config: &CartConfig) -> Result<(), CartCommandError> {
    persister(config).forget()?;
    tracing::info!(key = %config.storage_key, "Stored cart deleted");
    Ok(())
}

/// Add a candidate, reporting a cross-store conflict to the caller.
///
/// # Errors
///
/// Returns an error if the candidate is invalid.
pub fn add(store: &mut CartStore, candidate: Candidate) -> Result<AddOutcome, CartCommandError> {
    let item = candidate.into_item()?;
    let outcome = store.add_item(item);
    match outcome {
        AddOutcome::Added => {}
        AddOutcome::Conflict => tracing::info!(
            cart_store = ?store.state().store_id(),
            "Cart holds items from another store"
        ),
        AddOutcome::Rejected => tracing::info!("Item would put the cart out of range"),
    }
    Ok(outcome)
}

/// Replace the cart with a single candidate line.
///
/// # Errors
///
/// Returns an error if the candidate is invalid.
pub fn force_add(store: &mut CartStore, candidate: Candidate) -> Result<(), CartCommandError> {
    store.force_add_item(candidate.into_item()?);
    Ok(())
}

pub fn remove(store: &mut CartStore, product: &str, variant: Option<&str>) {
    let variant = variant.map(VariantId::new);
    store.remove_item(&ProductId::new(product), variant.as_ref());
}

/// Set a line's quantity. Returns `false` if the quantity was rejected.
pub fn update(store: &mut CartStore, product: &str, variant: Option<&str>, quantity: u32) -> bool {
    if quantity < 1 {
        return false;
    }
    let variant = variant.map(VariantId::new);
    store.update_quantity(&ProductId::new(product), variant.as_ref(), quantity);
    true
}

pub fn set_fulfillment(store: &mut CartStore, mode: FulfillmentMode) {
    store.set_fulfillment_mode(mode);
}

pub fn clear(store: &mut CartStore) {
    store.clear();
}

/// Render the cart for the terminal.
#[must_use]
pub fn render(state: &CartState) -> String {
    if state.is_empty() {
        return format!("Cart is empty ({})", state.fulfillment_mode());
    }

    let mut out = format!(
        "Cart from {} ({}), {}\n",
        state.store_name().unwrap_or("unknown store"),
        state.store_id().map_or("-", |id| id.as_str()),
        state.fulfillment_mode()
    );

    for item in state.items() {
        let variant = item
            .variant()
            .map(|v| format!(" [{v}]"))
            .unwrap_or_default();
        let total = item
            .line_total()
            .map_or_else(|| "-".to_string(), |t| Price::from_amount(t).display());
        out.push_str(&format!(
            "  {}{} x{} @ {} = {}\n",
            item.product_id(),
            variant,
            item.quantity(),
            item.display_price(),
            total
        ));
    }

    out.push_str(&format!(
        "Items: {}  Subtotal: {}",
        state.total_item_count(),
        state.display_subtotal()
    ));
    out
}

/// Render the cart as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(state: &CartState) -> Result<String, CartCommandError> {
    Ok(serde_json::to_string_pretty(state)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(product: &str, store: &str, price: i64) -> Candidate {
        Candidate {
            product: product.to_string(),
            store: store.to_string(),
            store_name: format!("Shop {store}"),
            price: Decimal::new(price, 0),
            variant: None,
            quantity: 1,
        }
    }

    fn config(dir: &std::path::Path) -> CartConfig {
        CartConfig {
            storage_dir: dir.to_path_buf(),
            ..CartConfig::default()
        }
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&CartState::default()), "Cart is empty (delivery)");
    }

    #[test]
    fn test_render_lines() {
        let mut store = CartStore::new();
        let mut shirt = candidate("shirt", "s1", 20);
        shirt.variant = Some("m".to_string());
        shirt.quantity = 2;
        assert_eq!(add(&mut store, shirt).unwrap(), AddOutcome::Added);

        let text = render(store.state());
        assert!(text.starts_with("Cart from Shop s1 (s1), delivery"));
        assert!(text.contains("shirt [m] x2 @ $20.00 = $40.00"));
        assert!(text.ends_with("Items: 2  Subtotal: $40.00"));
    }

    #[test]
    fn test_add_rejects_zero_quantity_candidate() {
        let mut store = CartStore::new();
        let mut bad = candidate("p1", "s1", 1);
        bad.quantity = 0;
        assert!(matches!(
            add(&mut store, bad),
            Err(CartCommandError::InvalidItem(CartItemError::ZeroQuantity))
        ));
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_update_zero_reports_rejection() {
        let mut store = CartStore::new();
        assert_eq!(add(&mut store, candidate("p1", "s1", 1)).unwrap(), AddOutcome::Added);
        assert!(!update(&mut store, "p1", None, 0));
        assert_eq!(store.state().total_item_count(), 1);
    }

    #[test]
    fn test_commands_persist_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        {
            let mut store = open(&config);
            assert_eq!(
                add(&mut store, candidate("p1", "s1", 100)).unwrap(),
                AddOutcome::Added
            );
        }
        {
            let mut store = open(&config);
            assert_eq!(
                add(&mut store, candidate("p2", "s2", 5)).unwrap(),
                AddOutcome::Conflict
            );
            force_add(&mut store, candidate("p9", "s9", 500)).unwrap();
        }

        let store = open(&config);
        assert_eq!(store.state().items().len(), 1);
        assert_eq!(store.state().cart_subtotal(), Decimal::new(500, 0));
    }

    #[test]
    fn test_add_out_of_range_is_rejected() {
        let mut store = CartStore::new();
        let mut huge = candidate("p1", "s1", 1);
        huge.price = Decimal::MAX;
        huge.quantity = 2;
        assert_eq!(add(&mut store, huge).unwrap(), AddOutcome::Rejected);
        assert!(store.state().is_empty());
    }

    #[test]
    fn test_reset_deletes_stored_cart() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        {
            let mut store = open(&config);
            assert_eq!(
                add(&mut store, candidate("p1", "s1", 100)).unwrap(),
                AddOutcome::Added
            );
        }
        let path = config.file_storage().path_for(&config.storage_key).unwrap();
        assert!(path.exists());

        reset(&config).unwrap();

        assert!(!path.exists());
        assert!(open(&config).state().is_empty());
        // Resetting an absent cart is fine.
        reset(&config).unwrap();
    }

    #[test]
    fn test_render_json_uses_camel_case() {
        let mut store = CartStore::new();
        assert_eq!(add(&mut store, candidate("p1", "s1", 3)).unwrap(), AddOutcome::Added);
        let json = render_json(store.state()).unwrap();
        assert!(json.contains("\"totalItemCount\": 1"));
        assert!(json.contains("\"fulfillmentMode\": \"delivery\""));
    }
}
