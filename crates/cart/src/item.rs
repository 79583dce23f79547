//! Cart line items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketplace_core::{Price, ProductId, StoreId, VariantId};

/// Errors that can occur when building a [`CartItem`] candidate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartItemError {
    /// The product ID is empty.
    #[error("product id cannot be empty")]
    EmptyProductId,
    /// The store ID is empty.
    #[error("store id cannot be empty")]
    EmptyStoreId,
    /// The unit price is negative.
    #[error("unit price must not be negative (got {0})")]
    NegativePrice(Decimal),
    /// The quantity is zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// One line of the cart: a distinct product + variant and its quantity.
///
/// ## Constraints
///
/// - `product_id` and `store_id` are non-blank
/// - `unit_price` is non-negative
/// - `quantity` is at least 1
///
/// Use [`CartItem::new`] to build a validated candidate from catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    product_id: ProductId,
    store_id: StoreId,
    store_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    variant: Option<VariantId>,
    #[serde(with = "rust_decimal::serde::str")]
    unit_price: Decimal,
    quantity: u32,
}

impl CartItem {
    /// Build a single-unit candidate.
    ///
    /// # Errors
    ///
    /// Returns an error if an ID is blank or the price is negative.
    pub fn new(
        product_id: impl Into<ProductId>,
        store_id: impl Into<StoreId>,
        store_name: impl Into<String>,
        unit_price: Decimal,
    ) -> Result<Self, CartItemError> {
        let item = Self {
            product_id: product_id.into(),
            store_id: store_id.into(),
            store_name: store_name.into(),
            variant: None,
            unit_price,
            quantity: 1,
        };
        item.validate()?;
        Ok(item)
    }

    /// Set the variant (size, colour) distinguishing otherwise-identical products.
    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<VariantId>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// Set the candidate's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartItemError::ZeroQuantity`] if `quantity` is 0.
    pub fn with_quantity(mut self, quantity: u32) -> Result<Self, CartItemError> {
        if quantity == 0 {
            return Err(CartItemError::ZeroQuantity);
        }
        self.quantity = quantity;
        Ok(self)
    }

    /// Check the type constraints.
    ///
    /// Items read back from storage bypass [`CartItem::new`], so restore
    /// calls this for every line.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), CartItemError> {
        if self.product_id.is_blank() {
            return Err(CartItemError::EmptyProductId);
        }
        if self.store_id.is_blank() {
            return Err(CartItemError::EmptyStoreId);
        }
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(CartItemError::NegativePrice(self.unit_price));
        }
        if self.quantity == 0 {
            return Err(CartItemError::ZeroQuantity);
        }
        Ok(())
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    #[must_use]
    pub const fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    #[must_use]
    pub const fn variant(&self) -> Option<&VariantId> {
        self.variant.as_ref()
    }

    #[must_use]
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price * quantity`, or `None` if the product leaves the
    /// [`Decimal`] range.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Unit price formatted for display.
    #[must_use]
    pub fn display_price(&self) -> String {
        Price::from_amount(self.unit_price).display()
    }

    /// Whether this line is the one identified by `(product_id, variant)`.
    #[must_use]
    pub fn matches(&self, product_id: &ProductId, variant: Option<&VariantId>) -> bool {
        self.product_id == *product_id && self.variant.as_ref() == variant
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults_to_single_unit() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::new(100, 0)).unwrap();
        assert_eq!(item.quantity(), 1);
        assert!(item.variant().is_none());
        assert_eq!(item.line_total(), Some(Decimal::new(100, 0)));
    }

    #[test]
    fn test_rejects_blank_ids() {
        assert_eq!(
            CartItem::new("", "s1", "Acme", Decimal::ONE),
            Err(CartItemError::EmptyProductId)
        );
        assert_eq!(
            CartItem::new("p1", "  ", "Acme", Decimal::ONE),
            Err(CartItemError::EmptyStoreId)
        );
    }

    #[test]
    fn test_rejects_negative_price() {
        assert!(matches!(
            CartItem::new("p1", "s1", "Acme", Decimal::new(-1, 2)),
            Err(CartItemError::NegativePrice(_))
        ));
    }

    #[test]
    fn test_free_item_is_allowed() {
        assert!(CartItem::new("p1", "s1", "Acme", Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_with_quantity_rejects_zero() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::ONE).unwrap();
        assert_eq!(item.with_quantity(0), Err(CartItemError::ZeroQuantity));
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::new(1999, 2))
            .unwrap()
            .with_quantity(3)
            .unwrap();
        assert_eq!(item.line_total(), Some(Decimal::new(5997, 2)));
        assert_eq!(item.display_price(), "$19.99");
    }

    #[test]
    fn test_line_total_out_of_range_is_none() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::MAX)
            .unwrap()
            .with_quantity(2)
            .unwrap();
        assert_eq!(item.line_total(), None);
    }

    #[test]
    fn test_matches_distinguishes_variants() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::ONE)
            .unwrap()
            .with_variant("red");
        let p1 = ProductId::new("p1");
        assert!(item.matches(&p1, Some(&VariantId::new("red"))));
        assert!(!item.matches(&p1, Some(&VariantId::new("blue"))));
        assert!(!item.matches(&p1, None));
    }

    #[test]
    fn test_serde_shape() {
        let item = CartItem::new("p1", "s1", "Acme", Decimal::new(1050, 2)).unwrap();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["storeId"], "s1");
        assert_eq!(json["unitPrice"], "10.50");
        assert!(json.get("variant").is_none());
    }
}
