//! Status enums for cart and order flow.

use serde::{Deserialize, Serialize};

/// How the shopper receives the order.
///
/// Orthogonal to cart contents: switching modes never touches line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMode {
    /// Courier delivery to the shopper's address.
    #[default]
    Delivery,
    /// Shopper collects the order from the retailer.
    Pickup,
}

impl std::fmt::Display for FulfillmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

impl std::str::FromStr for FulfillmentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            _ => Err(format!("invalid fulfillment mode: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_delivery() {
        assert_eq!(FulfillmentMode::default(), FulfillmentMode::Delivery);
    }

    #[test]
    fn test_from_str_roundtrip() {
        for mode in [FulfillmentMode::Delivery, FulfillmentMode::Pickup] {
            let parsed: FulfillmentMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
        assert!("courier".parse::<FulfillmentMode>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&FulfillmentMode::Pickup).unwrap();
        assert_eq!(json, "\"pickup\"");
    }
}
