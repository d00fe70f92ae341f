//! Order model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use saffron_core::{Amount, OrderId, OrderStatus, ProductId};

/// The slice of a product the backend embeds in order line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product id, when the backend populates it.
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<ProductId>,
    /// Display name at the time the order was placed.
    #[serde(default)]
    pub name: String,
    /// Product image path, if any.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// The purchased product.
    #[serde(default)]
    pub product: ProductSummary,
    /// Units purchased.
    pub quantity: u32,
    /// Unit price at purchase time.
    #[serde(rename = "price")]
    pub unit_price: Amount,
}

impl OrderItem {
    /// Line subtotal, saturating on (absurd) overflow.
    #[must_use]
    pub fn subtotal(&self) -> Amount {
        self.unit_price
            .checked_times(self.quantity)
            .unwrap_or(Amount::new(i64::MAX))
    }
}

/// The backend's authoritative record of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend document id.
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    /// Line items. May be absent on status-only lookups.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Order total.
    pub total_amount: Amount,
    /// Fulfillment status. Only the backend moves this to `completed`.
    pub status: OrderStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_populated_order() {
        let json = r#"{
            "_id": "ord1",
            "items": [
                {
                    "product": {"_id": "p1", "name": "Chai", "imageUrl": "/uploads/chai.jpg"},
                    "quantity": 2,
                    "price": 499
                }
            ],
            "totalAmount": 998,
            "status": "pending",
            "createdAt": "2025-11-04T10:15:00Z"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id.as_str(), "ord1");
        assert_eq!(order.items.len(), 1);
        let item = order.items.first().unwrap();
        assert_eq!(item.subtotal(), Amount::new(998));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_deserialize_status_only_lookup() {
        // The order-status endpoint omits line items
        let json = r#"{
            "_id": "ord2",
            "totalAmount": 499,
            "status": "completed",
            "createdAt": "2025-11-04T10:20:00Z"
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert!(order.items.is_empty());
        assert_eq!(order.status, OrderStatus::Completed);
    }

    #[test]
    fn test_missing_status_is_an_error() {
        let json = r#"{"_id": "ord3", "totalAmount": 1, "createdAt": "2025-11-04T10:20:00Z"}"#;
        assert!(serde_json::from_str::<Order>(json).is_err());
    }
}
