//! Catalog product model.

use serde::{Deserialize, Serialize};

use saffron_core::{Amount, ProductId};

/// A product in the backend catalog.
///
/// The backend owns this record; the client holds a read-through cached
/// copy and never mutates it locally without a confirmed backend write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend document id.
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price as an integer amount.
    pub price: Amount,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Units in stock. Authoritative only on the backend.
    #[serde(default)]
    pub stock: u32,
    /// Backend-relative path of the product image, if one was uploaded.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    /// Whether the backend reported any units in stock at fetch time.
    ///
    /// Display-only. The checkout flow does not consult this; stock is
    /// re-checked server-side when the payment intent is created.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_document() {
        let json = r#"{
            "_id": "66a1f0",
            "name": "Masala Chai Sampler",
            "price": 499,
            "description": "Twelve blends",
            "stock": 3,
            "imageUrl": "/uploads/chai.jpg",
            "__v": 0
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "66a1f0");
        assert_eq!(product.price, Amount::new(499));
        assert_eq!(product.image_url.as_deref(), Some("/uploads/chai.jpg"));
        assert!(product.in_stock());
    }

    #[test]
    fn test_deserialize_minimal_document() {
        // description, stock, and image are optional on the wire
        let json = r#"{"_id": "p1", "name": "Bare", "price": 10}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.description, "");
        assert_eq!(product.stock, 0);
        assert!(!product.in_stock());
    }

    #[test]
    fn test_missing_price_is_an_error() {
        let json = r#"{"_id": "p1", "name": "No price"}"#;
        assert!(serde_json::from_str::<Product>(json).is_err());
    }
}
