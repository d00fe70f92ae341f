//! Wire types for the backend REST API.
//!
//! One explicit request/response shape per endpoint; responses are parsed
//! into these types at the boundary so a drifting backend fails loudly as
//! [`crate::api::ApiError::MalformedResponse`] instead of propagating
//! missing fields.

use serde::{Deserialize, Serialize};

use saffron_core::{Amount, OrderId, PaymentReference, ProductId};

use crate::models::Identity;

/// `POST /api/auth/login` request body.
#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /api/auth/register` request body.
#[derive(Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Login/registration success body: the identity fields with the token
/// alongside them.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub identity: Identity,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}

/// Envelope around a created/updated product.
#[derive(Debug, Deserialize)]
pub(crate) struct ProductEnvelope {
    pub product: crate::models::Product,
}

/// `POST /api/payment/create-payment-intent` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateIntentRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// `POST /api/payment/create-payment-intent` success body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateIntentResponse {
    pub client_secret: String,
    pub amount: Amount,
    pub order_id: OrderId,
}

/// `POST /api/order/process` request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProcessOrderRequest<'a> {
    pub order_id: &'a OrderId,
    pub payment_intent_id: &'a PaymentReference,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_flattens_identity() {
        let json = r#"{
            "_id": "u7",
            "name": "Dev",
            "email": "dev@example.com",
            "role": "Admin",
            "token": "tok-xyz",
            "createdAt": "2025-01-01T00:00:00Z"
        }"#;

        let parsed: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.token, "tok-xyz");
        assert_eq!(parsed.identity.id.as_str(), "u7");
        assert!(parsed.identity.role.is_admin());
    }

    #[test]
    fn test_create_intent_request_wire_names() {
        let product_id = ProductId::new("p1");
        let request = CreateIntentRequest {
            product_id: &product_id,
            quantity: 2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["quantity"], 2);
    }

    #[test]
    fn test_create_intent_response() {
        let json = r#"{"clientSecret": "pi_1_secret_2", "amount": 499, "orderId": "ord9"}"#;
        let parsed: CreateIntentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.amount, Amount::new(499));
        assert_eq!(parsed.order_id.as_str(), "ord9");
    }

    #[test]
    fn test_process_order_request_wire_names() {
        let order_id = OrderId::new("ord9");
        let reference = PaymentReference::new("pi_123");
        let request = ProcessOrderRequest {
            order_id: &order_id,
            payment_intent_id: &reference,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], "ord9");
        assert_eq!(json["paymentIntentId"], "pi_123");
    }

    #[test]
    fn test_error_body() {
        let parsed: ErrorBody = serde_json::from_str(r#"{"message": "Out of stock"}"#).unwrap();
        assert_eq!(parsed.message, "Out of stock");
    }
}
