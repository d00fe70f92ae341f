//! Saffron backend REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over `reqwest`; one typed request/response pair per endpoint
//! - The backend is the source of truth - no local sync, direct API calls
//! - The product list is cached in-memory via `moka` (60 second TTL) and
//!   invalidated by any catalog mutation
//!
//! The client implements the store- and checkout-facing traits
//! ([`AuthApi`], [`CatalogApi`], [`OrderPaymentApi`], [`OrderHistoryApi`]),
//! so everything above this module can be driven against stubs instead.

mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use saffron_core::{OrderId, PaymentReference, ProductId};

use crate::checkout::{IntentHandle, OrderPaymentApi};
use crate::config::BackendConfig;
use crate::models::{Order, Product, SessionToken};
use crate::payments::ClientSecret;
use crate::stores::catalog::{CatalogApi, ProductDraft};
use crate::stores::orders::OrderHistoryApi;
use crate::stores::session::{AuthApi, AuthSuccess, Credentials, Registration};

use types::{
    AuthResponse, CreateIntentRequest, CreateIntentResponse, ErrorBody, LoginRequest,
    ProcessOrderRequest, ProductEnvelope, RegisterRequest,
};

/// Errors that can occur at the backend API boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request never produced a response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the bearer token (or its absence).
    #[error("authentication rejected: {0}")]
    Unauthorized(String),

    /// The backend reported a failure. Carries its human-readable message.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// A 2xx response did not match the endpoint's expected shape.
    #[error("malformed response from {endpoint}: {source}")]
    MalformedResponse {
        endpoint: &'static str,
        source: serde_json::Error,
    },
}

const PRODUCTS_CACHE_KEY: &str = "products";
const PRODUCTS_CACHE_TTL: Duration = Duration::from_secs(60);

/// Client for the Saffron commerce backend.
///
/// Cheap to clone; all clones share one connection pool and product cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: String,
    products: Cache<&'static str, Arc<Vec<Product>>>,
}

impl BackendClient {
    /// Create a new backend client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let products = Cache::builder()
            .max_capacity(8)
            .time_to_live(PRODUCTS_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(BackendClientInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                products,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Decode a response body into `T`, mapping backend refusals and shape
    /// drift to distinguished errors. The body is read as text first so
    /// parse failures can be diagnosed from logs.
    async fn decode<T: DeserializeOwned>(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let text = response.text().await?;

        refuse(endpoint, status, &text)?;

        serde_json::from_str(&text).map_err(|source| {
            tracing::error!(
                endpoint,
                body = %text.chars().take(500).collect::<String>(),
                "backend response did not match its expected shape"
            );
            ApiError::MalformedResponse { endpoint, source }
        })
    }

    /// Like [`BackendClient::decode`] for endpoints whose body we discard.
    async fn accept(endpoint: &'static str, response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        let text = response.text().await?;
        refuse(endpoint, status, &text)
    }
}

/// Map non-success statuses to [`ApiError`], extracting the backend's
/// `{ "message": ... }` body when present.
fn refuse(endpoint: &'static str, status: StatusCode, body: &str) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }

    let message = error_message(body, status);
    debug!(endpoint, %status, message = %message, "backend refused request");

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized(message));
    }
    Err(ApiError::Backend {
        status: status.as_u16(),
        message,
    })
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| status.to_string(), |parsed| parsed.message)
}

// =============================================================================
// AuthApi
// =============================================================================

impl AuthApi for BackendClient {
    #[instrument(skip_all)]
    async fn login(&self, credentials: &Credentials) -> Result<AuthSuccess, ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest {
                email: credentials.email.as_str(),
                password: credentials.password.expose_secret(),
            })
            .send()
            .await?;

        let body: AuthResponse = Self::decode("auth/login", response).await?;
        Ok(AuthSuccess {
            identity: body.identity,
            token: SessionToken::new(body.token),
        })
    }

    #[instrument(skip_all)]
    async fn register(&self, registration: &Registration) -> Result<AuthSuccess, ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/register"))
            .json(&RegisterRequest {
                name: &registration.name,
                email: registration.email.as_str(),
                password: registration.password.expose_secret(),
            })
            .send()
            .await?;

        let body: AuthResponse = Self::decode("auth/register", response).await?;
        Ok(AuthSuccess {
            identity: body.identity,
            token: SessionToken::new(body.token),
        })
    }

    #[instrument(skip_all)]
    async fn logout(&self, token: &SessionToken) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/auth/logout"))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::accept("auth/logout", response).await
    }
}

// =============================================================================
// CatalogApi
// =============================================================================

impl CatalogApi for BackendClient {
    #[instrument(skip_all)]
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(cached) = self.inner.products.get(PRODUCTS_CACHE_KEY).await {
            debug!("cache hit for product list");
            return Ok((*cached).clone());
        }

        let response = self
            .inner
            .http
            .get(self.url("/api/product/get"))
            .send()
            .await?;

        let products: Vec<Product> = Self::decode("product/get", response).await?;
        self.inner
            .products
            .insert(PRODUCTS_CACHE_KEY, Arc::new(products.clone()))
            .await;

        Ok(products)
    }

    #[instrument(skip_all)]
    async fn create_product(
        &self,
        draft: &ProductDraft,
        token: &SessionToken,
    ) -> Result<Product, ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/product"))
            .bearer_auth(token.expose())
            .multipart(draft_form(draft)?)
            .send()
            .await?;

        let body: ProductEnvelope = Self::decode("product/create", response).await?;
        self.inner.products.invalidate(PRODUCTS_CACHE_KEY).await;
        Ok(body.product)
    }

    #[instrument(skip_all, fields(product_id = %id))]
    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        token: &SessionToken,
    ) -> Result<Product, ApiError> {
        let response = self
            .inner
            .http
            .put(self.url(&format!("/api/product/{id}")))
            .bearer_auth(token.expose())
            .multipart(draft_form(draft)?)
            .send()
            .await?;

        let body: ProductEnvelope = Self::decode("product/update", response).await?;
        self.inner.products.invalidate(PRODUCTS_CACHE_KEY).await;
        Ok(body.product)
    }

    #[instrument(skip_all, fields(product_id = %id))]
    async fn delete_product(&self, id: &ProductId, token: &SessionToken) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .delete(self.url(&format!("/api/product/{id}/delete")))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::accept("product/delete", response).await?;
        self.inner.products.invalidate(PRODUCTS_CACHE_KEY).await;
        Ok(())
    }
}

/// Build the multipart form the product endpoints expect: plain text fields
/// plus an optional image part.
fn draft_form(draft: &ProductDraft) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("name", draft.name.clone())
        .text("price", draft.price.to_string())
        .text("description", draft.description.clone())
        .text("stock", draft.stock.to_string());

    if let Some(image) = &draft.image {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        form = form.part("image", part);
    }

    Ok(form)
}

// =============================================================================
// OrderPaymentApi
// =============================================================================

impl OrderPaymentApi for BackendClient {
    #[instrument(skip_all, fields(product_id = %product_id, quantity))]
    async fn create_intent(
        &self,
        product_id: &ProductId,
        quantity: u32,
        token: &SessionToken,
    ) -> Result<IntentHandle, ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/payment/create-payment-intent"))
            .bearer_auth(token.expose())
            .json(&CreateIntentRequest {
                product_id,
                quantity,
            })
            .send()
            .await?;

        let body: CreateIntentResponse =
            Self::decode("payment/create-payment-intent", response).await?;
        Ok(IntentHandle {
            client_secret: ClientSecret::new(body.client_secret),
            amount: body.amount,
            order_id: body.order_id,
        })
    }

    #[instrument(skip_all, fields(order_id = %order_id))]
    async fn mark_processed(
        &self,
        order_id: &OrderId,
        payment_reference: &PaymentReference,
        token: &SessionToken,
    ) -> Result<(), ApiError> {
        let response = self
            .inner
            .http
            .post(self.url("/api/order/process"))
            .bearer_auth(token.expose())
            .json(&ProcessOrderRequest {
                order_id,
                payment_intent_id: payment_reference,
            })
            .send()
            .await?;

        Self::accept("order/process", response).await
    }

    #[instrument(skip_all)]
    async fn order_by_payment_reference(
        &self,
        payment_reference: &PaymentReference,
        token: &SessionToken,
    ) -> Result<Order, ApiError> {
        let response = self
            .inner
            .http
            .get(self.url(&format!("/api/payment/order-status/{payment_reference}")))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::decode("payment/order-status", response).await
    }
}

// =============================================================================
// OrderHistoryApi
// =============================================================================

impl OrderHistoryApi for BackendClient {
    #[instrument(skip_all)]
    async fn my_orders(&self, token: &SessionToken) -> Result<Vec<Order>, ApiError> {
        let response = self
            .inner
            .http
            .get(self.url("/api/order/my-orders"))
            .bearer_auth(token.expose())
            .send()
            .await?;

        Self::decode("order/my-orders", response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_backend_body() {
        let message = error_message(
            r#"{"message": "Product is out of stock"}"#,
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(message, "Product is out of stock");
    }

    #[test]
    fn test_error_message_falls_back_to_status() {
        let message = error_message("<html>boom</html>", StatusCode::BAD_GATEWAY);
        assert_eq!(message, "502 Bad Gateway");
    }

    #[test]
    fn test_refuse_passes_success() {
        assert!(refuse("x", StatusCode::OK, "").is_ok());
        assert!(refuse("x", StatusCode::CREATED, "{}").is_ok());
    }

    #[test]
    fn test_refuse_distinguishes_unauthorized() {
        let err = refuse(
            "x",
            StatusCode::UNAUTHORIZED,
            r#"{"message": "Token expired"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Token expired"));

        let err = refuse("x", StatusCode::NOT_FOUND, r#"{"message": "No product"}"#).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Backend {
                status: 404,
                ref message
            } if message == "No product"
        ));
    }

    #[test]
    fn test_url_joining_tolerates_trailing_slash() {
        let config = BackendConfig {
            base_url: url::Url::parse("http://localhost:8000/").unwrap(),
        };
        let client = BackendClient::new(&config);
        assert_eq!(
            client.url("/api/product/get"),
            "http://localhost:8000/api/product/get"
        );
    }
}
