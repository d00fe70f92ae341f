//! Integration test support for Saffron.
//!
//! Stub collaborators implementing the storefront's backend and gateway
//! traits, with programmable outcomes and call counters. The checkout
//! properties in `tests/` are all verified against these stubs - the real
//! [`saffron_storefront::api::BackendClient`] and
//! [`saffron_storefront::payments::StripeGateway`] share the same traits,
//! so the flow under test is the production one.
//!
//! Locking discipline: every stub holds its state in a `std::sync::Mutex`
//! and never awaits while holding the guard.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use saffron_core::{Amount, Email, OrderId, OrderStatus, PaymentReference, ProductId, Role, UserId};
use saffron_storefront::api::ApiError;
use saffron_storefront::checkout::{IntentHandle, OrderPaymentApi};
use saffron_storefront::models::{Identity, Order, Product, SessionToken};
use saffron_storefront::payments::{
    CardDetails, ClientSecret, GatewayError, PaymentConfirmation, PaymentGateway, PaymentStatus,
};
use saffron_storefront::stores::SessionStore;
use saffron_storefront::stores::catalog::{CatalogApi, ProductDraft};
use saffron_storefront::stores::orders::OrderHistoryApi;
use saffron_storefront::stores::session::{AuthApi, AuthSuccess, Credentials, Registration};

// =============================================================================
// Auth stub + session bootstrap
// =============================================================================

/// Auth endpoint stub that accepts any credentials and issues a fixed
/// identity and token.
pub struct StubAuth {
    /// Role to attach to the issued identity.
    pub role: Role,
    /// Token to issue.
    pub token: String,
}

impl StubAuth {
    #[must_use]
    pub fn customer() -> Self {
        Self {
            role: Role::Customer,
            token: "tok-test".to_string(),
        }
    }

    #[must_use]
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            token: "tok-admin".to_string(),
        }
    }

    fn issue(&self) -> AuthSuccess {
        AuthSuccess {
            identity: Identity {
                id: UserId::new("u-test"),
                name: "Test Shopper".to_string(),
                email: Email::parse("shopper@example.com").unwrap_or_else(|_| unreachable!()),
                role: self.role,
            },
            token: SessionToken::new(self.token.clone()),
        }
    }
}

impl AuthApi for StubAuth {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthSuccess, ApiError> {
        Ok(self.issue())
    }

    async fn register(&self, _registration: &Registration) -> Result<AuthSuccess, ApiError> {
        Ok(self.issue())
    }

    async fn logout(&self, _token: &SessionToken) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Open a session store under `state_dir` and sign it in with the given
/// role.
///
/// # Panics
///
/// Panics if the stubbed login fails, which it never does.
pub async fn signed_in_session(state_dir: &std::path::Path, role: Role) -> SessionStore {
    let auth = StubAuth {
        role,
        token: match role {
            Role::Admin => "tok-admin".to_string(),
            Role::Customer => "tok-test".to_string(),
        },
    };
    let mut session = SessionStore::open(state_dir).await;
    let credentials = Credentials::new(
        Email::parse("shopper@example.com").unwrap_or_else(|_| unreachable!()),
        "password",
    );
    session
        .login(&auth, &credentials)
        .await
        .unwrap_or_else(|e| panic!("stub login failed: {e}"));
    session
}

// =============================================================================
// Order/payment backend stub
// =============================================================================

/// What the backend stub does on the next `create_intent` call.
#[derive(Debug, Clone)]
pub enum IntentPlan {
    /// Issue an intent and create the pending order that goes with it.
    Issue {
        client_secret: String,
        amount: i64,
        order_id: String,
    },
    /// Refuse with a backend-reported error.
    Refuse { status: u16, message: String },
}

/// Call counters exposed to assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendCounts {
    pub create_intent: u32,
    pub mark_processed: u32,
    pub order_lookup: u32,
}

#[derive(Debug)]
struct StubOrder {
    status: OrderStatus,
    total: Amount,
    reference: Option<PaymentReference>,
    /// Times this order transitioned pending -> completed. Idempotent
    /// processing must leave this at 1.
    fulfillments: u32,
}

#[derive(Debug, Default)]
struct BackendState {
    plan: VecDeque<IntentPlan>,
    orders: HashMap<OrderId, StubOrder>,
    /// `mark_processed` fails this many times before succeeding.
    mark_processed_failures: u32,
    /// When false, processing records the payment reference but leaves the
    /// order pending - the reconciliation-failure case.
    finalize_orders: bool,
    counts: BackendCounts,
}

/// Programmable stub for the backend order/payment endpoints.
///
/// `mark_processed` honors the idempotence contract the real backend must
/// provide: re-invoking it with the same order and payment reference leaves
/// the order state unchanged.
#[derive(Debug)]
pub struct StubBackend {
    state: Mutex<BackendState>,
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StubBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BackendState {
                finalize_orders: true,
                ..BackendState::default()
            }),
        }
    }

    /// Plan a successful intent issuance.
    pub fn plan_intent(&self, client_secret: &str, amount: i64, order_id: &str) {
        self.lock().plan.push_back(IntentPlan::Issue {
            client_secret: client_secret.to_string(),
            amount,
            order_id: order_id.to_string(),
        });
    }

    /// Plan a refused intent creation (e.g., out of stock, backend down).
    pub fn plan_intent_failure(&self, status: u16, message: &str) {
        self.lock().plan.push_back(IntentPlan::Refuse {
            status,
            message: message.to_string(),
        });
    }

    /// Make the next `count` calls to `mark_processed` fail with a server
    /// fault.
    pub fn fail_mark_processed(&self, count: u32) {
        self.lock().mark_processed_failures = count;
    }

    /// Stop finalizing orders on `mark_processed`: capture is acknowledged
    /// but the order stays pending.
    pub fn leave_orders_pending(&self) {
        self.lock().finalize_orders = false;
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn counts(&self) -> BackendCounts {
        self.lock().counts
    }

    /// Current status of an order, if the stub created one.
    #[must_use]
    pub fn order_status(&self, order_id: &OrderId) -> Option<OrderStatus> {
        self.lock().orders.get(order_id).map(|o| o.status)
    }

    /// How many times an order transitioned to completed.
    #[must_use]
    pub fn fulfillments(&self, order_id: &OrderId) -> u32 {
        self.lock()
            .orders
            .get(order_id)
            .map_or(0, |o| o.fulfillments)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OrderPaymentApi for StubBackend {
    async fn create_intent(
        &self,
        _product_id: &ProductId,
        _quantity: u32,
        _token: &SessionToken,
    ) -> Result<IntentHandle, ApiError> {
        let mut state = self.lock();
        state.counts.create_intent += 1;

        match state.plan.pop_front() {
            Some(IntentPlan::Issue {
                client_secret,
                amount,
                order_id,
            }) => {
                let order_id = OrderId::new(order_id);
                state.orders.insert(
                    order_id.clone(),
                    StubOrder {
                        status: OrderStatus::Pending,
                        total: Amount::new(amount),
                        reference: None,
                        fulfillments: 0,
                    },
                );
                Ok(IntentHandle {
                    client_secret: ClientSecret::new(client_secret),
                    amount: Amount::new(amount),
                    order_id,
                })
            }
            Some(IntentPlan::Refuse { status, message }) => {
                Err(ApiError::Backend { status, message })
            }
            None => Err(ApiError::Backend {
                status: 500,
                message: "stub has no planned intent".to_string(),
            }),
        }
    }

    async fn mark_processed(
        &self,
        order_id: &OrderId,
        payment_reference: &PaymentReference,
        _token: &SessionToken,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.counts.mark_processed += 1;

        if state.mark_processed_failures > 0 {
            state.mark_processed_failures -= 1;
            return Err(ApiError::Backend {
                status: 502,
                message: "upstream timeout".to_string(),
            });
        }

        let finalize = state.finalize_orders;
        let Some(order) = state.orders.get_mut(order_id) else {
            return Err(ApiError::Backend {
                status: 404,
                message: "Order not found".to_string(),
            });
        };

        // Idempotent per (order, reference): a repeat of an already
        // processed pair changes nothing.
        if order.reference.as_ref() == Some(payment_reference)
            && order.status == OrderStatus::Completed
        {
            return Ok(());
        }

        order.reference = Some(payment_reference.clone());
        if finalize && order.status == OrderStatus::Pending {
            order.status = OrderStatus::Completed;
            order.fulfillments += 1;
        }
        Ok(())
    }

    async fn order_by_payment_reference(
        &self,
        payment_reference: &PaymentReference,
        _token: &SessionToken,
    ) -> Result<Order, ApiError> {
        let mut state = self.lock();
        state.counts.order_lookup += 1;

        let found = state
            .orders
            .iter()
            .find(|(_, order)| order.reference.as_ref() == Some(payment_reference));

        match found {
            Some((id, order)) => Ok(Order {
                id: id.clone(),
                items: Vec::new(),
                total_amount: order.total,
                status: order.status,
                created_at: Utc
                    .with_ymd_and_hms(2025, 11, 4, 12, 0, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
            }),
            None => Err(ApiError::Backend {
                status: 404,
                message: "No order for payment reference".to_string(),
            }),
        }
    }
}

// =============================================================================
// Payment gateway stub
// =============================================================================

/// What the gateway stub does on the next confirmation.
#[derive(Debug, Clone)]
pub enum GatewayPlan {
    /// Report the intent as succeeded under the given reference.
    Succeed { reference: String },
    /// Report a non-terminal provider status.
    Status {
        reference: String,
        status: PaymentStatus,
    },
    /// Decline the instrument with the provider's message.
    Decline { message: String },
}

#[derive(Debug, Default)]
struct GatewayState {
    plan: VecDeque<GatewayPlan>,
    seen_secrets: Vec<String>,
}

/// Programmable stub for the card payment gateway.
#[derive(Debug, Default)]
pub struct StubGateway {
    state: Mutex<GatewayState>,
}

impl StubGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan a successful confirmation.
    pub fn plan_success(&self, reference: &str) {
        self.lock().plan.push_back(GatewayPlan::Succeed {
            reference: reference.to_string(),
        });
    }

    /// Plan a confirmation that resolves to a non-succeeded status.
    pub fn plan_status(&self, reference: &str, status: PaymentStatus) {
        self.lock().plan.push_back(GatewayPlan::Status {
            reference: reference.to_string(),
            status,
        });
    }

    /// Plan a decline.
    pub fn plan_decline(&self, message: &str) {
        self.lock().plan.push_back(GatewayPlan::Decline {
            message: message.to_string(),
        });
    }

    /// Every client secret this gateway was handed, in call order.
    #[must_use]
    pub fn seen_secrets(&self) -> Vec<String> {
        self.lock().seen_secrets.clone()
    }

    /// How many confirmations were attempted.
    #[must_use]
    pub fn confirmations(&self) -> usize {
        self.lock().seen_secrets.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PaymentGateway for StubGateway {
    async fn confirm_payment(
        &self,
        client_secret: &ClientSecret,
        _card: &CardDetails,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let mut state = self.lock();
        state.seen_secrets.push(client_secret.expose().to_string());

        match state.plan.pop_front() {
            Some(GatewayPlan::Succeed { reference }) => Ok(PaymentConfirmation {
                payment_reference: PaymentReference::new(reference),
                status: PaymentStatus::Succeeded,
            }),
            Some(GatewayPlan::Status { reference, status }) => Ok(PaymentConfirmation {
                payment_reference: PaymentReference::new(reference),
                status,
            }),
            Some(GatewayPlan::Decline { message }) => Err(GatewayError::Declined(message)),
            None => Err(GatewayError::Provider(
                "stub has no planned outcome".to_string(),
            )),
        }
    }
}

// =============================================================================
// Catalog + order history stubs
// =============================================================================

#[derive(Debug, Default)]
struct CatalogState {
    products: Vec<Product>,
    refuse: Option<(u16, String)>,
    next_id: u32,
    mutation_calls: u32,
}

/// Programmable stub for the catalog endpoints.
#[derive(Debug, Default)]
pub struct StubCatalog {
    state: Mutex<CatalogState>,
}

impl StubCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stub's product list.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(CatalogState {
                products,
                ..CatalogState::default()
            }),
        }
    }

    /// Refuse every subsequent call with this backend error.
    pub fn refuse(&self, status: u16, message: &str) {
        self.lock().refuse = Some((status, message.to_string()));
    }

    /// How many mutation endpoints were hit.
    #[must_use]
    pub fn mutation_calls(&self) -> u32 {
        self.lock().mutation_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_refusal(state: &CatalogState) -> Result<(), ApiError> {
        match &state.refuse {
            Some((status, message)) => Err(ApiError::Backend {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn materialize(state: &mut CatalogState, draft: &ProductDraft, id: ProductId) -> Product {
        let product = Product {
            id,
            name: draft.name.clone(),
            price: draft.price,
            description: draft.description.clone(),
            stock: draft.stock,
            image_url: draft.image.as_ref().map(|i| format!("/uploads/{}", i.file_name)),
        };
        state.mutation_calls += 1;
        product
    }
}

impl CatalogApi for StubCatalog {
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError> {
        let state = self.lock();
        Self::check_refusal(&state)?;
        Ok(state.products.clone())
    }

    async fn create_product(
        &self,
        draft: &ProductDraft,
        _token: &SessionToken,
    ) -> Result<Product, ApiError> {
        let mut state = self.lock();
        Self::check_refusal(&state)?;
        state.next_id += 1;
        let id = ProductId::new(format!("p-{}", state.next_id));
        let product = Self::materialize(&mut state, draft, id);
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        _token: &SessionToken,
    ) -> Result<Product, ApiError> {
        let mut state = self.lock();
        Self::check_refusal(&state)?;
        let product = Self::materialize(&mut state, draft, id.clone());
        if let Some(existing) = state.products.iter_mut().find(|p| &p.id == id) {
            *existing = product.clone();
            Ok(product)
        } else {
            Err(ApiError::Backend {
                status: 404,
                message: "Product not found".to_string(),
            })
        }
    }

    async fn delete_product(&self, id: &ProductId, _token: &SessionToken) -> Result<(), ApiError> {
        let mut state = self.lock();
        Self::check_refusal(&state)?;
        state.mutation_calls += 1;
        state.products.retain(|p| &p.id != id);
        Ok(())
    }
}

/// Fixed-response stub for the order history endpoint.
#[derive(Debug, Default)]
pub struct StubOrderHistory {
    orders: Vec<Order>,
}

impl StubOrderHistory {
    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }
}

impl OrderHistoryApi for StubOrderHistory {
    async fn my_orders(&self, _token: &SessionToken) -> Result<Vec<Order>, ApiError> {
        Ok(self.orders.clone())
    }
}

/// Build a product for seeding stubs.
#[must_use]
pub fn product(id: &str, name: &str, price: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Amount::new(price),
        description: String::new(),
        stock,
        image_url: None,
    }
}

/// A well-formed test card.
#[must_use]
pub fn test_card() -> CardDetails {
    CardDetails {
        number: "4242424242424242".to_string(),
        exp_month: 12,
        exp_year: 2030,
        cvc: "123".to_string(),
    }
}
