//! Checkout orchestration.
//!
//! Drives a single purchase attempt for one product and quantity through an
//! explicit state machine:
//!
//! ```text
//! Idle -> CreatingIntent -> AwaitingCardConfirmation
//!      -> ConfirmingWithProvider -> VerifyingOrder -> Completed | Failed
//! ```
//!
//! The flow deliberately splits "the provider confirmed the payment" from
//! "the backend finalized the order": funds capture and order bookkeeping
//! are two independently failing systems, and treating provider success as
//! ground truth would let paid-but-unfulfilled orders look successful. An
//! order counts as purchased only when the backend re-reports it as
//! `completed` after being told about the capture.
//!
//! Each attempt owns one orchestrator value, one payment intent, and one
//! order; two concurrent attempts share nothing but the read-only session
//! token. All steps are strictly sequential - the three network calls are
//! the only suspension points, and the caller observes only discrete state
//! transitions.

use tracing::instrument;

use saffron_core::{Amount, OrderId, OrderStatus, PaymentReference, ProductId};

use crate::api::ApiError;
use crate::models::{Order, SessionToken};
use crate::payments::{CardDetails, ClientSecret, PaymentGateway};
use crate::stores::session::SessionStore;

/// Checkout failure kinds.
///
/// Every variant is user-renderable; [`CheckoutError::Reconciliation`] is
/// the only one where money may have moved without a finalized order, so it
/// always names the order for manual support follow-up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    /// Missing or invalid session; the user must re-authenticate.
    #[error("authentication required: {0}")]
    Auth(String),

    /// Bad input (zero quantity, unknown product, out of stock). Not
    /// retried automatically; the caller must resubmit.
    #[error("{0}")]
    Validation(String),

    /// The payment provider declined the instrument or failed. Carries the
    /// provider's message verbatim. Retrying requires a fresh intent since
    /// the client secret is single-use.
    #[error("{0}")]
    Provider(String),

    /// Network or server fault while talking to the backend. Retryable by
    /// re-initiating from intent creation - or, after capture, by
    /// explicitly re-invoking verification.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Payment captured but the order was not finalized. Never retried
    /// automatically; requires manual reconciliation.
    #[error(
        "payment captured but order {order_id} not finalized (status {status}); \
         contact support with this order id"
    )]
    Reconciliation {
        /// The order whose funds were captured.
        order_id: OrderId,
        /// Authoritative status the backend reported instead of `completed`.
        status: OrderStatus,
    },
}

/// Terminal failure context.
///
/// Carries enough to support manual follow-up: which order (if one was
/// created), which payment (if capture succeeded), and whether funds moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFailure {
    /// What went wrong.
    pub error: CheckoutError,
    /// The order created for this attempt, when intent creation got far
    /// enough to produce one.
    pub order_id: Option<OrderId>,
    /// The provider's payment reference, when capture succeeded.
    pub payment_reference: Option<PaymentReference>,
    /// Whether the provider captured funds before the failure.
    pub captured: bool,
}

/// What a completed checkout reports for downstream navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    /// The finalized order.
    pub order_id: OrderId,
    /// Amount charged.
    pub amount: Amount,
    /// The provider's payment reference.
    pub payment_reference: PaymentReference,
}

/// Observable state of one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing started.
    Idle,
    /// Asking the backend for a payment intent and pending order.
    CreatingIntent,
    /// Intent created; waiting for the user to submit a payment instrument.
    AwaitingCardConfirmation {
        order_id: OrderId,
        amount: Amount,
    },
    /// Confirming the instrument with the payment provider.
    ConfirmingWithProvider {
        order_id: OrderId,
        amount: Amount,
    },
    /// Capture succeeded; asking the backend to finalize and re-report the
    /// order.
    VerifyingOrder {
        order_id: OrderId,
        amount: Amount,
        payment_reference: PaymentReference,
    },
    /// The backend confirmed the order as completed.
    Completed(CheckoutReceipt),
    /// The attempt failed; see the carried context.
    Failed(CheckoutFailure),
}

impl CheckoutState {
    /// Whether the attempt has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

/// The backend's payment intent response: a single-use client secret, the
/// amount to charge, and the pending order created alongside the intent.
#[derive(Debug)]
pub struct IntentHandle {
    /// Single-use secret for the provider confirmation call.
    pub client_secret: ClientSecret,
    /// Amount the backend will charge.
    pub amount: Amount,
    /// The pending order bound to this intent.
    pub order_id: OrderId,
}

/// Backend endpoints the checkout flow drives.
///
/// `mark_processed` must be idempotent server-side: re-invoking it with the
/// same order id and payment reference after a transient failure must not
/// double-fulfill. That contract belongs to the backend; this client only
/// relies on it.
pub trait OrderPaymentApi {
    /// Create a payment intent and its pending order. Stock availability is
    /// checked server-side here.
    async fn create_intent(
        &self,
        product_id: &ProductId,
        quantity: u32,
        token: &SessionToken,
    ) -> Result<IntentHandle, ApiError>;

    /// Tell the backend the payment was captured so it can finalize the
    /// order. Idempotent per (order, payment reference).
    async fn mark_processed(
        &self,
        order_id: &OrderId,
        payment_reference: &PaymentReference,
        token: &SessionToken,
    ) -> Result<(), ApiError>;

    /// Re-fetch the authoritative order by the provider's payment
    /// reference.
    async fn order_by_payment_reference(
        &self,
        payment_reference: &PaymentReference,
        token: &SessionToken,
    ) -> Result<Order, ApiError>;
}

/// Everything captured at intent creation that later steps need.
#[derive(Debug, Clone)]
struct Attempt {
    order_id: OrderId,
    amount: Amount,
    // The token is snapshotted here so the whole attempt runs under the
    // credentials it started with, even if the session store changes.
    token: SessionToken,
}

/// One purchase attempt, from intent creation through order finalization.
///
/// Construct one orchestrator per attempt. Methods drive the state machine;
/// [`CheckoutOrchestrator::state`] exposes where the attempt currently is,
/// including terminal failure context.
pub struct CheckoutOrchestrator<'a, B, G> {
    backend: &'a B,
    gateway: &'a G,
    session: &'a SessionStore,
    state: CheckoutState,
    attempt: Option<Attempt>,
    client_secret: Option<ClientSecret>,
}

impl<'a, B, G> CheckoutOrchestrator<'a, B, G>
where
    B: OrderPaymentApi,
    G: PaymentGateway,
{
    /// Create an idle orchestrator for one purchase attempt.
    #[must_use]
    pub const fn new(backend: &'a B, gateway: &'a G, session: &'a SessionStore) -> Self {
        Self {
            backend,
            gateway,
            session,
            state: CheckoutState::Idle,
            attempt: None,
            client_secret: None,
        }
    }

    /// Current state of the attempt.
    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// The receipt, once the attempt completed.
    #[must_use]
    pub const fn receipt(&self) -> Option<&CheckoutReceipt> {
        match &self.state {
            CheckoutState::Completed(receipt) => Some(receipt),
            _ => None,
        }
    }

    /// Start (or restart) the attempt: create a payment intent and pending
    /// order for `product_id` x `quantity`.
    ///
    /// Callable from `Idle` or `Failed`; restarting always requests a
    /// brand-new client secret and order - secrets are single-use and never
    /// reused across attempts. Intent creation is not retried
    /// automatically.
    ///
    /// # Errors
    ///
    /// Fails fast with [`CheckoutError::Auth`] when no session token is
    /// present; otherwise maps the backend's refusal or fault. Any error
    /// also moves the state to `Failed`.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn begin(
        &mut self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CheckoutError> {
        match self.state {
            CheckoutState::Idle | CheckoutState::Failed(_) => {}
            _ => {
                return Err(CheckoutError::Validation(
                    "a checkout attempt is already in progress".to_string(),
                ));
            }
        }

        // A restart abandons any previous intent outright.
        self.attempt = None;
        self.client_secret = None;

        if quantity == 0 {
            return self.fail(
                CheckoutError::Validation("quantity must be at least 1".to_string()),
                None,
                None,
                false,
            );
        }

        let Some(token) = self.session.token().cloned() else {
            return self.fail(
                CheckoutError::Auth("sign in to check out".to_string()),
                None,
                None,
                false,
            );
        };

        self.state = CheckoutState::CreatingIntent;
        match self.backend.create_intent(product_id, quantity, &token).await {
            Ok(handle) => {
                tracing::debug!(order_id = %handle.order_id, "payment intent created");
                self.attempt = Some(Attempt {
                    order_id: handle.order_id.clone(),
                    amount: handle.amount,
                    token,
                });
                self.client_secret = Some(handle.client_secret);
                self.state = CheckoutState::AwaitingCardConfirmation {
                    order_id: handle.order_id,
                    amount: handle.amount,
                };
                Ok(())
            }
            Err(error) => self.fail(classify(error), None, None, false),
        }
    }

    /// Submit the captured payment instrument: confirm with the provider,
    /// then verify the order with the backend.
    ///
    /// Callable only from `AwaitingCardConfirmation`. The client secret is
    /// consumed by this call whatever the outcome; a provider failure
    /// therefore requires restarting with [`CheckoutOrchestrator::begin`].
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Provider`] if the instrument is declined or the
    /// provider faults (no backend call is made in that case);
    /// [`CheckoutError::Backend`] or [`CheckoutError::Reconciliation`] from
    /// the verification step. Any error also moves the state to `Failed`.
    #[instrument(skip_all)]
    pub async fn submit_card(&mut self, card: &CardDetails) -> Result<(), CheckoutError> {
        if !matches!(self.state, CheckoutState::AwaitingCardConfirmation { .. }) {
            return Err(CheckoutError::Validation(
                "no payment is awaiting confirmation".to_string(),
            ));
        }
        let (Some(attempt), Some(secret)) = (self.attempt.clone(), self.client_secret.take())
        else {
            return Err(CheckoutError::Validation(
                "no payment is awaiting confirmation".to_string(),
            ));
        };

        self.state = CheckoutState::ConfirmingWithProvider {
            order_id: attempt.order_id.clone(),
            amount: attempt.amount,
        };

        // This call suspends for the provider round trip (network + issuer
        // authorization); there is no client-owned timeout.
        let confirmation = match self.gateway.confirm_payment(&secret, card).await {
            Ok(confirmation) => confirmation,
            Err(error) => {
                // GatewayError::Declined renders as the provider's message
                // verbatim; other variants keep their own prefix.
                return self.fail(
                    CheckoutError::Provider(error.to_string()),
                    Some(attempt.order_id),
                    None,
                    false,
                );
            }
        };

        if !confirmation.succeeded() {
            return self.fail(
                CheckoutError::Provider(format!(
                    "payment not completed (provider status {:?})",
                    confirmation.status
                )),
                Some(attempt.order_id),
                None,
                false,
            );
        }

        let reference = confirmation.payment_reference;
        self.state = CheckoutState::VerifyingOrder {
            order_id: attempt.order_id.clone(),
            amount: attempt.amount,
            payment_reference: reference.clone(),
        };
        self.verify(&attempt, reference).await
    }

    /// Explicitly re-run verification after a transient backend failure
    /// that happened post-capture.
    ///
    /// Safe because `mark_processed` is idempotent server-side. Callable
    /// only from a `Failed` state whose error is [`CheckoutError::Backend`]
    /// with funds captured; reconciliation failures are never retried.
    ///
    /// # Errors
    ///
    /// Same as the verification step of [`CheckoutOrchestrator::submit_card`].
    #[instrument(skip_all)]
    pub async fn retry_verification(&mut self) -> Result<(), CheckoutError> {
        let retryable = matches!(
            &self.state,
            CheckoutState::Failed(CheckoutFailure {
                error: CheckoutError::Backend(_),
                captured: true,
                ..
            })
        );
        if !retryable {
            return Err(CheckoutError::Validation(
                "verification cannot be retried in this state".to_string(),
            ));
        }

        let reference = match &self.state {
            CheckoutState::Failed(failure) => failure.payment_reference.clone(),
            _ => None,
        };
        let (Some(attempt), Some(reference)) = (self.attempt.clone(), reference) else {
            return Err(CheckoutError::Validation(
                "verification cannot be retried in this state".to_string(),
            ));
        };

        self.state = CheckoutState::VerifyingOrder {
            order_id: attempt.order_id.clone(),
            amount: attempt.amount,
            payment_reference: reference.clone(),
        };
        self.verify(&attempt, reference).await
    }

    /// The two-call verification step: tell the backend about the capture,
    /// then re-fetch the authoritative order. Runs only after a successful
    /// capture, so every failure path here carries `captured: true`.
    async fn verify(
        &mut self,
        attempt: &Attempt,
        reference: PaymentReference,
    ) -> Result<(), CheckoutError> {
        if let Err(error) = self
            .backend
            .mark_processed(&attempt.order_id, &reference, &attempt.token)
            .await
        {
            return self.fail(
                classify(error),
                Some(attempt.order_id.clone()),
                Some(reference),
                true,
            );
        }

        let order = match self
            .backend
            .order_by_payment_reference(&reference, &attempt.token)
            .await
        {
            Ok(order) => order,
            Err(error) => {
                return self.fail(
                    classify(error),
                    Some(attempt.order_id.clone()),
                    Some(reference),
                    true,
                );
            }
        };

        if order.status == OrderStatus::Completed {
            let receipt = CheckoutReceipt {
                order_id: order.id,
                amount: attempt.amount,
                payment_reference: reference,
            };
            tracing::info!(order_id = %receipt.order_id, "checkout completed");
            self.state = CheckoutState::Completed(receipt);
            Ok(())
        } else {
            // Funds moved but the order did not finalize: surface the order
            // id and stop. Manual reconciliation only from here.
            self.fail(
                CheckoutError::Reconciliation {
                    order_id: order.id.clone(),
                    status: order.status,
                },
                Some(order.id),
                Some(reference),
                true,
            )
        }
    }

    fn fail(
        &mut self,
        error: CheckoutError,
        order_id: Option<OrderId>,
        payment_reference: Option<PaymentReference>,
        captured: bool,
    ) -> Result<(), CheckoutError> {
        tracing::warn!(%error, captured, "checkout attempt failed");
        self.state = CheckoutState::Failed(CheckoutFailure {
            error: error.clone(),
            order_id,
            payment_reference,
            captured,
        });
        Err(error)
    }
}

/// Map a backend API error onto a checkout error kind: invalid session to
/// `Auth`, backend-reported refusals to `Validation`, transport and server
/// faults to `Backend`.
fn classify(error: ApiError) -> CheckoutError {
    match error {
        ApiError::Unauthorized(message) => CheckoutError::Auth(message),
        ApiError::Backend { status, message } if status < 500 => {
            CheckoutError::Validation(message)
        }
        other => CheckoutError::Backend(other.to_string()),
    }
}
