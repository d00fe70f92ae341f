//! Order history store.
//!
//! Fetches the signed-in customer's orders and offers presentation-side
//! filtering and sorting over the fetched list. Filtering and sorting are
//! pure functions so a view can re-apply them without refetching.

use saffron_core::OrderStatus;

use crate::api::ApiError;
use crate::models::{Order, SessionToken};
use crate::stores::LoadState;
use crate::stores::session::SessionStore;

/// Errors that can occur when loading order history.
#[derive(Debug, thiserror::Error)]
pub enum OrderHistoryError {
    /// No active session.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend refused the request. Carries its message.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable response.
    #[error("order history request failed: {0}")]
    Transport(ApiError),
}

/// Backend endpoint the order history store drives.
pub trait OrderHistoryApi {
    /// Fetch every order belonging to the token's account.
    async fn my_orders(&self, token: &SessionToken) -> Result<Vec<Order>, ApiError>;
}

/// Status filter for the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Show every order.
    #[default]
    All,
    /// Show only orders in one status.
    Only(OrderStatus),
}

/// Sort key for the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Sort by creation date.
    #[default]
    Date,
    /// Sort by order total.
    Amount,
}

/// Sort direction for the order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    /// Newest / largest first.
    #[default]
    Descending,
}

/// The signed-in customer's order list.
#[derive(Debug, Default)]
pub struct OrderHistory {
    orders: Vec<Order>,
    state: LoadState,
}

impl OrderHistory {
    /// Create an empty, idle store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The fetched orders, in backend order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Lifecycle of the last request.
    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    /// Refresh the list from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`OrderHistoryError`]; the store moves to `Errored` and keeps
    /// its previous list.
    pub async fn refresh(
        &mut self,
        api: &impl OrderHistoryApi,
        session: &SessionStore,
    ) -> Result<(), OrderHistoryError> {
        let Some(token) = session.token() else {
            let error = OrderHistoryError::NotAuthenticated;
            self.state = LoadState::Errored(error.to_string());
            return Err(error);
        };
        let token = token.clone();

        self.state = LoadState::Loading;
        match api.my_orders(&token).await {
            Ok(orders) => {
                tracing::debug!(count = orders.len(), "order history refreshed");
                self.orders = orders;
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(error) => {
                let error = classify(error);
                self.state = LoadState::Errored(error.to_string());
                Err(error)
            }
        }
    }

    /// A filtered, sorted view of the fetched orders.
    #[must_use]
    pub fn view(&self, filter: StatusFilter, key: SortKey, direction: SortDirection) -> Vec<Order> {
        filter_and_sort(&self.orders, filter, key, direction)
    }
}

/// Filter by status, then sort by the given key and direction.
#[must_use]
pub fn filter_and_sort(
    orders: &[Order],
    filter: StatusFilter,
    key: SortKey,
    direction: SortDirection,
) -> Vec<Order> {
    let mut result: Vec<Order> = orders
        .iter()
        .filter(|order| match filter {
            StatusFilter::All => true,
            StatusFilter::Only(status) => order.status == status,
        })
        .cloned()
        .collect();

    // sort_by is stable: orders equal under the key keep backend order
    result.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Date => a.created_at.cmp(&b.created_at),
            SortKey::Amount => a.total_amount.cmp(&b.total_amount),
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });

    result
}
