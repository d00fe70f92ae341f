//! Client-side state stores.
//!
//! Each store is an explicit value with a defined lifecycle - constructed at
//! application start, reset on logout - and is driven by whoever owns it.
//! Stores never reach for ambient globals: the API client and the session
//! are passed in by reference.

pub mod catalog;
pub mod orders;
pub mod session;

pub use catalog::CatalogStore;
pub use orders::OrderHistory;
pub use session::SessionStore;

/// Lifecycle of a store's last backend request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No request has been made yet.
    #[default]
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request succeeded.
    Loaded,
    /// The last request failed; carries the human-readable reason.
    Errored(String),
}

impl LoadState {
    /// Whether the store currently holds confirmed backend data.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}
