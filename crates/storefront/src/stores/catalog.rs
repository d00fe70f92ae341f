//! Catalog store.
//!
//! Mirrors the backend's product list. Reads are public; mutations require
//! an admin session and are applied to the local list only after the backend
//! confirms them - stock counts are authoritative on the server, so there is
//! no optimistic update to diverge from them.

use saffron_core::{Amount, ProductId};

use crate::api::ApiError;
use crate::models::{Product, SessionToken};
use crate::stores::LoadState;
use crate::stores::session::SessionStore;

/// Errors that can occur on catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No active session.
    #[error("not signed in")]
    NotAuthenticated,

    /// The session lacks the admin role.
    #[error("admin role required")]
    Forbidden,

    /// The backend refused the operation. Carries its message.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable response.
    #[error("catalog request failed: {0}")]
    Transport(ApiError),
}

/// Input for creating or replacing a product.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Amount,
    /// Free-form description.
    pub description: String,
    /// Units in stock.
    pub stock: u32,
    /// Optional image to upload alongside the fields.
    pub image: Option<ImageUpload>,
}

/// An image file attached to a product draft.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// File name reported to the backend.
    pub file_name: String,
    /// MIME type (e.g., `image/jpeg`).
    pub content_type: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// Backend endpoints the catalog store drives.
pub trait CatalogApi {
    /// Fetch the full product list.
    async fn fetch_products(&self) -> Result<Vec<Product>, ApiError>;

    /// Create a product. Requires a bearer token.
    async fn create_product(
        &self,
        draft: &ProductDraft,
        token: &SessionToken,
    ) -> Result<Product, ApiError>;

    /// Replace a product's fields. Requires a bearer token.
    async fn update_product(
        &self,
        id: &ProductId,
        draft: &ProductDraft,
        token: &SessionToken,
    ) -> Result<Product, ApiError>;

    /// Delete a product. Requires a bearer token.
    async fn delete_product(&self, id: &ProductId, token: &SessionToken) -> Result<(), ApiError>;
}

/// The product-list store.
#[derive(Debug, Default)]
pub struct CatalogStore {
    products: Vec<Product>,
    state: LoadState,
}

impl CatalogStore {
    /// Create an empty, idle store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The locally held product list.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Lifecycle of the last request.
    #[must_use]
    pub const fn state(&self) -> &LoadState {
        &self.state
    }

    /// Find a product by id.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Refresh the list from the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`]; the store moves to `Errored` with the same
    /// message and keeps its previous list.
    pub async fn refresh(&mut self, api: &impl CatalogApi) -> Result<(), CatalogError> {
        self.state = LoadState::Loading;
        match api.fetch_products().await {
            Ok(products) => {
                tracing::debug!(count = products.len(), "catalog refreshed");
                self.products = products;
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(error) => Err(self.settle(classify(error))),
        }
    }

    /// Create a product. Admin only; the local list gains the product only
    /// after the backend confirms it.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on a missing or insufficient session, or on
    /// backend refusal.
    pub async fn create(
        &mut self,
        api: &impl CatalogApi,
        session: &SessionStore,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError> {
        let token = admin_token(session)?.clone();
        self.state = LoadState::Loading;
        match api.create_product(draft, &token).await {
            Ok(product) => {
                self.state = LoadState::Loaded;
                self.products.push(product.clone());
                Ok(product)
            }
            Err(error) => Err(self.settle(classify(error))),
        }
    }

    /// Replace a product's fields. Admin only; applied locally only after
    /// backend confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on a missing or insufficient session, or on
    /// backend refusal.
    pub async fn update(
        &mut self,
        api: &impl CatalogApi,
        session: &SessionStore,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError> {
        let token = admin_token(session)?.clone();
        self.state = LoadState::Loading;
        match api.update_product(id, draft, &token).await {
            Ok(product) => {
                self.state = LoadState::Loaded;
                if let Some(existing) = self.products.iter_mut().find(|p| &p.id == id) {
                    *existing = product.clone();
                } else {
                    self.products.push(product.clone());
                }
                Ok(product)
            }
            Err(error) => Err(self.settle(classify(error))),
        }
    }

    /// Delete a product. Admin only; removed locally only after backend
    /// confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on a missing or insufficient session, or on
    /// backend refusal.
    pub async fn delete(
        &mut self,
        api: &impl CatalogApi,
        session: &SessionStore,
        id: &ProductId,
    ) -> Result<(), CatalogError> {
        let token = admin_token(session)?.clone();
        self.state = LoadState::Loading;
        match api.delete_product(id, &token).await {
            Ok(()) => {
                self.state = LoadState::Loaded;
                self.products.retain(|p| &p.id != id);
                Ok(())
            }
            Err(error) => Err(self.settle(classify(error))),
        }
    }

    fn settle(&mut self, error: CatalogError) -> CatalogError {
        self.state = LoadState::Errored(error.to_string());
        error
    }
}

/// Admission check for mutations: a session must exist and carry the admin
/// role. The backend enforces the same rule authoritatively.
fn admin_token(session: &SessionStore) -> Result<&SessionToken, CatalogError> {
    let token = session.token().ok_or(CatalogError::NotAuthenticated)?;
    if !session.is_admin() {
        return Err(CatalogError::Forbidden);
    }
    Ok(token)
}

fn classify(error: ApiError) -> CatalogError {
    match error {
        ApiError::Unauthorized(message) => CatalogError::Rejected(message),
        ApiError::Backend { status, message } if status < 500 => CatalogError::Rejected(message),
        other => CatalogError::Transport(other),
    }
}
