//! Store lifecycle tests: catalog loading and mutation gating, and order
//! history filtering over a stubbed backend.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};

use saffron_core::{Amount, OrderId, OrderStatus, ProductId, Role};
use saffron_integration_tests::{StubCatalog, StubOrderHistory, product, signed_in_session};
use saffron_storefront::models::Order;
use saffron_storefront::stores::catalog::{CatalogError, ProductDraft};
use saffron_storefront::stores::orders::{SortDirection, SortKey, StatusFilter};
use saffron_storefront::stores::{CatalogStore, LoadState, OrderHistory, SessionStore};

fn draft(name: &str, price: i64) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        price: Amount::new(price),
        description: String::new(),
        stock: 5,
        image: None,
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_catalog_refresh_lifecycle() {
    let api = StubCatalog::with_products(vec![
        product("p-1", "Chai", 499, 3),
        product("p-2", "Cardamom", 250, 0),
    ]);

    let mut catalog = CatalogStore::new();
    assert_eq!(catalog.state(), &LoadState::Idle);

    catalog.refresh(&api).await.unwrap();
    assert_eq!(catalog.state(), &LoadState::Loaded);
    assert_eq!(catalog.products().len(), 2);
    assert!(catalog.find(&ProductId::new("p-2")).is_some());
}

#[tokio::test]
async fn test_catalog_refresh_failure_keeps_previous_list() {
    let api = StubCatalog::with_products(vec![product("p-1", "Chai", 499, 3)]);

    let mut catalog = CatalogStore::new();
    catalog.refresh(&api).await.unwrap();

    api.refuse(500, "database on fire");
    let err = catalog.refresh(&api).await.unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));

    // The stale-but-confirmed list survives; the state names the failure.
    assert_eq!(catalog.products().len(), 1);
    assert!(matches!(catalog.state(), LoadState::Errored(_)));
}

#[tokio::test]
async fn test_catalog_mutations_require_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionStore::open(dir.path()).await;
    let api = StubCatalog::new();

    let mut catalog = CatalogStore::new();
    let err = catalog
        .create(&api, &session, &draft("Chai", 499))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotAuthenticated));
    assert_eq!(api.mutation_calls(), 0);
}

#[tokio::test]
async fn test_catalog_mutations_require_admin_role() {
    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(dir.path(), Role::Customer).await;
    let api = StubCatalog::new();

    let mut catalog = CatalogStore::new();
    let err = catalog
        .create(&api, &session, &draft("Chai", 499))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden));
    // Gated client-side: the backend never saw the request.
    assert_eq!(api.mutation_calls(), 0);
}

#[tokio::test]
async fn test_catalog_create_applies_only_after_backend_ack() {
    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(dir.path(), Role::Admin).await;
    let api = StubCatalog::new();

    let mut catalog = CatalogStore::new();

    // Refused create leaves the local list untouched.
    api.refuse(400, "Name is required");
    let err = catalog
        .create(&api, &session, &draft("", 499))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Rejected(ref m) if m == "Name is required"));
    assert!(catalog.products().is_empty());

    // Confirmed create lands in the list.
    let api = StubCatalog::new();
    let created = catalog
        .create(&api, &session, &draft("Chai", 499))
        .await
        .unwrap();
    assert_eq!(catalog.products().len(), 1);
    assert_eq!(catalog.find(&created.id).unwrap().name, "Chai");
}

#[tokio::test]
async fn test_catalog_update_and_delete_follow_backend_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(dir.path(), Role::Admin).await;
    let api = StubCatalog::with_products(vec![product("p-1", "Chai", 499, 3)]);

    let mut catalog = CatalogStore::new();
    catalog.refresh(&api).await.unwrap();

    let id = ProductId::new("p-1");
    let updated = catalog
        .update(&api, &session, &id, &draft("Chai Deluxe", 599))
        .await
        .unwrap();
    assert_eq!(updated.price, Amount::new(599));
    assert_eq!(catalog.find(&id).unwrap().name, "Chai Deluxe");

    catalog.delete(&api, &session, &id).await.unwrap();
    assert!(catalog.find(&id).is_none());
    assert!(catalog.products().is_empty());
}

// =============================================================================
// Order history
// =============================================================================

fn order(id: &str, status: OrderStatus, total: i64, day: u32) -> Order {
    Order {
        id: OrderId::new(id),
        items: Vec::new(),
        total_amount: Amount::new(total),
        status,
        created_at: Utc.with_ymd_and_hms(2025, 10, day, 9, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_order_history_requires_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionStore::open(dir.path()).await;
    let api = StubOrderHistory::default();

    let mut history = OrderHistory::new();
    assert!(history.refresh(&api, &session).await.is_err());
    assert!(matches!(history.state(), LoadState::Errored(_)));
}

#[tokio::test]
async fn test_order_history_refresh_and_views() {
    let dir = tempfile::tempdir().unwrap();
    let session = signed_in_session(dir.path(), Role::Customer).await;
    let api = StubOrderHistory::with_orders(vec![
        order("o-1", OrderStatus::Completed, 499, 1),
        order("o-2", OrderStatus::Pending, 1200, 3),
        order("o-3", OrderStatus::Completed, 250, 2),
    ]);

    let mut history = OrderHistory::new();
    history.refresh(&api, &session).await.unwrap();
    assert_eq!(history.state(), &LoadState::Loaded);
    assert_eq!(history.orders().len(), 3);

    // Default view: newest first.
    let newest_first = history.view(
        StatusFilter::default(),
        SortKey::default(),
        SortDirection::default(),
    );
    let ids: Vec<_> = newest_first.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["o-2", "o-3", "o-1"]);

    // Filter to completed, cheapest first.
    let completed = history.view(
        StatusFilter::Only(OrderStatus::Completed),
        SortKey::Amount,
        SortDirection::Ascending,
    );
    let ids: Vec<_> = completed.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["o-3", "o-1"]);
}
