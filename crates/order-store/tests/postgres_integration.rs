//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency and truncate
//! the orders table between tests, so they run serially.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;
use std::time::Duration;

use domain::{FulfillmentType, LineItem, Order, OrderAction, OrderState, StateExpirations};
use order_store::{
    OrderId, OrderStore, OrderStoreExt, PostgresOrderStore, StoreError, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_orders_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresOrderStore {
    get_test_store_with_pool_size(5).await
}

async fn get_test_store_with_pool_size(max_connections: u32) -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn create_test_order() -> Order {
    let mut order = Order::new("user-1", "user", "partner-1", "gallery", "USD");
    order.credit_card_id = Some("cc-1".to_string());
    order.fulfillment_type = Some(FulfillmentType::Pickup);
    order.line_items.push(LineItem::new("artwork-1", "v1", 1, 1000));
    order
}

#[tokio::test]
#[serial]
async fn insert_and_load_order() {
    let store = get_test_store().await;
    let order = create_test_order();

    let version = store.insert(&order).await.unwrap();
    assert_eq!(version, Version::new(1));

    let loaded = store.load_existing(order.id).await.unwrap();
    assert_eq!(loaded.id, order.id);
    assert_eq!(loaded.version(), Version::new(1));
    assert_eq!(loaded.line_items, order.line_items);
    assert_eq!(loaded.state(), OrderState::Pending);
}

#[tokio::test]
#[serial]
async fn insert_duplicate_fails() {
    let store = get_test_store().await;
    let order = create_test_order();
    store.insert(&order).await.unwrap();

    let result = store.insert(&order).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists(id)) if id == order.id));
}

#[tokio::test]
#[serial]
async fn load_missing_order() {
    let store = get_test_store().await;
    assert!(store.load(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn save_persists_state_and_bumps_version() {
    let store = get_test_store().await;
    let mut order = create_test_order();
    store.insert_in_place(&mut order).await.unwrap();

    order
        .transition(
            OrderAction::Submit,
            None,
            chrono::Utc::now(),
            &StateExpirations::default(),
        )
        .unwrap();
    store.save_in_place(&mut order).await.unwrap();
    assert_eq!(order.version(), Version::new(2));

    let loaded = store.load_existing(order.id).await.unwrap();
    assert_eq!(loaded.state(), OrderState::Submitted);
    assert_eq!(loaded.version(), Version::new(2));
    assert!(loaded.state_expires_at().is_some());

    let state: String = sqlx::query_scalar("SELECT state FROM orders WHERE id = $1")
        .bind(order.id.as_uuid())
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(state, "submitted");
}

#[tokio::test]
#[serial]
async fn stale_save_is_a_concurrency_conflict() {
    let store = get_test_store().await;
    let mut order = create_test_order();
    store.insert_in_place(&mut order).await.unwrap();

    let stale = order.clone();
    store.save_in_place(&mut order).await.unwrap();

    let result = store.save(&stale).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { expected, actual, .. })
            if expected == Version::new(1) && actual == Version::new(2)
    ));
}

#[tokio::test]
#[serial]
async fn save_missing_order_fails() {
    let store = get_test_store().await;
    let result = store.save(&create_test_order()).await;
    assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
#[serial]
async fn advisory_lock_serializes_holders() {
    let store = get_test_store().await;
    let order_id = OrderId::new();

    let guard = store.lock(order_id).await.unwrap();

    let contender = {
        let store = store.clone();
        tokio::spawn(async move { store.lock(order_id).await.map(|_| ()) })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!contender.is_finished());

    drop(guard);
    tokio::time::timeout(Duration::from_secs(5), contender)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
#[serial]
async fn advisory_locks_are_per_order() {
    let store = get_test_store().await;

    let _first = store.lock(OrderId::new()).await.unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), store.lock(OrderId::new())).await;
    assert!(second.unwrap().is_ok());
}

#[tokio::test]
#[serial]
async fn lock_holder_reads_and_writes_on_a_single_connection() {
    let store = get_test_store_with_pool_size(1).await;
    let mut order = create_test_order();
    store.insert_in_place(&mut order).await.unwrap();

    let mut guard = store.lock(order.id).await.unwrap();
    let mut locked = store
        .load_existing_locked(&mut guard, order.id)
        .await
        .unwrap();
    locked
        .transition(
            OrderAction::Submit,
            None,
            chrono::Utc::now(),
            &StateExpirations::default(),
        )
        .unwrap();
    store
        .save_locked_in_place(&mut guard, &mut locked)
        .await
        .unwrap();
    store.unlock(guard).await.unwrap();

    let loaded = store.load_existing(order.id).await.unwrap();
    assert_eq!(loaded.state(), OrderState::Submitted);
    assert_eq!(loaded.version(), Version::new(2));
}

#[tokio::test]
#[serial]
async fn dropping_the_guard_discards_locked_writes() {
    let store = get_test_store().await;
    let mut order = create_test_order();
    store.insert_in_place(&mut order).await.unwrap();

    let mut guard = store.lock(order.id).await.unwrap();
    let mut locked = store
        .load_existing_locked(&mut guard, order.id)
        .await
        .unwrap();
    locked.currency_code = "EUR".to_string();
    store
        .save_locked_in_place(&mut guard, &mut locked)
        .await
        .unwrap();
    drop(guard);

    let loaded = store.load_existing(order.id).await.unwrap();
    assert_eq!(loaded.currency_code, "USD");
    assert_eq!(loaded.version(), Version::new(1));
}
