use async_trait::async_trait;
use domain::Order;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};

use crate::{OrderId, Result, StoreError, Version, store::OrderStore};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

/// Holds a transaction-scoped advisory lock on one order.
///
/// Locked reads and writes run inside the same transaction, so a lock holder
/// never needs a second pooled connection. `unlock` commits the transaction.
/// Dropping the guard rolls it back, discarding writes made through it.
pub struct PgOrderLock {
    tx: Transaction<'static, Postgres>,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn lock_key(order_id: OrderId) -> i64 {
        let (hi, lo) = order_id.as_uuid().as_u64_pair();
        (hi ^ lo) as i64
    }

    async fn fetch_order(conn: &mut PgConnection, order_id: OrderId) -> Result<Option<Order>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT version, document FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn update_order(conn: &mut PgConnection, order: &Order) -> Result<Version> {
        let expected = order.version();
        let document = serde_json::to_value(order)?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE orders
            SET state = $2, version = version + 1, document = $3, updated_at = $4
            WHERE id = $1 AND version = $5
            RETURNING version
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.state().as_str())
        .bind(document)
        .bind(order.updated_at)
        .bind(expected.as_i64())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(version) = updated {
            return Ok(Version::new(version));
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(order.id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                order_id: order.id,
                expected,
                actual: Version::new(actual),
            }),
            None => Err(StoreError::OrderNotFound(order.id)),
        }
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let document: serde_json::Value = row.try_get("document")?;
        let mut order: Order = serde_json::from_value(document)?;
        order.set_version(Version::new(row.try_get("version")?));
        Ok(order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    type Guard = PgOrderLock;

    async fn lock(&self, order_id: OrderId) -> Result<Self::Guard> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(Self::lock_key(order_id))
            .execute(&mut *tx)
            .await?;

        tracing::trace!(%order_id, "Acquired order lock");
        Ok(PgOrderLock { tx })
    }

    async fn load_locked(
        &self,
        guard: &mut Self::Guard,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        Self::fetch_order(&mut guard.tx, order_id).await
    }

    async fn save_locked(&self, guard: &mut Self::Guard, order: &Order) -> Result<Version> {
        Self::update_order(&mut guard.tx, order).await
    }

    async fn unlock(&self, guard: Self::Guard) -> Result<()> {
        guard.tx.commit().await?;
        Ok(())
    }

    async fn insert(&self, order: &Order) -> Result<Version> {
        let version = Version::initial().next();
        let document = serde_json::to_value(order)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, state, version, document, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.state().as_str())
        .bind(version.as_i64())
        .bind(document)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::AlreadyExists(order.id);
            }
            StoreError::Database(e)
        })?;

        Ok(version)
    }

    async fn load(&self, order_id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_order(&mut conn, order_id).await
    }

    async fn save(&self, order: &Order) -> Result<Version> {
        let mut conn = self.pool.acquire().await?;
        Self::update_order(&mut conn, order).await
    }
}
