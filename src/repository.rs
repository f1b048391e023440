use crate::models::{NewOrder, Order, OrderUpdate, timestamp_now};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use thiserror::Error;
use tokio::sync::RwLock;

/// StoreError
///
/// Failures surfaced by an `OrderStore`. `NotFound` is the only variant the
/// upper layers branch on; everything else is opaque storage detail.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no orders found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// OrderStore Trait
///
/// The capability set any persistence backend must provide. The service layer
/// depends only on this trait, never on a concrete backend.
///
/// Every call is a single independent operation. Dropping the returned future
/// (client disconnect, request timeout) aborts the in-flight work.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: i32) -> Result<Order, StoreError>;
    // Ordered by id ascending.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError>;
    // Assigns the id; stamps `created_at` when the caller left it empty.
    async fn create(&self, order: NewOrder) -> Result<Order, StoreError>;
    async fn update(&self, id: i32, update: OrderUpdate) -> Result<Order, StoreError>;
    async fn delete(&self, id: i32) -> Result<(), StoreError>;

    /// Connection health check used by `/health`.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// OrderStoreState
///
/// The concrete type used to share the persistence layer across the application.
pub type OrderStoreState = Arc<dyn OrderStore>;

/// PostgresOrderStore
///
/// `OrderStore` backed by the `orders` table. Pooling is handled by `PgPool`.
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn get(&self, id: i32) -> Result<Order, StoreError> {
        sqlx::query_as::<_, Order>(
            "SELECT id, description, state, create_at FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT id, description, state, create_at FROM orders ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        let created_at = order.created_at.unwrap_or_else(timestamp_now);
        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (description, state, create_at)
            VALUES ($1, $2, $3)
            RETURNING id, description, state, create_at
            "#,
        )
        .bind(order.description)
        .bind(order.state)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update(&self, id: i32, update: OrderUpdate) -> Result<Order, StoreError> {
        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET description = $2,
                state = $3
            WHERE id = $1
            RETURNING id, description, state, create_at
            "#,
        )
        .bind(id)
        .bind(update.description)
        .bind(update.state)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// --- In-Memory Implementation (Tests, STORE_BACKEND=memory) ---

#[derive(Default)]
struct InMemoryState {
    last_id: i32,
    orders: BTreeMap<i32, Order>,
}

/// InMemoryOrderStore
///
/// A process-local `OrderStore`. Used by the test suites and for running the
/// service without a database. `new_failing` builds a store whose every call
/// fails with an opaque backend error, to exercise the 500 paths.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: RwLock<InMemoryState>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of store operations invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(StoreError::Backend("simulated store failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn get(&self, id: i32) -> Result<Order, StoreError> {
        self.begin()?;
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        self.begin()?;
        let limit = usize::try_from(limit).unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(0);
        let state = self.state.read().await;
        Ok(state
            .orders
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.begin()?;
        let mut state = self.state.write().await;
        state.last_id += 1;
        let created = Order {
            id: state.last_id,
            description: order.description,
            state: order.state,
            created_at: order.created_at.unwrap_or_else(timestamp_now),
        };
        state.orders.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, update: OrderUpdate) -> Result<Order, StoreError> {
        self.begin()?;
        let mut state = self.state.write().await;
        let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound)?;
        order.description = update.description;
        order.state = update.state;
        Ok(order.clone())
    }

    async fn delete(&self, id: i32) -> Result<(), StoreError> {
        self.begin()?;
        self.state
            .write()
            .await
            .orders
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.begin()
    }
}
