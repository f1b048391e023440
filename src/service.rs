use crate::{
    models::{NewOrder, Order, OrderUpdate},
    repository::{OrderStoreState, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// OrderError
///
/// The domain error vocabulary returned to handlers. Storage detail is logged
/// at the service boundary and never carried in these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("no orders found")]
    NotFound,
    #[error("could not get order by ID")]
    GetFailed,
    #[error("could not list orders")]
    ListFailed,
    #[error("could not create order")]
    CreateFailed,
    #[error("could not update order")]
    UpdateFailed,
    #[error("could not delete order")]
    DeleteFailed,
    #[error("order store unavailable")]
    Unavailable,
}

/// OrderService Trait
///
/// The capability set the HTTP layer depends on.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn get_order(&self, id: i32) -> Result<Order, OrderError>;
    async fn list_orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, OrderError>;
    async fn create_order(&self, order: NewOrder) -> Result<Order, OrderError>;
    async fn update_order(&self, id: i32, update: OrderUpdate) -> Result<Order, OrderError>;
    async fn delete_order(&self, id: i32) -> Result<(), OrderError>;
    async fn health(&self) -> Result<(), OrderError>;
}

/// OrderServiceState
///
/// Shared handle to the service held by `AppState`.
pub type OrderServiceState = Arc<dyn OrderService>;

/// OrderManager
///
/// Stateless `OrderService` over an `OrderStore`. Holds nothing but the
/// store handle, so it is shared across requests without locking.
pub struct OrderManager {
    store: OrderStoreState,
}

impl OrderManager {
    pub fn new(store: OrderStoreState) -> Self {
        Self { store }
    }
}

/// Passes `NotFound` through and collapses anything else into `failed`,
/// logging the cause. This is the only place raw store errors are recorded.
fn translate(operation: &'static str, failed: OrderError, err: StoreError) -> OrderError {
    match err {
        StoreError::NotFound => OrderError::NotFound,
        err => {
            tracing::error!(operation, error = %err, "order store failure");
            failed
        }
    }
}

#[async_trait]
impl OrderService for OrderManager {
    async fn get_order(&self, id: i32) -> Result<Order, OrderError> {
        self.store
            .get(id)
            .await
            .map_err(|e| translate("get order", OrderError::GetFailed, e))
    }

    async fn list_orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, OrderError> {
        // A listing has no single target, so even NotFound is a failure here.
        self.store.list(limit, offset).await.map_err(|e| {
            tracing::error!(operation = "list orders", error = %e, "order store failure");
            OrderError::ListFailed
        })
    }

    async fn create_order(&self, order: NewOrder) -> Result<Order, OrderError> {
        self.store.create(order).await.map_err(|e| {
            tracing::error!(operation = "create order", error = %e, "order store failure");
            OrderError::CreateFailed
        })
    }

    async fn update_order(&self, id: i32, update: OrderUpdate) -> Result<Order, OrderError> {
        self.store
            .update(id, update)
            .await
            .map_err(|e| translate("update order", OrderError::UpdateFailed, e))
    }

    async fn delete_order(&self, id: i32) -> Result<(), OrderError> {
        self.store
            .delete(id)
            .await
            .map_err(|e| translate("delete order", OrderError::DeleteFailed, e))
    }

    async fn health(&self) -> Result<(), OrderError> {
        self.store.ping().await.map_err(|e| {
            tracing::warn!(error = %e, "order store ping failed");
            OrderError::Unavailable
        })
    }
}
