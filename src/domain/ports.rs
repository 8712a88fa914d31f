use crate::domain::catalog::{
    CatalogSnapshot, Category, FieldValue, NewProduct, Product, ProductField, ProductRow,
};
use crate::domain::order::{NewOrder, NewOrderItem, Order, OrderItem, PendingOrder};
use crate::domain::session::WizardSession;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared handles: the catalog and ledger are the single source of truth for
/// the payment pipeline, the wizard engine and the dispatch layer alike.
pub type CatalogStoreRef = Arc<dyn CatalogStore>;
pub type PendingOrderLedgerRef = Arc<dyn PendingOrderLedger>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type SessionStoreRef = Arc<dyn SessionStore>;

/// CRUD over categories and products. Implementations must not cache:
/// every read reflects the latest committed write.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Creates a category; fails with `ConstraintViolation` if the name is
    /// already taken.
    async fn create_category(&self, name: &str) -> Result<Category>;
    async fn category_by_name(&self, name: &str) -> Result<Option<Category>>;
    async fn categories(&self) -> Result<Vec<Category>>;
    /// Fails with `ConstraintViolation` while any product references the
    /// category, `NotFound` if it does not exist.
    async fn delete_category(&self, id: i64) -> Result<()>;

    /// Fails with `ConstraintViolation` if `category_id` dangles.
    async fn create_product(&self, new: NewProduct) -> Result<Product>;
    /// Applies a single-field update; the value must match the field's type.
    async fn update_product_field(
        &self,
        id: i64,
        field: ProductField,
        value: FieldValue,
    ) -> Result<()>;
    /// No-op if the product does not exist.
    async fn delete_product(&self, id: i64) -> Result<()>;
    async fn product(&self, id: i64) -> Result<Product>;
    /// Products joined with their category names for display.
    async fn list_products(&self) -> Result<Vec<ProductRow>>;
    /// Row-level atomic decrement, clamped so stock never goes negative.
    /// No-op for a product deleted since invoicing.
    async fn decrement_stock(&self, id: i64, qty: u32) -> Result<()>;
    /// The read API: all categories and products in one query.
    async fn snapshot(&self) -> Result<CatalogSnapshot>;
}

/// Single-use payment reservations between invoice issuance and confirmation.
#[async_trait]
pub trait PendingOrderLedger: Send + Sync {
    /// Fails with `DuplicatePayload` if the payload was ever reserved.
    async fn reserve(&self, pending: PendingOrder) -> Result<()>;
    /// Read-only lookup; `NotFound` if missing or already consumed.
    async fn peek(&self, payload: &str) -> Result<PendingOrder>;
    /// Atomically deletes the reservation and returns it. Fails with
    /// `AlreadyConsumed` on a repeat delivery and `NotFound` if the payload
    /// was never reserved. Two concurrent calls can never both succeed.
    async fn consume(&self, payload: &str) -> Result<PendingOrder>;
    /// Payloads of reservations created before `cutoff`.
    async fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;
}

/// Durable orders. Insertion allocates the per-day order number and writes
/// the order with its items in one atomic step.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
        at: DateTime<Utc>,
    ) -> Result<Order>;
    async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>>;
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>>;
    async fn all(&self) -> Result<Vec<Order>>;
}

/// At most one active wizard session per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<WizardSession>>;
    async fn put(&self, session: WizardSession) -> Result<()>;
    async fn remove(&self, user_id: i64) -> Result<()>;
}
