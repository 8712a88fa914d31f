use crate::domain::catalog::{
    CatalogSnapshot, Category, FieldValue, NewProduct, Product, ProductField, ProductRow,
    ProductView,
};
use crate::domain::order::{self, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PendingOrder};
use crate::domain::ports::{CatalogStore, OrderStore, PendingOrderLedger, SessionStore};
use crate::domain::session::WizardSession;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory catalog.
///
/// All mutations happen under a single write lock, so field updates and stock
/// decrements are atomic with respect to each other (no lost updates between
/// concurrent admin edits and checkouts).
#[derive(Default, Clone)]
pub struct InMemoryCatalogStore {
    inner: Arc<RwLock<CatalogInner>>,
}

#[derive(Default)]
struct CatalogInner {
    categories: HashMap<i64, Category>,
    products: HashMap<i64, Product>,
    next_category_id: i64,
    next_product_id: i64,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShopError::ValidationFailed(
                "category name must not be empty".to_string(),
            ));
        }
        let mut inner = self.inner.write().await;
        if inner.categories.values().any(|c| c.name == name) {
            return Err(ShopError::ConstraintViolation(format!(
                "category {name:?} already exists"
            )));
        }
        inner.next_category_id += 1;
        let category = Category {
            id: inner.next_category_id,
            name: name.to_string(),
        };
        inner.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let inner = self.inner.read().await;
        Ok(inner
            .categories
            .values()
            .find(|c| c.name == name.trim())
            .cloned())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<Category> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.categories.contains_key(&id) {
            return Err(ShopError::NotFound(format!("category {id}")));
        }
        let referencing = inner
            .products
            .values()
            .filter(|p| p.category_id == id)
            .count();
        if referencing > 0 {
            return Err(ShopError::ConstraintViolation(format!(
                "category {id} is referenced by {referencing} product(s)"
            )));
        }
        inner.categories.remove(&id);
        Ok(())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let mut inner = self.inner.write().await;
        if !inner.categories.contains_key(&new.category_id) {
            return Err(ShopError::ConstraintViolation(format!(
                "category {} does not exist",
                new.category_id
            )));
        }
        inner.next_product_id += 1;
        let product = Product {
            id: inner.next_product_id,
            name: new.name,
            category_id: new.category_id,
            price: new.price,
            description: new.description,
            sizes: new.sizes,
            colors: new.colors,
            photo: new.photo,
            stock: new.stock,
            created_at: Utc::now(),
        };
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product_field(
        &self,
        id: i64,
        field: ProductField,
        value: FieldValue,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&id)
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))?;
        match (field, value) {
            (ProductField::Name, FieldValue::Text(v)) => product.name = v,
            (ProductField::Description, FieldValue::Text(v)) => product.description = v,
            (ProductField::Photo, FieldValue::Text(v)) => product.photo = v,
            (ProductField::Price, FieldValue::Money(v)) => product.price = v,
            (ProductField::Stock, FieldValue::Count(v)) => product.stock = v,
            (ProductField::Sizes, FieldValue::List(v)) => product.sizes = v,
            (ProductField::Colors, FieldValue::List(v)) => product.colors = v,
            (field, value) => {
                return Err(ShopError::InvalidField(format!(
                    "{field} cannot take {value:?}"
                )));
            }
        }
        Ok(())
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.products.remove(&id);
        Ok(())
    }

    async fn product(&self, id: i64) -> Result<Product> {
        let inner = self.inner.read().await;
        inner
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    async fn list_products(&self) -> Result<Vec<ProductRow>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<ProductRow> = inner
            .products
            .values()
            .map(|p| ProductRow {
                product: p.clone(),
                category: inner.categories.get(&p.category_id).map(|c| c.name.clone()),
            })
            .collect();
        rows.sort_by_key(|r| r.product.id);
        Ok(rows)
    }

    async fn decrement_stock(&self, id: i64, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(product) = inner.products.get_mut(&id) {
            product.stock = product.stock.saturating_sub(qty);
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let inner = self.inner.read().await;
        let mut categories: Vec<Category> = inner.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        let mut products: Vec<ProductView> =
            inner.products.values().map(ProductView::from).collect();
        products.sort_by_key(|p| p.id);
        Ok(CatalogSnapshot {
            categories,
            products,
        })
    }
}

/// A thread-safe in-memory pending-order ledger.
///
/// Consumed payloads leave a tombstone behind, so a repeat confirmation maps
/// to `AlreadyConsumed` while a payload that was never reserved maps to
/// `NotFound`.
#[derive(Default, Clone)]
pub struct InMemoryPendingOrderLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

#[derive(Default)]
struct LedgerInner {
    pending: HashMap<String, PendingOrder>,
    consumed: HashSet<String>,
}

impl InMemoryPendingOrderLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingOrderLedger for InMemoryPendingOrderLedger {
    async fn reserve(&self, pending: PendingOrder) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.pending.contains_key(&pending.payload) || inner.consumed.contains(&pending.payload)
        {
            return Err(ShopError::DuplicatePayload(pending.payload));
        }
        inner.pending.insert(pending.payload.clone(), pending);
        Ok(())
    }

    async fn peek(&self, payload: &str) -> Result<PendingOrder> {
        let inner = self.inner.read().await;
        inner
            .pending
            .get(payload)
            .cloned()
            .ok_or_else(|| ShopError::NotFound(format!("pending order {payload}")))
    }

    async fn consume(&self, payload: &str) -> Result<PendingOrder> {
        let mut inner = self.inner.write().await;
        match inner.pending.remove(payload) {
            Some(pending) => {
                inner.consumed.insert(payload.to_string());
                Ok(pending)
            }
            None if inner.consumed.contains(payload) => {
                Err(ShopError::AlreadyConsumed(payload.to_string()))
            }
            None => Err(ShopError::NotFound(format!("pending order {payload}"))),
        }
    }

    async fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner
            .pending
            .values()
            .filter(|p| p.created_at < cutoff)
            .map(|p| p.payload.clone())
            .collect())
    }
}

/// A thread-safe in-memory order store. Order-number allocation and the
/// order/items insert happen under one write lock.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    inner: Arc<RwLock<OrderInner>>,
}

#[derive(Default)]
struct OrderInner {
    orders: HashMap<i64, Order>,
    items: HashMap<i64, Vec<OrderItem>>,
    day_seq: HashMap<NaiveDate, u32>,
    next_order_id: i64,
    next_item_id: i64,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let mut inner = self.inner.write().await;
        let seq = inner.day_seq.entry(at.date_naive()).or_insert(0);
        *seq += 1;
        let number = order::order_number(at.date_naive(), *seq);

        inner.next_order_id += 1;
        let order = Order {
            id: inner.next_order_id,
            order_number: number,
            user_id: new.user_id,
            payload: new.payload,
            total_amount: new.total_amount,
            status: OrderStatus::Paid,
            payment_info: new.payment_info,
            created_at: at,
        };

        let rows: Vec<OrderItem> = items
            .into_iter()
            .map(|item| {
                inner.next_item_id += 1;
                OrderItem {
                    id: inner.next_item_id,
                    order_id: order.id,
                    product_id: item.product_id,
                    name: item.name,
                    size: item.size,
                    color: item.color,
                    unit_price: item.unit_price,
                    qty: item.qty,
                }
            })
            .collect();

        inner.items.insert(order.id, rows);
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let inner = self.inner.read().await;
        Ok(inner.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}

/// A thread-safe in-memory session store: one wizard session per user.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<i64, WizardSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<WizardSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&user_id).cloned())
    }

    async fn put(&self, session: WizardSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id, session);
        Ok(())
    }

    async fn remove(&self, user_id: i64) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&user_id);
        Ok(())
    }
}
