use crate::domain::catalog::{
    CatalogSnapshot, Category, FieldValue, NewProduct, Product, ProductField, ProductRow,
    ProductView,
};
use crate::domain::order::{self, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, PendingOrder};
use crate::domain::ports::{CatalogStore, OrderStore, PendingOrderLedger};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for categories, keyed by id.
pub const CF_CATEGORIES: &str = "categories";
/// Column Family for products, keyed by id.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for live payment reservations, keyed by payload.
pub const CF_PENDING_ORDERS: &str = "pending_orders";
/// Column Family of consumed-payload tombstones.
pub const CF_CONSUMED: &str = "consumed_payloads";
/// Column Family for orders, keyed by id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for order items, keyed by order id.
pub const CF_ORDER_ITEMS: &str = "order_items";
/// Column Family for id and per-day order-number counters.
pub const CF_COUNTERS: &str = "counters";

/// A persistent store implementation using RocksDB.
///
/// Backs the catalog, the pending-order ledger and the order store with
/// separate Column Families. Wizard sessions stay in memory: they are
/// conversation state, not shop state.
///
/// All mutations are serialized through an internal write mutex, which is
/// what makes `consume` an atomic delete-and-return and keeps stock
/// decrements free of lost updates. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [
            CF_CATEGORIES,
            CF_PRODUCTS,
            CF_PENDING_ORDERS,
            CF_CONSUMED,
            CF_ORDERS,
            CF_ORDER_ITEMS,
            CF_COUNTERS,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ShopError::Storage(format!("{name} column family not found")))
    }

    fn get<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        self.db.put_cf(cf, key, encode(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    /// Bumps and returns the counter stored under `key`. Callers must hold
    /// the write lock.
    fn next_counter(&self, key: &[u8], batch: &mut WriteBatch) -> Result<i64> {
        let cf = self.cf(CF_COUNTERS)?;
        let current = match self.db.get_cf(cf, key)? {
            Some(bytes) => decode::<i64>(&bytes)?,
            None => 0,
        };
        let next = current + 1;
        batch.put_cf(cf, key, encode(&next)?);
        Ok(next)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ShopError::Storage(format!("serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ShopError::Storage(format!("deserialization error: {e}")))
}

#[async_trait]
impl CatalogStore for RocksDBStore {
    async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShopError::ValidationFailed(
                "category name must not be empty".to_string(),
            ));
        }
        let _guard = self.write_lock.lock().await;
        let existing: Vec<Category> = self.scan(CF_CATEGORIES)?;
        if existing.iter().any(|c| c.name == name) {
            return Err(ShopError::ConstraintViolation(format!(
                "category {name:?} already exists"
            )));
        }
        let mut batch = WriteBatch::default();
        let id = self.next_counter(b"category_id", &mut batch)?;
        let category = Category {
            id,
            name: name.to_string(),
        };
        batch.put_cf(self.cf(CF_CATEGORIES)?, id.to_be_bytes(), encode(&category)?);
        self.db.write(batch)?;
        Ok(category)
    }

    async fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let categories: Vec<Category> = self.scan(CF_CATEGORIES)?;
        Ok(categories.into_iter().find(|c| c.name == name.trim()))
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let mut categories: Vec<Category> = self.scan(CF_CATEGORIES)?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.get::<Category>(CF_CATEGORIES, &id.to_be_bytes())?.is_none() {
            return Err(ShopError::NotFound(format!("category {id}")));
        }
        let products: Vec<Product> = self.scan(CF_PRODUCTS)?;
        let referencing = products.iter().filter(|p| p.category_id == id).count();
        if referencing > 0 {
            return Err(ShopError::ConstraintViolation(format!(
                "category {id} is referenced by {referencing} product(s)"
            )));
        }
        self.db.delete_cf(self.cf(CF_CATEGORIES)?, id.to_be_bytes())?;
        Ok(())
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let _guard = self.write_lock.lock().await;
        if self
            .get::<Category>(CF_CATEGORIES, &new.category_id.to_be_bytes())?
            .is_none()
        {
            return Err(ShopError::ConstraintViolation(format!(
                "category {} does not exist",
                new.category_id
            )));
        }
        let mut batch = WriteBatch::default();
        let id = self.next_counter(b"product_id", &mut batch)?;
        let product = Product {
            id,
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
        batch.put_cf(self.cf(CF_PRODUCTS)?, id.to_be_bytes(), encode(&product)?);
        self.db.write(batch)?;
        Ok(product)
    }

    async fn update_product_field(
        &self,
        id: i64,
        field: ProductField,
        value: FieldValue,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut product: Product = self
            .get(CF_PRODUCTS, &id.to_be_bytes())?
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
        self.put(CF_PRODUCTS, &id.to_be_bytes(), &product)
    }

    async fn delete_product(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.db.delete_cf(self.cf(CF_PRODUCTS)?, id.to_be_bytes())?;
        Ok(())
    }

    async fn product(&self, id: i64) -> Result<Product> {
        self.get(CF_PRODUCTS, &id.to_be_bytes())?
            .ok_or_else(|| ShopError::NotFound(format!("product {id}")))
    }

    async fn list_products(&self) -> Result<Vec<ProductRow>> {
        let categories: Vec<Category> = self.scan(CF_CATEGORIES)?;
        let mut products: Vec<Product> = self.scan(CF_PRODUCTS)?;
        products.sort_by_key(|p| p.id);
        Ok(products
            .into_iter()
            .map(|product| {
                let category = categories
                    .iter()
                    .find(|c| c.id == product.category_id)
                    .map(|c| c.name.clone());
                ProductRow { product, category }
            })
            .collect())
    }

    async fn decrement_stock(&self, id: i64, qty: u32) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if let Some(mut product) = self.get::<Product>(CF_PRODUCTS, &id.to_be_bytes())? {
            product.stock = product.stock.saturating_sub(qty);
            self.put(CF_PRODUCTS, &id.to_be_bytes(), &product)?;
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<CatalogSnapshot> {
        let mut categories: Vec<Category> = self.scan(CF_CATEGORIES)?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        let mut products: Vec<Product> = self.scan(CF_PRODUCTS)?;
        products.sort_by_key(|p| p.id);
        Ok(CatalogSnapshot {
            categories,
            products: products.iter().map(ProductView::from).collect(),
        })
    }
}

#[async_trait]
impl PendingOrderLedger for RocksDBStore {
    async fn reserve(&self, pending: PendingOrder) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let payload = pending.payload.as_bytes();
        let seen = self.db.get_pinned_cf(self.cf(CF_PENDING_ORDERS)?, payload)?.is_some()
            || self.db.get_pinned_cf(self.cf(CF_CONSUMED)?, payload)?.is_some();
        if seen {
            return Err(ShopError::DuplicatePayload(pending.payload));
        }
        self.put(CF_PENDING_ORDERS, payload, &pending)
    }

    async fn peek(&self, payload: &str) -> Result<PendingOrder> {
        self.get(CF_PENDING_ORDERS, payload.as_bytes())?
            .ok_or_else(|| ShopError::NotFound(format!("pending order {payload}")))
    }

    async fn consume(&self, payload: &str) -> Result<PendingOrder> {
        let _guard = self.write_lock.lock().await;
        match self.get::<PendingOrder>(CF_PENDING_ORDERS, payload.as_bytes())? {
            Some(pending) => {
                let mut batch = WriteBatch::default();
                batch.delete_cf(self.cf(CF_PENDING_ORDERS)?, payload.as_bytes());
                batch.put_cf(self.cf(CF_CONSUMED)?, payload.as_bytes(), b"");
                self.db.write(batch)?;
                Ok(pending)
            }
            None => {
                let tombstoned = self
                    .db
                    .get_pinned_cf(self.cf(CF_CONSUMED)?, payload.as_bytes())?
                    .is_some();
                if tombstoned {
                    Err(ShopError::AlreadyConsumed(payload.to_string()))
                } else {
                    Err(ShopError::NotFound(format!("pending order {payload}")))
                }
            }
        }
    }

    async fn expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let pending: Vec<PendingOrder> = self.scan(CF_PENDING_ORDERS)?;
        Ok(pending
            .into_iter()
            .filter(|p| p.created_at < cutoff)
            .map(|p| p.payload)
            .collect())
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn insert(
        &self,
        new: NewOrder,
        items: Vec<NewOrderItem>,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();

        let date = at.date_naive();
        let day_key = format!("order_seq:{}", date.format("%Y%m%d"));
        let seq = self.next_counter(day_key.as_bytes(), &mut batch)?;
        let id = self.next_counter(b"order_id", &mut batch)?;

        let order = Order {
            id,
            order_number: order::order_number(date, seq as u32),
            user_id: new.user_id,
            payload: new.payload,
            total_amount: new.total_amount,
            status: OrderStatus::Paid,
            payment_info: new.payment_info,
            created_at: at,
        };

        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let item_id = self.next_counter(b"order_item_id", &mut batch)?;
            rows.push(OrderItem {
                id: item_id,
                order_id: id,
                product_id: item.product_id,
                name: item.name,
                size: item.size,
                color: item.color,
                unit_price: item.unit_price,
                qty: item.qty,
            });
        }

        batch.put_cf(self.cf(CF_ORDERS)?, id.to_be_bytes(), encode(&order)?);
        batch.put_cf(self.cf(CF_ORDER_ITEMS)?, id.to_be_bytes(), encode(&rows)?);
        self.db.write(batch)?;
        Ok(order)
    }

    async fn items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        Ok(self
            .get(CF_ORDER_ITEMS, &order_id.to_be_bytes())?
            .unwrap_or_default())
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.scan(CF_ORDERS)?;
        orders.retain(|o| o.user_id == user_id);
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self.scan(CF_ORDERS)?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }
}
