use gorosso::application::engine::ShopEngine;
use gorosso::config::AppConfig;
use gorosso::domain::catalog::{NewProduct, Product};
use gorosso::domain::money::Amount;
use gorosso::domain::order::{Cart, CartItem, CartLine};
use gorosso::domain::ports::{
    CatalogStore, CatalogStoreRef, OrderStoreRef, PendingOrderLedgerRef,
};
use gorosso::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryOrderStore, InMemoryPendingOrderLedger, InMemorySessionStore,
};
use std::sync::Arc;

/// An engine wired to in-memory stores, with direct handles on the stores so
/// tests can seed and inspect state behind the engine's back.
pub struct TestShop {
    pub engine: ShopEngine,
    pub catalog: Arc<InMemoryCatalogStore>,
    pub ledger: Arc<InMemoryPendingOrderLedger>,
    pub orders: Arc<InMemoryOrderStore>,
}

pub fn shop_with_admin(admin_id: i64) -> TestShop {
    let catalog = Arc::new(InMemoryCatalogStore::new());
    let ledger = Arc::new(InMemoryPendingOrderLedger::new());
    let orders = Arc::new(InMemoryOrderStore::new());
    let config = AppConfig {
        admin_ids: vec![admin_id],
        ..AppConfig::default()
    };
    let engine = ShopEngine::new(
        config,
        Arc::clone(&catalog) as CatalogStoreRef,
        Arc::clone(&ledger) as PendingOrderLedgerRef,
        Arc::clone(&orders) as OrderStoreRef,
        Arc::new(InMemorySessionStore::new()),
    );
    TestShop {
        engine,
        catalog,
        ledger,
        orders,
    }
}

pub async fn seed_product(
    catalog: &InMemoryCatalogStore,
    name: &str,
    price: i64,
    stock: u32,
) -> Product {
    let category = match catalog.category_by_name("Streetwear").await.unwrap() {
        Some(category) => category,
        None => catalog.create_category("Streetwear").await.unwrap(),
    };
    catalog
        .create_product(NewProduct {
            name: name.to_string(),
            category_id: category.id,
            price: Amount::new(price).unwrap(),
            description: format!("{name} description"),
            sizes: vec!["S".to_string(), "M".to_string()],
            colors: vec!["Black".to_string()],
            stock,
            photo: "http://x/img.jpg".to_string(),
        })
        .await
        .unwrap()
}

pub fn single_line_cart(product_id: i64, name: &str, unit_price: i64, qty: u32) -> Cart {
    let mut cart = Cart::default();
    cart.lines.insert(
        "line1".to_string(),
        CartLine {
            item: CartItem {
                product_id,
                name: name.to_string(),
                size: None,
                color: None,
                unit_price: Amount::new(unit_price).unwrap(),
            },
            qty,
        },
    );
    cart
}
