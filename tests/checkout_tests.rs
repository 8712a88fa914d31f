mod common;

use common::{seed_product, shop_with_admin, single_line_cart};
use gorosso::domain::event::{InboundEvent, Reply};
use gorosso::domain::money::Amount;
use gorosso::domain::order::Invoice;
use gorosso::domain::ports::{CatalogStore, OrderStore, PendingOrderLedger};

async fn submit_cart(shop: &common::TestShop, user_id: i64, cart: gorosso::domain::order::Cart) -> Invoice {
    let reply = shop
        .engine
        .handle_event(InboundEvent::CreateOrder { user_id, cart })
        .await;
    match reply {
        Reply::Invoice { invoice, .. } => invoice,
        other => panic!("expected an invoice, got {other:?}"),
    }
}

#[tokio::test]
async fn test_full_checkout_flow() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 10).await;

    // Cart → invoice.
    let cart = single_line_cart(product.id, "Tee", 50000, 2);
    let invoice = submit_cart(&shop, 42, cart).await;
    assert_eq!(invoice.items.len(), 1);
    assert_eq!(invoice.items[0].amount, Amount::new(100000).unwrap());

    // Matching pre-checkout approves.
    let reply = shop
        .engine
        .handle_event(InboundEvent::PreCheckout {
            payload: invoice.payload.clone(),
            amount: Amount::new(100000).unwrap(),
        })
        .await;
    assert_eq!(
        reply,
        Reply::PreCheckoutAnswer {
            payload: invoice.payload.clone(),
            ok: true,
            error: None,
        }
    );

    // Confirmation captures exactly one order.
    let reply = shop
        .engine
        .handle_event(InboundEvent::PaymentConfirmed {
            payload: invoice.payload.clone(),
            receipt: "provider-receipt".to_string(),
        })
        .await;
    let Reply::OrderConfirmed {
        user_id,
        order_number,
    } = reply
    else {
        panic!("expected order confirmation, got {reply:?}");
    };
    assert_eq!(user_id, 42);
    assert!(order_number.starts_with("GRS-"));

    let orders = shop.orders.all().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_amount, Amount::new(100000).unwrap());
    assert_eq!(orders[0].payload, invoice.payload);

    let items = shop.orders.items(orders[0].id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].qty, 2);
    assert_eq!(items[0].unit_price, Amount::new(50000).unwrap());

    // Stock decremented by the purchased quantity.
    assert_eq!(shop.catalog.product(product.id).await.unwrap().stock, 8);
}

#[tokio::test]
async fn test_duplicate_confirmation_is_swallowed() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 10).await;
    let invoice = submit_cart(&shop, 42, single_line_cart(product.id, "Tee", 50000, 2)).await;

    let confirm = InboundEvent::PaymentConfirmed {
        payload: invoice.payload.clone(),
        receipt: "provider-receipt".to_string(),
    };
    let first = shop.engine.handle_event(confirm.clone()).await;
    assert!(matches!(first, Reply::OrderConfirmed { .. }));

    // Second delivery of the same confirmation: no error, no new rows,
    // no second stock decrement.
    let second = shop.engine.handle_event(confirm).await;
    assert_eq!(second, Reply::Ignored);
    assert_eq!(shop.orders.all().await.unwrap().len(), 1);
    assert_eq!(shop.catalog.product(product.id).await.unwrap().stock, 8);
}

#[tokio::test]
async fn test_pre_checkout_amount_mismatch_rejects() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 10).await;
    let invoice = submit_cart(&shop, 42, single_line_cart(product.id, "Tee", 50000, 2)).await;

    let reply = shop
        .engine
        .handle_event(InboundEvent::PreCheckout {
            payload: invoice.payload.clone(),
            amount: Amount::new(99999).unwrap(),
        })
        .await;
    let Reply::PreCheckoutAnswer { ok, error, .. } = reply else {
        panic!("expected a pre-checkout answer");
    };
    assert!(!ok);
    assert!(error.is_some());
}

#[tokio::test]
async fn test_pre_checkout_unknown_payload_rejects() {
    let shop = shop_with_admin(1);
    let reply = shop
        .engine
        .handle_event(InboundEvent::PreCheckout {
            payload: "no-such-payload".to_string(),
            amount: Amount::new(100).unwrap(),
        })
        .await;
    let Reply::PreCheckoutAnswer { ok, .. } = reply else {
        panic!("expected a pre-checkout answer");
    };
    assert!(!ok);
}

#[tokio::test]
async fn test_unknown_confirmation_is_ignored() {
    let shop = shop_with_admin(1);
    let reply = shop
        .engine
        .handle_event(InboundEvent::PaymentConfirmed {
            payload: "no-such-payload".to_string(),
            receipt: "r".to_string(),
        })
        .await;
    assert_eq!(reply, Reply::Ignored);
    assert!(shop.orders.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_order_numbers_increase_under_sequential_capture() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 100).await;

    let mut numbers = Vec::new();
    for user in 1..=3 {
        let invoice =
            submit_cart(&shop, user, single_line_cart(product.id, "Tee", 50000, 1)).await;
        let reply = shop
            .engine
            .handle_event(InboundEvent::PaymentConfirmed {
                payload: invoice.payload,
                receipt: "r".to_string(),
            })
            .await;
        let Reply::OrderConfirmed { order_number, .. } = reply else {
            panic!("expected order confirmation");
        };
        numbers.push(order_number);
    }

    // Same calendar day: strictly increasing sequence, no gaps.
    let suffixes: Vec<u32> = numbers
        .iter()
        .map(|n| n.rsplit('-').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(suffixes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_stock_clamps_at_zero_on_oversold_capture() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 1).await;

    // Two units invoiced against one in stock: capture still goes through.
    let invoice = submit_cart(&shop, 42, single_line_cart(product.id, "Tee", 50000, 2)).await;
    let reply = shop
        .engine
        .handle_event(InboundEvent::PaymentConfirmed {
            payload: invoice.payload,
            receipt: "r".to_string(),
        })
        .await;
    assert!(matches!(reply, Reply::OrderConfirmed { .. }));
    assert_eq!(shop.catalog.product(product.id).await.unwrap().stock, 0);
}

#[tokio::test]
async fn test_capture_uses_invoiced_snapshot_not_live_prices() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 10).await;
    let invoice = submit_cart(&shop, 42, single_line_cart(product.id, "Tee", 50000, 1)).await;

    // Admin doubles the price between invoice and confirmation.
    shop.catalog
        .update_product_field(
            product.id,
            gorosso::domain::catalog::ProductField::Price,
            gorosso::domain::catalog::FieldValue::Money(Amount::new(100000).unwrap()),
        )
        .await
        .unwrap();

    shop.engine
        .handle_event(InboundEvent::PaymentConfirmed {
            payload: invoice.payload,
            receipt: "r".to_string(),
        })
        .await;

    let orders = shop.orders.all().await.unwrap();
    assert_eq!(orders[0].total_amount, Amount::new(50000).unwrap());
    let items = shop.orders.items(orders[0].id).await.unwrap();
    assert_eq!(items[0].unit_price, Amount::new(50000).unwrap());
}

#[tokio::test]
async fn test_expired_reservation_not_capturable_after_sweep() {
    let shop = shop_with_admin(1);
    let product = seed_product(&shop.catalog, "Tee", 50000, 10).await;
    let invoice = submit_cart(&shop, 42, single_line_cart(product.id, "Tee", 50000, 1)).await;

    // Backdate the reservation past the retention window, then sweep.
    let pending = shop.ledger.peek(&invoice.payload).await.unwrap();
    let mut stale = pending.clone();
    stale.created_at = pending.created_at - chrono::Duration::hours(48);
    shop.ledger.consume(&invoice.payload).await.unwrap();
    // Re-reserving the same payload is impossible, so stage a fresh stale one.
    stale.payload = "stale-payload".to_string();
    shop.ledger.reserve(stale).await.unwrap();

    assert_eq!(shop.engine.sweep_expired().await.unwrap(), 1);

    let reply = shop
        .engine
        .handle_event(InboundEvent::PaymentConfirmed {
            payload: "stale-payload".to_string(),
            receipt: "late".to_string(),
        })
        .await;
    assert_eq!(reply, Reply::Ignored);
    assert!(shop.orders.all().await.unwrap().is_empty());
}
