use crate::domain::money::Amount;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A purchasable line item as snapshotted by the storefront at submit time.
///
/// `unit_price` is frozen here; later catalog edits never change what the
/// buyer was invoiced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub unit_price: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItem,
    pub qty: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> Amount {
        self.item.unit_price.times(self.qty)
    }

    /// Human label for the invoice, e.g. `Tee (M, Black) x2`.
    pub fn label(&self) -> String {
        let mut variant: Vec<&str> = Vec::new();
        if let Some(size) = self.item.size.as_deref() {
            variant.push(size);
        }
        if let Some(color) = self.item.color.as_deref() {
            variant.push(color);
        }
        if variant.is_empty() {
            format!("{} x{}", self.item.name, self.qty)
        } else {
            format!("{} ({}) x{}", self.item.name, variant.join(", "), self.qty)
        }
    }
}

/// A submitted cart: line key to line, as delivered by the storefront.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    pub lines: BTreeMap<String, CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> Amount {
        self.lines.values().map(CartLine::subtotal).sum()
    }
}

/// What the external invoice issuer is asked to present to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    pub currency: String,
    pub items: Vec<InvoiceLine>,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub label: String,
    pub amount: Amount,
}

/// A single-use payment reservation, alive between invoice issuance and
/// payment confirmation (or expiry).
///
/// Carries the invoiced line snapshot so capture can build the order without
/// re-reading the live catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub payload: String,
    pub user_id: i64,
    pub amount: Amount,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Paid,
}

/// A durable order, created atomically with its items on payment capture and
/// immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub payload: String,
    pub total_amount: Amount,
    pub status: OrderStatus,
    /// Opaque provider receipt.
    pub payment_info: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Amount,
    pub qty: u32,
}

/// Order fields known before the store assigns id and order number.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub payload: String,
    pub total_amount: Amount,
    pub payment_info: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub unit_price: Amount,
    pub qty: u32,
}

impl From<&CartLine> for NewOrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.item.product_id,
            name: line.item.name.clone(),
            size: line.item.size.clone(),
            color: line.item.color.clone(),
            unit_price: line.item.unit_price,
            qty: line.qty,
        }
    }
}

/// Formats `GRS-YYYYMMDD-NNNN`; `seq` is the 1-based sequence of orders
/// created on `date`.
pub fn order_number(date: NaiveDate, seq: u32) -> String {
    format!("GRS-{}-{seq:04}", date.format("%Y%m%d"))
}
