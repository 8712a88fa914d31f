use crate::domain::money::Amount;
use crate::domain::order::{Cart, Invoice, InvoiceLine, NewOrder, NewOrderItem, Order, PendingOrder};
use crate::domain::ports::{CatalogStoreRef, OrderStoreRef, PendingOrderLedgerRef};
use crate::error::{Result, ShopError};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Drives a cart through the order/payment lifecycle:
/// cart submitted → invoiced → pre-checkout verified → captured,
/// with rejection and expiry as the failure exits.
///
/// The pipeline holds no state of its own; everything between invoicing and
/// capture lives in the ledger, so it is re-entrant across the asynchronous
/// gap between issuing an invoice and hearing back from the provider.
pub struct PaymentPipeline {
    catalog: CatalogStoreRef,
    ledger: PendingOrderLedgerRef,
    orders: OrderStoreRef,
    currency: String,
    retention: Duration,
}

/// Result of a confirmation event.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// First delivery: the order was durably recorded.
    Captured(Order),
    /// Repeat delivery: already handled, nothing written.
    AlreadyCaptured,
}

impl PaymentPipeline {
    pub fn new(
        catalog: CatalogStoreRef,
        ledger: PendingOrderLedgerRef,
        orders: OrderStoreRef,
        currency: String,
        retention: Duration,
    ) -> Self {
        Self {
            catalog,
            ledger,
            orders,
            currency,
            retention,
        }
    }

    /// `CART_SUBMITTED → INVOICED`: totals the cart, reserves a fresh payload
    /// and returns the invoice for the external issuer to present.
    pub async fn invoice_cart(&self, user_id: i64, cart: &Cart) -> Result<Invoice> {
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let total = cart.total();
        let payload = Uuid::new_v4().simple().to_string();
        let lines: Vec<_> = cart.lines.values().cloned().collect();

        let items: Vec<InvoiceLine> = lines
            .iter()
            .map(|line| InvoiceLine {
                label: line.label(),
                amount: line.subtotal(),
            })
            .collect();
        let description = items
            .iter()
            .map(|i| i.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        self.ledger
            .reserve(PendingOrder {
                payload: payload.clone(),
                user_id,
                amount: total,
                lines,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id, %payload, total = total.value(), "invoice issued");
        Ok(Invoice {
            title: "Gorosso order".to_string(),
            description,
            currency: self.currency.clone(),
            items,
            payload,
        })
    }

    /// `INVOICED → PRECHECKOUT_VERIFIED`: approve only if the payload is still
    /// reserved and the charged amount equals the reserved amount.
    pub async fn pre_checkout(&self, payload: &str, amount: Amount) -> Result<()> {
        let pending = match self.ledger.peek(payload).await {
            Ok(pending) => pending,
            Err(ShopError::NotFound(_)) => {
                return Err(ShopError::UnknownPayload(payload.to_string()));
            }
            Err(e) => return Err(e),
        };
        if pending.amount != amount {
            return Err(ShopError::AmountMismatch {
                reserved: pending.amount,
                actual: amount,
            });
        }
        Ok(())
    }

    /// `PRECHECKOUT_VERIFIED → CAPTURED`: consume the reservation exactly
    /// once, persist the order with its items from the invoiced snapshot and
    /// decrement stock. A repeat delivery of the confirmation is a no-op.
    pub async fn capture(
        &self,
        payload: &str,
        receipt: &str,
        at: DateTime<Utc>,
    ) -> Result<CaptureOutcome> {
        let pending = match self.ledger.consume(payload).await {
            Ok(pending) => pending,
            Err(ShopError::AlreadyConsumed(_)) => {
                tracing::info!(%payload, "duplicate payment confirmation ignored");
                return Ok(CaptureOutcome::AlreadyCaptured);
            }
            Err(ShopError::NotFound(_)) => {
                return Err(ShopError::UnknownPayload(payload.to_string()));
            }
            Err(e) => return Err(e),
        };

        let items: Vec<NewOrderItem> = pending.lines.iter().map(NewOrderItem::from).collect();
        let order = self
            .orders
            .insert(
                NewOrder {
                    user_id: pending.user_id,
                    payload: pending.payload.clone(),
                    total_amount: pending.amount,
                    payment_info: receipt.to_string(),
                },
                items,
                at,
            )
            .await?;

        for line in &pending.lines {
            self.catalog
                .decrement_stock(line.item.product_id, line.qty)
                .await?;
        }

        tracing::info!(
            user_id = order.user_id,
            order_number = %order.order_number,
            total = order.total_amount.value(),
            "payment captured"
        );
        Ok(CaptureOutcome::Captured(order))
    }

    /// `INVOICED → EXPIRED`: drop reservations past the retention window.
    /// Each drop goes through `consume`, so a late capture that won the race
    /// keeps its order and the sweep skips it.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - self.retention;
        let mut dropped = 0;
        for payload in self.ledger.expired(cutoff).await? {
            match self.ledger.consume(&payload).await {
                Ok(_) => {
                    tracing::info!(%payload, "expired reservation dropped");
                    dropped += 1;
                }
                Err(ShopError::AlreadyConsumed(_) | ShopError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(dropped)
    }
}
