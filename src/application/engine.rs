use crate::application::payments::{CaptureOutcome, PaymentPipeline};
use crate::application::wizard::{WizardEngine, WizardOutcome};
use crate::config::AppConfig;
use crate::domain::catalog::CatalogSnapshot;
use crate::domain::event::{InboundEvent, Reply};
use crate::domain::ports::{
    CatalogStoreRef, OrderStoreRef, PendingOrderLedgerRef, SessionStoreRef,
};
use crate::domain::session::WizardKind;
use crate::error::{Result, ShopError};
use chrono::Utc;

/// The main entry point of the shop.
///
/// `ShopEngine` receives classified inbound events and routes them to the
/// payment pipeline, the user's active wizard, a wizard-start command, or one
/// of the listing commands. It is also the single place where error kinds
/// become user-facing text.
pub struct ShopEngine {
    config: AppConfig,
    payments: PaymentPipeline,
    wizard: WizardEngine,
    catalog: CatalogStoreRef,
    orders: OrderStoreRef,
}

impl ShopEngine {
    pub fn new(
        config: AppConfig,
        catalog: CatalogStoreRef,
        ledger: PendingOrderLedgerRef,
        orders: OrderStoreRef,
        sessions: SessionStoreRef,
    ) -> Self {
        let payments = PaymentPipeline::new(
            catalog.clone(),
            ledger,
            orders.clone(),
            config.currency.clone(),
            config.pending_retention,
        );
        let wizard = WizardEngine::new(catalog.clone(), sessions);
        Self {
            config,
            payments,
            wizard,
            catalog,
            orders,
        }
    }

    /// Processes one inbound event to completion and returns the reply for
    /// the transport to deliver. Never errors: failures become notices, and
    /// duplicate or unknown confirmations are logged and swallowed.
    pub async fn handle_event(&self, event: InboundEvent) -> Reply {
        match event {
            InboundEvent::Message { user_id, text } => self.handle_message(user_id, &text).await,
            InboundEvent::CreateOrder { user_id, cart } => {
                match self.payments.invoice_cart(user_id, &cart).await {
                    Ok(invoice) => Reply::Invoice { user_id, invoice },
                    Err(e) => self.failure(user_id, e),
                }
            }
            InboundEvent::PreCheckout { payload, amount } => {
                match self.payments.pre_checkout(&payload, amount).await {
                    Ok(()) => Reply::PreCheckoutAnswer {
                        payload,
                        ok: true,
                        error: None,
                    },
                    Err(e) => {
                        tracing::warn!(%payload, error = %e, "pre-checkout rejected");
                        Reply::PreCheckoutAnswer {
                            payload,
                            ok: false,
                            error: Some(user_message(&e)),
                        }
                    }
                }
            }
            InboundEvent::PaymentConfirmed { payload, receipt } => {
                match self.payments.capture(&payload, &receipt, Utc::now()).await {
                    Ok(CaptureOutcome::Captured(order)) => Reply::OrderConfirmed {
                        user_id: order.user_id,
                        order_number: order.order_number,
                    },
                    // Duplicate delivery: already handled, nothing to say.
                    Ok(CaptureOutcome::AlreadyCaptured) => Reply::Ignored,
                    Err(e) => {
                        tracing::error!(%payload, error = %e, "payment capture failed");
                        Reply::Ignored
                    }
                }
            }
        }
    }

    async fn handle_message(&self, user_id: i64, text: &str) -> Reply {
        match text.trim().to_lowercase().as_str() {
            "cancel" | "/cancel" => match self.wizard.cancel(user_id).await {
                Ok(()) => Reply::Notice {
                    user_id,
                    text: "Cancelled.".to_string(),
                },
                Err(e) => self.failure(user_id, e),
            },
            "add product" | "/addproduct" => {
                self.start_wizard(user_id, WizardKind::AddProduct).await
            }
            "edit product" | "/editproduct" => {
                self.start_wizard(user_id, WizardKind::EditProduct).await
            }
            "delete product" | "/delproduct" => {
                self.start_wizard(user_id, WizardKind::DeleteProduct).await
            }
            "delete category" | "/delcategory" => {
                self.start_wizard(user_id, WizardKind::DeleteCategory).await
            }
            "list products" | "/products" => {
                if !self.config.is_admin(user_id) {
                    return Reply::Ignored;
                }
                match self.render_product_list().await {
                    Ok(text) => Reply::Notice { user_id, text },
                    Err(e) => self.failure(user_id, e),
                }
            }
            "my orders" | "/myorders" => match self.render_order_list(user_id).await {
                Ok(text) => Reply::Notice { user_id, text },
                Err(e) => self.failure(user_id, e),
            },
            _ => match self.wizard.advance(user_id, text).await {
                Ok(WizardOutcome::Prompt { text } | WizardOutcome::Reprompt { text }) => {
                    Reply::Prompt { user_id, text }
                }
                Ok(WizardOutcome::Done { text }) => Reply::Notice { user_id, text },
                Err(ShopError::NoActiveSession(_)) => Reply::Ignored,
                Err(e) => self.failure(user_id, e),
            },
        }
    }

    async fn start_wizard(&self, user_id: i64, kind: WizardKind) -> Reply {
        if !self.config.is_admin(user_id) {
            tracing::debug!(user_id, ?kind, "non-admin wizard start ignored");
            return Reply::Ignored;
        }
        match self.wizard.start(user_id, kind).await {
            Ok(WizardOutcome::Prompt { text }) => Reply::Prompt { user_id, text },
            Ok(_) => Reply::Ignored,
            Err(e) => self.failure(user_id, e),
        }
    }

    async fn render_product_list(&self) -> Result<String> {
        let rows = self.catalog.list_products().await?;
        if rows.is_empty() {
            return Ok("No products.".to_string());
        }
        let mut text = String::from("ID | Name | Category | Price | Stock");
        for row in rows {
            let p = &row.product;
            text.push_str(&format!(
                "\n{} | {} | {} | {} | {}",
                p.id,
                p.name,
                row.category.as_deref().unwrap_or("-"),
                p.price,
                p.stock
            ));
        }
        Ok(text)
    }

    async fn render_order_list(&self, user_id: i64) -> Result<String> {
        let orders = self.orders.orders_for_user(user_id).await?;
        if orders.is_empty() {
            return Ok("You have no orders yet.".to_string());
        }
        let lines: Vec<String> = orders
            .iter()
            .map(|o| format!("{} | {} | paid", o.order_number, o.total_amount))
            .collect();
        Ok(lines.join("\n"))
    }

    /// Background sweep entry point; drops unpaid reservations past the
    /// retention window.
    pub async fn sweep_expired(&self) -> Result<usize> {
        self.payments.sweep_expired(Utc::now()).await
    }

    /// The read-only catalog query used by the storefront.
    pub async fn catalog_snapshot(&self) -> Result<CatalogSnapshot> {
        self.catalog.snapshot().await
    }

    /// All captured orders, for reporting.
    pub async fn orders(&self) -> Result<Vec<crate::domain::order::Order>> {
        self.orders.all().await
    }

    fn failure(&self, user_id: i64, e: ShopError) -> Reply {
        match &e {
            ShopError::Storage(_)
            | ShopError::Internal(_)
            | ShopError::Io(_)
            | ShopError::Decode(_)
            | ShopError::Csv(_)
            | ShopError::Config(_) => {
                tracing::error!(user_id, error = %e, "internal failure");
            }
            _ => tracing::debug!(user_id, error = %e, "operation rejected"),
        }
        Reply::Notice {
            user_id,
            text: user_message(&e),
        }
    }
}

/// Maps an error kind to what the user should read. Internals never leak.
fn user_message(e: &ShopError) -> String {
    match e {
        ShopError::NotFound(_) => "Nothing with that id was found.".to_string(),
        ShopError::InvalidField(_) => "That field cannot be edited.".to_string(),
        ShopError::ConstraintViolation(_) => {
            "That is not allowed: other records still depend on it.".to_string()
        }
        ShopError::EmptyCart => "Your cart is empty.".to_string(),
        ShopError::ValidationFailed(reason) => format!("{reason}."),
        ShopError::AmountMismatch { .. } => {
            "The charged amount does not match the invoice.".to_string()
        }
        ShopError::UnknownPayload(_) => "This payment is no longer valid.".to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}
