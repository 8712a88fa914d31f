use crate::domain::money::Amount;
use crate::domain::order::{Cart, Invoice};
use serde::{Deserialize, Serialize};

/// An inbound event, as classified and delivered by the external router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Free-text or button message from a user.
    Message { user_id: i64, text: String },
    /// Structured cart submission from the storefront.
    CreateOrder { user_id: i64, cart: Cart },
    /// Provider pre-checkout query carrying the invoice payload and the
    /// amount the user is about to be charged.
    PreCheckout { payload: String, amount: Amount },
    /// Provider confirmation that the payment went through.
    PaymentConfirmed { payload: String, receipt: String },
}

/// A structured reply for the external transport to render and deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// A wizard question (or re-question) awaiting the user's next message.
    Prompt { user_id: i64, text: String },
    /// A plain informational message.
    Notice { user_id: i64, text: String },
    /// Hand this invoice to the external issuer.
    Invoice { user_id: i64, invoice: Invoice },
    /// Answer to a pre-checkout query; `error` is set when `ok` is false.
    PreCheckoutAnswer {
        payload: String,
        ok: bool,
        error: Option<String>,
    },
    /// First successful capture of a paid order.
    OrderConfirmed { user_id: i64, order_number: String },
    /// The event required no outward effect (duplicate confirmation,
    /// non-admin command, unclassified text).
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type": "pre_checkout", "payload": "abc", "amount": 100000}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            InboundEvent::PreCheckout {
                payload: "abc".to_string(),
                amount: Amount::new(100000).unwrap(),
            }
        );

        let json = r#"{"type": "message", "user_id": 7, "text": "add product"}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, InboundEvent::Message { user_id: 7, .. }));
    }

    #[test]
    fn test_reply_serialization_is_tagged() {
        let reply = Reply::PreCheckoutAnswer {
            payload: "abc".to_string(),
            ok: false,
            error: Some("amount mismatch".to_string()),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["type"], "pre_checkout_answer");
        assert_eq!(json["ok"], false);
    }
}
