//! Stripe API object shapes, limited to the fields the shop reads.

use std::collections::HashMap;

use atelier_core::PaymentStatus;
use serde::{Deserialize, Serialize};

/// Status of a Stripe `PaymentIntent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    /// A status newer than this client knows about.
    #[serde(other)]
    Unknown,
}

impl IntentStatus {
    /// Local payment status for this intent status.
    #[must_use]
    pub const fn payment_status(self) -> PaymentStatus {
        match self {
            Self::RequiresPaymentMethod | Self::RequiresConfirmation | Self::Unknown => {
                PaymentStatus::Unpaid
            }
            Self::RequiresAction | Self::RequiresCapture => PaymentStatus::RequiresAction,
            Self::Processing => PaymentStatus::Processing,
            Self::Succeeded => PaymentStatus::Succeeded,
            Self::Canceled => PaymentStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: IntentStatus,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

impl PaymentIntent {
    /// Order id stored in the intent's metadata, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<i32> {
        self.metadata.get("order_id")?.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A page of a Stripe list endpoint.
#[derive(Debug, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_refunded: i64,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

impl Charge {
    /// Payment status after the refunds recorded on this charge.
    #[must_use]
    pub const fn refund_status(&self) -> PaymentStatus {
        if self.refunded || self.amount_refunded >= self.amount {
            PaymentStatus::Refunded
        } else if self.amount_refunded > 0 {
            PaymentStatus::PartiallyRefunded
        } else {
            PaymentStatus::Succeeded
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub livemode: bool,
}

/// Reason codes accepted by `POST /v1/refunds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
}

impl RefundReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Fraudulent => "fraudulent",
            Self::RequestedByCustomer => "requested_by_customer",
        }
    }
}

/// Error envelope Stripe returns with non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A webhook event.
#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_status_mapping() {
        let cases = [
            ("requires_payment_method", PaymentStatus::Unpaid),
            ("requires_confirmation", PaymentStatus::Unpaid),
            ("requires_action", PaymentStatus::RequiresAction),
            ("requires_capture", PaymentStatus::RequiresAction),
            ("processing", PaymentStatus::Processing),
            ("succeeded", PaymentStatus::Succeeded),
            ("canceled", PaymentStatus::Canceled),
        ];
        for (raw, expected) in cases {
            let status: IntentStatus = serde_json::from_value(serde_json::json!(raw)).unwrap();
            assert_eq!(status.payment_status(), expected, "{raw}");
        }
    }

    #[test]
    fn test_unknown_intent_status() {
        let status: IntentStatus =
            serde_json::from_value(serde_json::json!("requires_reauthorization")).unwrap();
        assert_eq!(status, IntentStatus::Unknown);
    }

    #[test]
    fn test_payment_intent_parses_metadata() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
            "object": "payment_intent",
            "status": "requires_payment_method",
            "amount": 240_000,
            "currency": "usd",
            "client_secret": "pi_3MtwBwLkdIwHu7ix28a3tqPa_secret_YrKJUKribcBjcG8HVhfZluoGH",
            "customer": "cus_NffrFeUfNV2Hib",
            "metadata": {"order_id": "42"}
        }))
        .unwrap();
        assert_eq!(intent.order_id(), Some(42));
        assert_eq!(intent.amount, 240_000);
        assert!(intent.last_payment_error.is_none());
    }

    #[test]
    fn test_charge_refund_status() {
        let charge = |amount, refunded_amount, refunded| Charge {
            id: "ch_1".to_string(),
            amount,
            amount_refunded: refunded_amount,
            refunded,
            payment_intent: None,
        };
        assert_eq!(charge(1000, 1000, true).refund_status(), PaymentStatus::Refunded);
        assert_eq!(
            charge(1000, 250, false).refund_status(),
            PaymentStatus::PartiallyRefunded
        );
        assert_eq!(charge(1000, 0, false).refund_status(), PaymentStatus::Succeeded);
    }

    #[test]
    fn test_error_body_parses() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#,
        )
        .unwrap();
        assert_eq!(body.error.kind, "card_error");
        assert_eq!(body.error.code.as_deref(), Some("card_declined"));
    }
}
