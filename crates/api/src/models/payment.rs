//! Payment request and response bodies.
//!
//! Payment routes take plain JSON objects rather than `{"data": ...}`
//! wrappers, and answer with the usual envelope.

use atelier_core::{CurrencyCode, OrderId, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payments::{IntentStatus, PaymentIntent, RefundReason};

/// Body of `POST /api/payments/intents`.
#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: OrderId,
}

/// Body of `POST /api/payments/intents/{id}/confirm`.
#[derive(Debug, Deserialize)]
pub struct ConfirmIntentRequest {
    pub payment_method: String,
    pub return_url: Option<String>,
}

/// Body of `POST /api/payments/refunds`.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub order_id: OrderId,
    /// Major units; refunds the full payment when absent.
    pub amount: Option<Decimal>,
    pub reason: Option<RefundReason>,
}

/// A payment intent as returned to clients.
#[derive(Debug, Serialize)]
pub struct IntentView {
    pub id: String,
    pub client_secret: Option<String>,
    pub intent_status: IntentStatus,
    pub payment_status: PaymentStatus,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub order_id: Option<OrderId>,
}

impl IntentView {
    #[must_use]
    pub fn new(intent: PaymentIntent, order_id: Option<OrderId>) -> Self {
        Self {
            order_id: order_id.or_else(|| intent.order_id().map(OrderId::new)),
            payment_status: intent.status.payment_status(),
            intent_status: intent.status,
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
        }
    }
}

/// Result of `POST /api/payments/refunds`.
#[derive(Debug, Serialize)]
pub struct RefundView {
    pub refund_id: String,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub payment_status: PaymentStatus,
}

/// Acknowledgement of a webhook delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub handled: bool,
}
