//! Payment gateway route handlers.
//!
//! Intents are created for pending orders and every gateway answer is
//! written back to the order's `payment_status`. Intents that do not belong
//! to one of our orders are reported as not found.

use atelier_core::{OrderId, PaymentStatus, Price};
use axum::{body::Bytes, extract::State, http::HeaderMap, http::StatusCode};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::RequireApiToken;
use crate::models::order::order_total;
use crate::models::{
    ConfirmIntentRequest, CreateIntentRequest, Envelope, IntentView, Order, RefundRequest,
    RefundView, WebhookAck,
};
use crate::payments::webhook::{DEFAULT_TOLERANCE_SECS, verify_signature};
use crate::payments::{Charge, CreateIntent, Event, PaymentError, PaymentIntent};
use crate::state::AppState;

/// Header carrying the webhook signature.
const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /api/payments/intents`
///
/// Reuses the order's intent if one is already open.
#[instrument(skip(state, input))]
pub async fn create_intent(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateIntentRequest>,
) -> Result<(StatusCode, Envelope<IntentView>)> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(input.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    require_payable(&order)?;

    if let Some(intent_id) = order.payment_intent_id.as_deref()
        && order.payment_status != PaymentStatus::Canceled
    {
        let intent = state.stripe().retrieve_payment_intent(intent_id).await?;
        record(&state, &order, &intent).await?;
        return Ok((StatusCode::OK, Envelope::single(IntentView::new(intent, Some(order.id)))));
    }

    let total = order_total(&repo.items(order.id).await?);
    if total <= rust_decimal::Decimal::ZERO {
        return Err(AppError::BadRequest(
            "order total must be greater than zero".to_string(),
        ));
    }
    let amount = Price::new(total, order.currency)
        .to_minor_units()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let customer = state
        .stripe()
        .find_or_create_customer(order.customer_email.as_str())
        .await?;
    let intent = state
        .stripe()
        .create_payment_intent(&CreateIntent {
            amount,
            currency: order.currency.as_str(),
            customer_id: &customer.id,
            order_id: order.id.as_i32(),
            order_number: &order.order_number,
            receipt_email: order.customer_email.as_str(),
        })
        .await?;

    let order = repo
        .attach_payment_intent(
            order.id,
            &customer.id,
            &intent.id,
            intent.status.payment_status(),
        )
        .await?;

    add_breadcrumb(
        "payment",
        "Payment intent created",
        &[
            ("order_number", order.order_number.clone()),
            ("payment_intent_id", intent.id.clone()),
        ],
    );
    tracing::info!(
        order_id = %order.id,
        payment_intent_id = %intent.id,
        amount,
        "Payment intent created"
    );

    Ok((
        StatusCode::CREATED,
        Envelope::single(IntentView::new(intent, Some(order.id))),
    ))
}

/// `GET /api/payments/intents/{id}`
#[instrument(skip(state))]
pub async fn retrieve_intent(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Envelope<IntentView>> {
    let order = order_for_intent(&state, &id).await?;
    let intent = state.stripe().retrieve_payment_intent(&id).await?;
    record(&state, &order, &intent).await?;
    Ok(Envelope::single(IntentView::new(intent, Some(order.id))))
}

/// `POST /api/payments/intents/{id}/confirm`
///
/// Only intents of pending orders can be confirmed. A declined card marks the
/// order's payment as failed before the error is returned.
#[instrument(skip(state, input))]
pub async fn confirm_intent(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(input): ApiJson<ConfirmIntentRequest>,
) -> Result<Envelope<IntentView>> {
    let order = order_for_intent(&state, &id).await?;
    require_payable(&order)?;

    let intent = match state
        .stripe()
        .confirm_payment_intent(&id, &input.payment_method, input.return_url.as_deref())
        .await
    {
        Ok(intent) => intent,
        Err(err @ PaymentError::Card { .. }) => {
            OrderRepository::new(state.pool())
                .record_payment_status(order.id, PaymentStatus::Failed)
                .await?;
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    record(&state, &order, &intent).await?;
    Ok(Envelope::single(IntentView::new(intent, Some(order.id))))
}

/// `POST /api/payments/intents/{id}/cancel`
///
/// Captured payments are refunded, not cancelled.
#[instrument(skip(state))]
pub async fn cancel_intent(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Envelope<IntentView>> {
    let order = order_for_intent(&state, &id).await?;
    require_uncaptured(&order)?;
    let intent = state.stripe().cancel_payment_intent(&id).await?;
    record(&state, &order, &intent).await?;
    Ok(Envelope::single(IntentView::new(intent, Some(order.id))))
}

/// `POST /api/payments/refunds`
#[instrument(skip(state, input))]
pub async fn refund(
    State(state): State<AppState>,
    _token: RequireApiToken,
    ApiJson(input): ApiJson<RefundRequest>,
) -> Result<Envelope<RefundView>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(input.order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    if !order.payment_status.is_refundable() {
        return Err(AppError::Conflict(format!(
            "cannot refund an order whose payment is {}",
            order.payment_status
        )));
    }
    let intent_id = order
        .payment_intent_id
        .clone()
        .ok_or_else(|| AppError::Conflict("order has no payment intent".to_string()))?;

    let total = order_total(&repo.items(order.id).await?);
    let amount_minor = match input.amount {
        Some(amount) => Some(refund_minor_units(amount, total, &order)?),
        None => None,
    };

    let refund = state
        .stripe()
        .create_refund(&intent_id, amount_minor, input.reason)
        .await?;

    let refunded = Price::from_minor_units(refund.amount, order.currency).amount;
    let payment_status = if input.amount.is_none_or(|amount| amount >= total) {
        PaymentStatus::Refunded
    } else {
        PaymentStatus::PartiallyRefunded
    };
    let order = repo.record_payment_status(order.id, payment_status).await?;

    add_breadcrumb(
        "payment",
        "Refund issued",
        &[
            ("order_number", order.order_number.clone()),
            ("refund_id", refund.id.clone()),
        ],
    );
    tracing::info!(
        order_id = %order.id,
        refund_id = %refund.id,
        amount = %refunded,
        payment_status = %payment_status,
        "Refund issued"
    );

    Ok(Envelope::single(RefundView {
        refund_id: refund.id,
        order_id: order.id,
        amount: refunded,
        currency: order.currency,
        payment_status: order.payment_status,
    }))
}

/// `POST /api/payments/webhook`
///
/// Unknown event types are acknowledged and ignored.
#[instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Envelope<WebhookAck>> {
    let secret = state
        .config()
        .stripe
        .webhook_secret
        .as_ref()
        .ok_or(PaymentError::NotConfigured("Stripe webhook secret"))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            PaymentError::InvalidSignature("Missing Stripe-Signature header".to_string())
        })?;

    verify_signature(
        &body,
        signature,
        secret.expose_secret(),
        chrono::Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )?;

    let event: Event = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid event payload: {e}")))?;
    let handled = match payment_update(&event)? {
        Some(update) => apply_update(&state, &event, update).await?,
        None => {
            tracing::debug!(event_id = %event.id, kind = %event.kind, "Ignoring webhook event");
            false
        }
    };

    Ok(Envelope::single(WebhookAck {
        received: true,
        handled,
    }))
}

// =============================================================================
// Helpers
// =============================================================================

/// Payment change carried by a webhook event.
#[derive(Debug, PartialEq, Eq)]
struct PaymentUpdate {
    payment_intent_id: String,
    order_id: Option<OrderId>,
    status: PaymentStatus,
}

/// Extract the payment change from the event types we act on.
fn payment_update(event: &Event) -> Result<Option<PaymentUpdate>> {
    let parse_err = |e: serde_json::Error| {
        AppError::BadRequest(format!("Invalid {} object: {e}", event.kind))
    };

    match event.kind.as_str() {
        "payment_intent.succeeded"
        | "payment_intent.processing"
        | "payment_intent.canceled"
        | "payment_intent.payment_failed" => {
            let intent: PaymentIntent =
                serde_json::from_value(event.data.object.clone()).map_err(parse_err)?;
            let status = if event.kind == "payment_intent.payment_failed" {
                PaymentStatus::Failed
            } else {
                intent.status.payment_status()
            };
            Ok(Some(PaymentUpdate {
                order_id: intent.order_id().map(OrderId::new),
                payment_intent_id: intent.id,
                status,
            }))
        }
        "charge.refunded" => {
            let charge: Charge =
                serde_json::from_value(event.data.object.clone()).map_err(parse_err)?;
            Ok(charge.payment_intent.clone().map(|payment_intent_id| PaymentUpdate {
                payment_intent_id,
                order_id: None,
                status: charge.refund_status(),
            }))
        }
        _ => Ok(None),
    }
}

async fn apply_update(state: &AppState, event: &Event, update: PaymentUpdate) -> Result<bool> {
    let repo = OrderRepository::new(state.pool());
    let order = match repo.get_by_payment_intent(&update.payment_intent_id).await? {
        Some(order) => Some(order),
        None => match update.order_id {
            Some(id) => repo.get(id).await?.filter(accepts_unlinked_intent),
            None => None,
        },
    };

    let Some(order) = order else {
        tracing::warn!(
            event_id = %event.id,
            payment_intent_id = %update.payment_intent_id,
            "Webhook event for unknown order"
        );
        return Ok(false);
    };

    repo.record_payment_status(order.id, update.status).await?;
    tracing::info!(
        event_id = %event.id,
        kind = %event.kind,
        order_id = %order.id,
        payment_status = %update.status,
        "Webhook event applied"
    );
    Ok(true)
}

/// An order found through intent metadata only takes the update while it has
/// no intent attached. Events for a replaced intent must not touch the live one.
fn accepts_unlinked_intent(order: &Order) -> bool {
    order.payment_intent_id.is_none()
}

/// Payments are only taken for pending orders.
fn require_payable(order: &Order) -> Result<()> {
    if order.status == atelier_core::OrderStatus::Pending {
        return Ok(());
    }
    Err(AppError::Conflict(format!(
        "cannot pay for a {} order",
        order.status
    )))
}

fn require_uncaptured(order: &Order) -> Result<()> {
    if order.payment_status.is_refundable() || order.payment_status == PaymentStatus::Refunded {
        return Err(AppError::Conflict(format!(
            "payment is already {}, refund it instead",
            order.payment_status
        )));
    }
    Ok(())
}

async fn order_for_intent(state: &AppState, payment_intent_id: &str) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get_by_payment_intent(payment_intent_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment intent".to_string()))
}

async fn record(state: &AppState, order: &Order, intent: &PaymentIntent) -> Result<Order> {
    Ok(OrderRepository::new(state.pool())
        .record_payment_status(order.id, intent.status.payment_status())
        .await?)
}

/// Validate a partial refund and convert it to minor units.
fn refund_minor_units(
    amount: rust_decimal::Decimal,
    total: rust_decimal::Decimal,
    order: &Order,
) -> Result<i64> {
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(AppError::BadRequest(
            "refund amount must be greater than zero".to_string(),
        ));
    }
    if amount > total {
        return Err(AppError::BadRequest(format!(
            "refund amount exceeds order total of {total}"
        )));
    }
    Price::new(amount, order.currency)
        .to_minor_units()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn event(kind: &str, object: serde_json::Value) -> Event {
        serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": kind,
            "data": {"object": object}
        }))
        .unwrap()
    }

    fn intent_object(status: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "pi_1",
            "status": status,
            "amount": 180_000,
            "currency": "usd",
            "metadata": {"order_id": "3"}
        })
    }

    #[test]
    fn test_succeeded_event() {
        let update = payment_update(&event("payment_intent.succeeded", intent_object("succeeded")))
            .unwrap()
            .unwrap();
        assert_eq!(
            update,
            PaymentUpdate {
                payment_intent_id: "pi_1".to_string(),
                order_id: Some(OrderId::new(3)),
                status: PaymentStatus::Succeeded,
            }
        );
    }

    #[test]
    fn test_payment_failed_event() {
        let update = payment_update(&event(
            "payment_intent.payment_failed",
            intent_object("requires_payment_method"),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(update.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_charge_refunded_event() {
        let update = payment_update(&event(
            "charge.refunded",
            serde_json::json!({
                "id": "ch_1",
                "amount": 180_000,
                "amount_refunded": 30_000,
                "refunded": false,
                "payment_intent": "pi_1"
            }),
        ))
        .unwrap()
        .unwrap();
        assert_eq!(update.status, PaymentStatus::PartiallyRefunded);
        assert_eq!(update.order_id, None);
    }

    #[test]
    fn test_unknown_event_ignored() {
        let update = payment_update(&event("customer.created", serde_json::json!({"id": "cus_1"})));
        assert!(update.unwrap().is_none());
    }

    #[test]
    fn test_malformed_object_is_bad_request() {
        let update = payment_update(&event("payment_intent.succeeded", serde_json::json!({})));
        assert!(matches!(update, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_only_pending_orders_are_payable() {
        let mut order = crate::models::order::tests::order();
        assert!(require_payable(&order).is_ok());

        for status in [
            atelier_core::OrderStatus::Cancelled,
            atelier_core::OrderStatus::Paid,
            atelier_core::OrderStatus::Refunded,
        ] {
            order.status = status;
            let err = require_payable(&order).unwrap_err();
            assert_eq!(err.status(), StatusCode::CONFLICT, "{status}");
        }
    }

    #[test]
    fn test_captured_payments_cannot_be_cancelled() {
        let mut order = crate::models::order::tests::order();
        assert!(require_uncaptured(&order).is_ok());
        order.payment_status = PaymentStatus::Failed;
        assert!(require_uncaptured(&order).is_ok());

        for status in [
            PaymentStatus::Succeeded,
            PaymentStatus::PartiallyRefunded,
            PaymentStatus::Refunded,
        ] {
            order.payment_status = status;
            let err = require_uncaptured(&order).unwrap_err();
            assert_eq!(err.status(), StatusCode::CONFLICT, "{status}");
        }
    }

    #[test]
    fn test_metadata_match_ignored_once_another_intent_is_attached() {
        let mut order = crate::models::order::tests::order();
        assert!(accepts_unlinked_intent(&order));

        order.payment_intent_id = Some("pi_replacement".to_string());
        assert!(!accepts_unlinked_intent(&order));
    }

    #[test]
    fn test_refund_minor_units_bounds() {
        let order = crate::models::order::tests::order();
        let total = Decimal::new(180_000, 2);
        assert_eq!(
            refund_minor_units(Decimal::new(2550, 2), total, &order).unwrap(),
            2550
        );
        assert!(refund_minor_units(Decimal::ZERO, total, &order).is_err());
        assert!(refund_minor_units(Decimal::new(180_001, 2), total, &order).is_err());
    }
}
