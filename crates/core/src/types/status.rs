//! Status enums for orders and payments.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// ```text
/// pending ──► paid ──► processing ──► shipped ──► delivered
///    │          │           │                         │
///    ▼          ├──► refunded ◄───────────────────────┘
/// cancelled ◄───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Whether the order can move from `self` to `next`.
    ///
    /// Re-applying the current status is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self as u8 == next as u8 {
            return true;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Processing | Self::Refunded | Self::Cancelled)
                | (Self::Processing, Self::Shipped | Self::Refunded)
                | (Self::Shipped, Self::Delivered)
                | (Self::Delivered, Self::Refunded)
        )
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Orders in these statuses can be deleted outright.
    #[must_use]
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Pending | Self::Cancelled)
    }

    /// Order status implied by a new payment status.
    ///
    /// A succeeded payment moves a pending order to paid, a full refund moves
    /// any refundable order to refunded. Everything else leaves it alone.
    #[must_use]
    pub const fn after_payment(self, payment: PaymentStatus) -> Self {
        match payment {
            PaymentStatus::Succeeded if matches!(self, Self::Pending) => Self::Paid,
            PaymentStatus::Refunded if self.can_transition_to(Self::Refunded) => Self::Refunded,
            _ => self,
        }
    }

    /// Snake-case name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Payment status of an order, as last reported by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No payment attempt yet, or the attempt needs a payment method.
    #[default]
    Unpaid,
    /// Customer action (e.g. 3-D Secure) or capture is required.
    RequiresAction,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    PartiallyRefunded,
    Refunded,
}

impl PaymentStatus {
    /// Whether a report of `self` should replace `current`.
    ///
    /// Gateway events can arrive out of order, so once money is captured an
    /// earlier in-flight status never overwrites it.
    #[must_use]
    pub const fn supersedes(self, current: Self) -> bool {
        let captured = matches!(
            current,
            Self::Succeeded | Self::PartiallyRefunded | Self::Refunded
        );
        let in_flight = matches!(
            self,
            Self::Unpaid | Self::RequiresAction | Self::Processing | Self::Failed | Self::Canceled
        );
        !(captured && in_flight)
    }

    /// Whether money has been captured and may be refunded.
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallyRefunded)
    }

    /// Snake-case name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "requires_action" => Ok(Self::RequiresAction),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            "partially_refunded" => Ok(Self::PartiallyRefunded),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_happy_path_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn test_order_rejected_transitions() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Refunded.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_same_status_is_noop_transition() {
        assert!(OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Shipped));
    }

    #[test]
    fn test_terminal_and_deletable() {
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Pending.is_deletable());
        assert!(!OrderStatus::Paid.is_deletable());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(
            "partially_refunded".parse::<PaymentStatus>(),
            Ok(PaymentStatus::PartiallyRefunded)
        );
        assert!("lost".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_order_status_after_payment() {
        assert_eq!(
            OrderStatus::Pending.after_payment(PaymentStatus::Succeeded),
            OrderStatus::Paid
        );
        assert_eq!(
            OrderStatus::Shipped.after_payment(PaymentStatus::Succeeded),
            OrderStatus::Shipped
        );
        assert_eq!(
            OrderStatus::Paid.after_payment(PaymentStatus::Refunded),
            OrderStatus::Refunded
        );
        // shipped -> refunded is not an allowed transition
        assert_eq!(
            OrderStatus::Shipped.after_payment(PaymentStatus::Refunded),
            OrderStatus::Shipped
        );
        assert_eq!(
            OrderStatus::Pending.after_payment(PaymentStatus::Failed),
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_captured_payment_not_overwritten_by_stale_status() {
        assert!(PaymentStatus::Succeeded.supersedes(PaymentStatus::Processing));
        assert!(PaymentStatus::Refunded.supersedes(PaymentStatus::Succeeded));
        assert!(!PaymentStatus::Processing.supersedes(PaymentStatus::Succeeded));
        assert!(!PaymentStatus::Failed.supersedes(PaymentStatus::Refunded));
        assert!(PaymentStatus::Failed.supersedes(PaymentStatus::Processing));
    }

    #[test]
    fn test_payment_refundable() {
        assert!(PaymentStatus::Succeeded.is_refundable());
        assert!(PaymentStatus::PartiallyRefunded.is_refundable());
        assert!(!PaymentStatus::Refunded.is_refundable());
        assert!(!PaymentStatus::Unpaid.is_refundable());
    }
}
