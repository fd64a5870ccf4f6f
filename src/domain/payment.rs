use crate::domain::account::UserId;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How long an intent stays eligible for polling, late settlement, or
/// cancellation after creation.
pub const INTENT_TTL_MINUTES: i64 = 15;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// The polled QR gateway. The only method that reconciles against the
    /// external gateway, and the only one subject to the one-pending-intent
    /// rule.
    Qr,
    BankTransfer,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Success,
    Cancelled,
    Expired,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }
}

/// Live status as reported by the external gateway.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayStatus {
    Pending,
    Success,
    Failed,
}

/// A locally tracked record of an in-flight external payment, keyed by the
/// gateway-issued transaction id.
///
/// The local status is the authority for terminal outcomes already recorded;
/// the gateway is authoritative only while the intent is pending and inside
/// its validity window.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentIntent {
    pub txn_id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub qr_image: Option<String>,
    pub payable_amount: Decimal,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        txn_id: String,
        user_id: UserId,
        amount: Decimal,
        method: PaymentMethod,
        qr_image: Option<String>,
        payable_amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            txn_id,
            user_id,
            amount,
            method,
            qr_image,
            payable_amount,
            status: IntentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the validity window has elapsed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::minutes(INTENT_TTL_MINUTES)
    }

    /// Pending and still inside the validity window at `now`.
    pub fn is_actionable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == IntentStatus::Pending && !self.is_expired_at(now)
    }
}

/// Immutable record appended once an intent settles successfully.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct VerifiedDeposit {
    pub user_id: UserId,
    pub amount: Decimal,
    pub txn_id: String,
    pub verified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn intent() -> PaymentIntent {
        PaymentIntent::new(
            "TXN-1".to_string(),
            1,
            dec!(500.00),
            PaymentMethod::Qr,
            Some("data:image/png;base64,...".to_string()),
            dec!(500.00),
        )
    }

    #[test]
    fn test_fresh_intent_is_actionable() {
        let intent = intent();
        let now = Utc::now();
        assert!(!intent.is_expired_at(now));
        assert!(intent.is_actionable_at(now));
    }

    #[test]
    fn test_intent_expires_after_window() {
        let intent = intent();
        let later = intent.created_at + Duration::minutes(20);
        assert!(intent.is_expired_at(later));
        assert!(!intent.is_actionable_at(later));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let intent = intent();
        let edge = intent.created_at + Duration::minutes(INTENT_TTL_MINUTES);
        assert!(!intent.is_expired_at(edge));
    }

    #[test]
    fn test_terminal_intent_not_actionable() {
        let mut intent = intent();
        intent.status = IntentStatus::Success;
        assert!(!intent.is_actionable_at(Utc::now()));
    }
}
