use crate::domain::account::UserId;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    WithdrawalRequested,
    WithdrawalApproved,
    WithdrawalRejected,
    DepositVerified,
}

/// Structured event handed to the notification dispatcher after a ledger
/// mutation commits.
///
/// Delivery is best-effort: failures are logged and never affect the ledger
/// outcome that produced the event.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub event_type: EventType,
    pub user_id: UserId,
    pub amount: Decimal,
    pub details: String,
}

impl NotificationEvent {
    pub fn new(event_type: EventType, user_id: UserId, amount: Decimal, details: String) -> Self {
        Self {
            event_type,
            user_id,
            amount,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_serializes_camel_case() {
        let event = NotificationEvent::new(
            EventType::DepositVerified,
            7,
            dec!(500.00),
            "TXN-1".to_string(),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"eventType\":\"depositVerified\""));
        assert!(json.contains("\"userId\":7"));
    }
}
