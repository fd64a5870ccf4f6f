use crate::domain::account::{AssetCode, UserId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a withdrawal draws from: the cash balance or one commodity holding.
///
/// Cash and asset withdrawals share one state machine; this discriminator is
/// the only place they differ.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum ResourceKind {
    Balance,
    Holding(AssetCode),
}

/// Where the withdrawn funds or goods go.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub enum Destination {
    Bank {
        bank_name: String,
        account_number: String,
        holder: String,
    },
    Shipping {
        recipient: String,
        phone: String,
        address: String,
    },
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

/// A user-initiated, admin-resolved request to remove money or commodity
/// from the ledger.
///
/// The debit is applied exactly once, at creation, before the request is
/// persisted as pending. Rejection applies exactly one compensating credit;
/// approval applies no further ledger change.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: UserId,
    pub resource: ResourceKind,
    pub amount: Decimal,
    /// Asset variant only: the exact cost basis removed at debit time,
    /// restored verbatim if the request is rejected.
    pub cost_basis: Option<Decimal>,
    pub destination: Destination,
    pub status: WithdrawalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn new(
        user_id: UserId,
        resource: ResourceKind,
        amount: Decimal,
        cost_basis: Option<Decimal>,
        destination: Destination,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            resource,
            amount,
            cost_basis,
            destination,
            status: WithdrawalStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the request into a terminal state. Fails if it already is in one.
    pub fn transition(&mut self, decision: WithdrawalStatus) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::InvalidTransition(format!(
                "request {} is already {:?}",
                self.id, self.status
            )));
        }
        if decision == WithdrawalStatus::Pending {
            return Err(LedgerError::InvalidTransition(
                "cannot transition back to pending".to_string(),
            ));
        }
        self.status = decision;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bank_destination() -> Destination {
        Destination::Bank {
            bank_name: "Test Bank".to_string(),
            account_number: "1234567890".to_string(),
            holder: "A. User".to_string(),
        }
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = WithdrawalRequest::new(
            1,
            ResourceKind::Balance,
            dec!(300.00),
            None,
            bank_destination(),
        );
        assert_eq!(req.status, WithdrawalStatus::Pending);
        assert!(!req.status.is_terminal());
    }

    #[test]
    fn test_transition_to_terminal_once() {
        let mut req = WithdrawalRequest::new(
            1,
            ResourceKind::Holding("GOLD96".to_string()),
            dec!(2.0),
            Some(dec!(10000.00)),
            bank_destination(),
        );
        req.transition(WithdrawalStatus::Approved).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Approved);

        let again = req.transition(WithdrawalStatus::Rejected);
        assert!(matches!(again, Err(LedgerError::InvalidTransition(_))));
        assert_eq!(req.status, WithdrawalStatus::Approved);
    }

    #[test]
    fn test_transition_back_to_pending_rejected() {
        let mut req = WithdrawalRequest::new(
            1,
            ResourceKind::Balance,
            dec!(1.00),
            None,
            bank_destination(),
        );
        let result = req.transition(WithdrawalStatus::Pending);
        assert!(matches!(result, Err(LedgerError::InvalidTransition(_))));
    }
}
