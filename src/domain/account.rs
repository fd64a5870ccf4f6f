use crate::error::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type AssetCode = String;

/// Holdings at or below this quantity are treated as rounding residue: they
/// are excluded from aggregation and a fresh acquisition replaces them.
pub const DUST_THRESHOLD: Decimal = dec!(0.0001);

/// A positive monetary or commodity amount used in commands.
///
/// Wraps `rust_decimal::Decimal` so that zero or negative amounts are rejected
/// at the boundary instead of deep inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, LedgerError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::Validation("amount must be positive".to_string()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// One monetary balance per user.
///
/// Created lazily on the first balance-affecting event and mutated only
/// through the ledger core. The balance never goes below zero.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Account {
    pub user_id: UserId,
    pub balance: Decimal,
}

impl Account {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
        }
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    pub fn debit(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if self.balance >= amount {
            self.balance -= amount;
            Ok(())
        } else {
            Err(LedgerError::InsufficientFunds)
        }
    }
}

/// A commodity position for one `(user, asset)` pair.
///
/// Purchase lots are merged into this single record: quantity and cost basis
/// aggregate, and the average cost is always recomputed from the summed
/// totals, never by averaging averages.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AssetHolding {
    pub user_id: UserId,
    pub asset: AssetCode,
    pub quantity: Decimal,
    pub total_cost: Decimal,
}

impl AssetHolding {
    pub fn new(user_id: UserId, asset: AssetCode) -> Self {
        Self {
            user_id,
            asset,
            quantity: Decimal::ZERO,
            total_cost: Decimal::ZERO,
        }
    }

    /// Whether this record is rounding residue rather than a real position.
    pub fn is_dust(&self) -> bool {
        self.quantity <= DUST_THRESHOLD
    }

    /// `total_cost / quantity`, rounded to 2 decimal places.
    pub fn average_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            return Decimal::ZERO;
        }
        (self.total_cost / self.quantity)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Adds quantity at the given cost basis.
    ///
    /// A credit onto a sub-dust remainder replaces the residue instead of
    /// adding to it, so stale rounding noise never pollutes a fresh basis.
    pub fn credit(&mut self, quantity: Decimal, cost: Decimal) {
        if self.is_dust() {
            self.quantity = quantity;
            self.total_cost = cost;
        } else {
            self.quantity += quantity;
            self.total_cost += cost;
        }
    }

    /// Removes quantity, taking cost basis out proportionally.
    ///
    /// Returns the basis removed so a compensating credit can restore it
    /// exactly.
    pub fn debit(&mut self, quantity: Decimal) -> Result<Decimal, LedgerError> {
        if self.quantity < quantity {
            return Err(LedgerError::InsufficientHolding(self.asset.clone()));
        }
        let cost_removed = if self.quantity == quantity {
            // Full liquidation takes the whole basis, leaving no residue.
            std::mem::take(&mut self.total_cost)
        } else {
            let removed = self.total_cost * quantity / self.quantity;
            self.total_cost -= removed;
            removed
        };
        self.quantity -= quantity;
        Ok(cost_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_account_debit_insufficient() {
        let mut account = Account::new(1);
        account.credit(dec!(10.0));

        let result = account.debit(dec!(20.0));
        assert!(matches!(result, Err(LedgerError::InsufficientFunds)));
        assert_eq!(account.balance, dec!(10.0));
    }

    #[test]
    fn test_holding_lot_merge_recomputes_average_from_totals() {
        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.credit(dec!(10.0000), dec!(50000.00));
        holding.credit(dec!(5.0000), dec!(26000.00));

        assert_eq!(holding.quantity, dec!(15.0000));
        assert_eq!(holding.total_cost, dec!(76000.00));
        assert_eq!(holding.average_cost(), dec!(5066.67));
    }

    #[test]
    fn test_holding_debit_removes_proportional_basis() {
        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.credit(dec!(10), dec!(50000));

        let removed = holding.debit(dec!(4)).unwrap();
        assert_eq!(removed, dec!(20000));
        assert_eq!(holding.quantity, dec!(6));
        assert_eq!(holding.total_cost, dec!(30000));

        // Crediting the removed basis back restores the original position.
        holding.credit(dec!(4), removed);
        assert_eq!(holding.quantity, dec!(10));
        assert_eq!(holding.total_cost, dec!(50000));
    }

    #[test]
    fn test_holding_full_liquidation_takes_whole_basis() {
        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.credit(dec!(3), dec!(10000));

        let removed = holding.debit(dec!(3)).unwrap();
        assert_eq!(removed, dec!(10000));
        assert_eq!(holding.quantity, Decimal::ZERO);
        assert_eq!(holding.total_cost, Decimal::ZERO);
    }

    #[test]
    fn test_holding_debit_insufficient() {
        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.credit(dec!(1), dec!(5000));

        let result = holding.debit(dec!(2));
        assert!(matches!(result, Err(LedgerError::InsufficientHolding(_))));
        assert_eq!(holding.quantity, dec!(1));
        assert_eq!(holding.total_cost, dec!(5000));
    }

    #[test]
    fn test_credit_onto_dust_replaces_residue() {
        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.quantity = dec!(0.0001);
        holding.total_cost = dec!(0.37);
        assert!(holding.is_dust());

        holding.credit(dec!(5.0000), dec!(26000.00));
        assert_eq!(holding.quantity, dec!(5.0000));
        assert_eq!(holding.total_cost, dec!(26000.00));
        assert!(!holding.is_dust());
    }
}
