use crate::domain::account::{Account, Amount, AssetCode, AssetHolding, UserId};
use crate::domain::ports::AccountStoreBox;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Bound on waiting for a user's lease before reporting a conflict.
const LEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// One debit or credit against a user's balance or one of their holdings.
#[derive(Debug, Clone)]
pub enum LedgerDelta {
    BalanceCredit(Amount),
    BalanceDebit(Amount),
    AssetCredit {
        asset: AssetCode,
        quantity: Amount,
        cost: Decimal,
    },
    AssetDebit {
        asset: AssetCode,
        quantity: Amount,
    },
}

/// What a delta moved, beyond the requested amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaReceipt {
    /// Asset debit only: the cost basis removed, for exact restoration by a
    /// later compensating credit.
    pub cost_basis: Option<Decimal>,
}

/// Exclusive access to one user's ledger rows.
///
/// Every read-then-write sequence against a user's account or holdings holds
/// this lease end to end, so two concurrent debits can never both observe a
/// sufficient balance. Dropping the lease releases the user.
pub struct UserLease {
    user_id: UserId,
    _guard: OwnedMutexGuard<()>,
}

impl UserLease {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

/// Aggregated per-asset view of a user's holdings, dust excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingSummary {
    pub asset: AssetCode,
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub average_cost: Decimal,
}

/// Applies debit/credit deltas against the account store under per-user
/// leases. The unit every workflow composes on.
pub struct LedgerCore {
    accounts: AccountStoreBox,
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl LedgerCore {
    pub fn new(accounts: AccountStoreBox) -> Self {
        Self {
            accounts,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the exclusive lease for a user.
    ///
    /// Waiting longer than the lease bound surfaces `ConcurrencyConflict`;
    /// the whole operation is safe to retry from scratch.
    pub async fn lease(&self, user_id: UserId) -> Result<UserLease> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| LedgerError::ConcurrencyConflict)?;
            // Entries nobody holds or waits on are dropped, so the map
            // tracks active users rather than every user ever seen.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id).or_default())
        };
        let guard = tokio::time::timeout(LEASE_TIMEOUT, lock.lock_owned())
            .await
            .map_err(|_| LedgerError::ConcurrencyConflict)?;
        Ok(UserLease {
            user_id,
            _guard: guard,
        })
    }

    /// Applies one delta for the leased user.
    ///
    /// Debits fail with `InsufficientFunds` / `InsufficientHolding` and write
    /// nothing; validation always precedes the store write.
    pub async fn apply_delta(
        &self,
        lease: &UserLease,
        delta: LedgerDelta,
    ) -> Result<DeltaReceipt> {
        let user_id = lease.user_id;
        match delta {
            LedgerDelta::BalanceCredit(amount) => {
                let mut account = self.account_or_new(user_id).await?;
                account.credit(amount.value());
                self.accounts.store_account(account).await?;
                Ok(DeltaReceipt { cost_basis: None })
            }
            LedgerDelta::BalanceDebit(amount) => {
                let mut account = self.account_or_new(user_id).await?;
                account.debit(amount.value())?;
                self.accounts.store_account(account).await?;
                Ok(DeltaReceipt { cost_basis: None })
            }
            LedgerDelta::AssetCredit {
                asset,
                quantity,
                cost,
            } => {
                if cost < Decimal::ZERO {
                    return Err(LedgerError::Validation(
                        "cost basis cannot be negative".to_string(),
                    ));
                }
                let mut holding = self
                    .accounts
                    .holding(user_id, &asset)
                    .await?
                    .unwrap_or_else(|| AssetHolding::new(user_id, asset));
                holding.credit(quantity.value(), cost);
                self.accounts.store_holding(holding).await?;
                Ok(DeltaReceipt { cost_basis: None })
            }
            LedgerDelta::AssetDebit { asset, quantity } => {
                let mut holding = self
                    .accounts
                    .holding(user_id, &asset)
                    .await?
                    .ok_or(LedgerError::InsufficientHolding(asset))?;
                let cost_basis = holding.debit(quantity.value())?;
                self.accounts.store_holding(holding).await?;
                Ok(DeltaReceipt {
                    cost_basis: Some(cost_basis),
                })
            }
        }
    }

    /// Current balance; zero for users with no account yet.
    pub async fn balance(&self, user_id: UserId) -> Result<Decimal> {
        Ok(self
            .accounts
            .account(user_id)
            .await?
            .map(|a| a.balance)
            .unwrap_or(Decimal::ZERO))
    }

    /// Aggregated holdings for a user, excluding dust-threshold records.
    pub async fn holdings(&self, user_id: UserId) -> Result<Vec<HoldingSummary>> {
        let holdings = self.accounts.holdings(user_id).await?;
        Ok(holdings
            .into_iter()
            .filter(|h| !h.is_dust())
            .map(|h| HoldingSummary {
                average_cost: h.average_cost(),
                asset: h.asset,
                quantity: h.quantity,
                total_cost: h.total_cost,
            })
            .collect())
    }

    /// All accounts, for reporting.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        self.accounts.all_accounts().await
    }

    /// All non-dust holdings, for reporting.
    pub async fn all_holdings(&self) -> Result<Vec<AssetHolding>> {
        let holdings = self.accounts.all_holdings().await?;
        Ok(holdings.into_iter().filter(|h| !h.is_dust()).collect())
    }

    #[cfg(test)]
    fn tracked_leases(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    async fn account_or_new(&self, user_id: UserId) -> Result<Account> {
        Ok(self
            .accounts
            .account(user_id)
            .await?
            .unwrap_or_else(|| Account::new(user_id)))
    }
}
