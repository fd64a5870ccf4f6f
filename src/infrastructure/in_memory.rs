use crate::domain::account::{Account, AssetHolding, UserId};
use crate::domain::payment::{IntentStatus, PaymentIntent, PaymentMethod, VerifiedDeposit};
use crate::domain::ports::{AccountStore, DepositStore, IntentStore, WithdrawalStore};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory store for accounts and holdings.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access. Ideal for
/// testing or single-run replays where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<UserId, Account>>>,
    holdings: Arc<RwLock<HashMap<(UserId, String), AssetHolding>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn account(&self, user_id: UserId) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&user_id).cloned())
    }

    async fn store_account(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.user_id, account);
        Ok(())
    }

    async fn holding(&self, user_id: UserId, asset: &str) -> Result<Option<AssetHolding>> {
        let holdings = self.holdings.read().await;
        Ok(holdings.get(&(user_id, asset.to_string())).cloned())
    }

    async fn store_holding(&self, holding: AssetHolding) -> Result<()> {
        let mut holdings = self.holdings.write().await;
        holdings.insert((holding.user_id, holding.asset.clone()), holding);
        Ok(())
    }

    async fn holdings(&self, user_id: UserId) -> Result<Vec<AssetHolding>> {
        let holdings = self.holdings.read().await;
        let mut result: Vec<AssetHolding> = holdings
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.asset.cmp(&b.asset));
        Ok(result)
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        let mut result: Vec<Account> = accounts.values().cloned().collect();
        result.sort_by_key(|a| a.user_id);
        Ok(result)
    }

    async fn all_holdings(&self) -> Result<Vec<AssetHolding>> {
        let holdings = self.holdings.read().await;
        let mut result: Vec<AssetHolding> = holdings.values().cloned().collect();
        result.sort_by(|a, b| (a.user_id, &a.asset).cmp(&(b.user_id, &b.asset)));
        Ok(result)
    }
}

/// In-memory store for withdrawal requests.
#[derive(Default, Clone)]
pub struct InMemoryWithdrawalStore {
    requests: Arc<RwLock<HashMap<Uuid, WithdrawalRequest>>>,
}

impl InMemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WithdrawalStore for InMemoryWithdrawalStore {
    async fn store(&self, request: WithdrawalRequest) -> Result<()> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id).cloned())
    }

    async fn list(&self, user_id: Option<UserId>) -> Result<Vec<WithdrawalRequest>> {
        let requests = self.requests.read().await;
        let mut result: Vec<WithdrawalRequest> = requests
            .values()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .cloned()
            .collect();
        result.sort_by_key(|r| r.created_at);
        Ok(result)
    }
}

/// In-memory store for payment intents, keyed by gateway transaction id.
#[derive(Default, Clone)]
pub struct InMemoryIntentStore {
    intents: Arc<RwLock<HashMap<String, PaymentIntent>>>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn store(&self, intent: PaymentIntent) -> Result<()> {
        let mut intents = self.intents.write().await;
        intents.insert(intent.txn_id.clone(), intent);
        Ok(())
    }

    async fn get(&self, txn_id: &str) -> Result<Option<PaymentIntent>> {
        let intents = self.intents.read().await;
        Ok(intents.get(txn_id).cloned())
    }

    async fn pending_for(&self, user_id: UserId) -> Result<Option<PaymentIntent>> {
        let intents = self.intents.read().await;
        Ok(intents
            .values()
            .find(|i| {
                i.user_id == user_id
                    && i.method == PaymentMethod::Qr
                    && i.status == IntentStatus::Pending
            })
            .cloned())
    }
}

/// Append-only in-memory store for verified deposits.
#[derive(Default, Clone)]
pub struct InMemoryDepositStore {
    deposits: Arc<RwLock<Vec<VerifiedDeposit>>>,
}

impl InMemoryDepositStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DepositStore for InMemoryDepositStore {
    async fn append(&self, deposit: VerifiedDeposit) -> Result<()> {
        let mut deposits = self.deposits.write().await;
        deposits.push(deposit);
        Ok(())
    }

    async fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<VerifiedDeposit>> {
        let deposits = self.deposits.read().await;
        Ok(deposits
            .iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
