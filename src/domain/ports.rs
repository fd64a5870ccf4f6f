use crate::domain::account::{Account, AssetHolding, UserId};
use crate::domain::event::NotificationEvent;
use crate::domain::payment::{GatewayStatus, PaymentIntent, VerifiedDeposit};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Durable holder of one balance and N holdings per user.
///
/// Implementations only need plain reads and upserts; atomicity of a logical
/// event comes from the ledger core's per-user lease.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn account(&self, user_id: UserId) -> Result<Option<Account>>;
    async fn store_account(&self, account: Account) -> Result<()>;
    async fn holding(&self, user_id: UserId, asset: &str) -> Result<Option<AssetHolding>>;
    async fn store_holding(&self, holding: AssetHolding) -> Result<()>;
    async fn holdings(&self, user_id: UserId) -> Result<Vec<AssetHolding>>;
    async fn all_accounts(&self) -> Result<Vec<Account>>;
    async fn all_holdings(&self) -> Result<Vec<AssetHolding>>;
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn store(&self, request: WithdrawalRequest) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>>;
    /// All requests, or one user's when `user_id` is given.
    async fn list(&self, user_id: Option<UserId>) -> Result<Vec<WithdrawalRequest>>;
}

#[async_trait]
pub trait IntentStore: Send + Sync {
    async fn store(&self, intent: PaymentIntent) -> Result<()>;
    async fn get(&self, txn_id: &str) -> Result<Option<PaymentIntent>>;
    /// The user's pending QR intent, if any. Enforces the
    /// one-outstanding-intent rule by query, not by a unique constraint.
    async fn pending_for(&self, user_id: UserId) -> Result<Option<PaymentIntent>>;
}

#[async_trait]
pub trait DepositStore: Send + Sync {
    async fn append(&self, deposit: VerifiedDeposit) -> Result<()>;
    /// Most recent deposits first.
    async fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<VerifiedDeposit>>;
}

/// A payable reference issued by the external gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayIntent {
    pub txn_id: String,
    pub qr_image: Option<String>,
    pub payable_amount: Decimal,
}

/// The external QR payment gateway.
///
/// Injected at construction so tests substitute a fake. Calls here may block
/// on the network and must never run while a ledger lease is held.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create(&self, user_id: UserId, amount: Decimal) -> Result<GatewayIntent>;
    async fn status(&self, txn_id: &str) -> Result<GatewayStatus>;
    /// Returns whether the gateway accepted the cancellation.
    async fn cancel(&self, txn_id: &str) -> Result<bool>;
}

/// Best-effort notification sink. Failure is the caller's to log, never to
/// propagate into a ledger outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<()>;
}

pub type AccountStoreBox = Box<dyn AccountStore>;
pub type WithdrawalStoreBox = Box<dyn WithdrawalStore>;
pub type IntentStoreBox = Box<dyn IntentStore>;
pub type DepositStoreBox = Box<dyn DepositStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type NotifierArc = std::sync::Arc<dyn Notifier>;
