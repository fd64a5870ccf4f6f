use crate::domain::account::{Account, AssetHolding, UserId};
use crate::domain::payment::{IntentStatus, PaymentIntent, PaymentMethod, VerifiedDeposit};
use crate::domain::ports::{AccountStore, DepositStore, IntentStore, WithdrawalStore};
use crate::domain::withdrawal::WithdrawalRequest;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for account balances.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for asset holdings.
pub const CF_HOLDINGS: &str = "holdings";
/// Column Family for withdrawal requests.
pub const CF_WITHDRAWALS: &str = "withdrawals";
/// Column Family for payment intents.
pub const CF_INTENTS: &str = "intents";
/// Column Family for verified deposits.
pub const CF_DEPOSITS: &str = "deposits";

/// A persistent store implementation using RocksDB.
///
/// One Column Family per record type, JSON-encoded values. This struct is
/// thread-safe (`Clone` shares the underlying `Arc<DB>`) and backs every
/// storage port at once.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_HOLDINGS, CF_WITHDRAWALS, CF_INTENTS, CF_DEPOSITS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put_json<T: Serialize>(&self, cf: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf)?;
        let bytes = serde_json::to_vec(value).map_err(|e| {
            LedgerError::Internal(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("serialization error: {e}"),
            )))
        })?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(decode(&value)?);
        }
        Ok(records)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LedgerError::Internal(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("deserialization error: {e}"),
        )))
    })
}

fn holding_key(user_id: UserId, asset: &str) -> Vec<u8> {
    let mut key = user_id.to_be_bytes().to_vec();
    key.push(b':');
    key.extend_from_slice(asset.as_bytes());
    key
}

#[async_trait]
impl AccountStore for RocksDbStore {
    async fn account(&self, user_id: UserId) -> Result<Option<Account>> {
        self.get_json(CF_ACCOUNTS, &user_id.to_be_bytes())
    }

    async fn store_account(&self, account: Account) -> Result<()> {
        self.put_json(CF_ACCOUNTS, &account.user_id.to_be_bytes(), &account)
    }

    async fn holding(&self, user_id: UserId, asset: &str) -> Result<Option<AssetHolding>> {
        self.get_json(CF_HOLDINGS, &holding_key(user_id, asset))
    }

    async fn store_holding(&self, holding: AssetHolding) -> Result<()> {
        self.put_json(
            CF_HOLDINGS,
            &holding_key(holding.user_id, &holding.asset),
            &holding,
        )
    }

    async fn holdings(&self, user_id: UserId) -> Result<Vec<AssetHolding>> {
        let mut holdings: Vec<AssetHolding> = self
            .scan::<AssetHolding>(CF_HOLDINGS)?
            .into_iter()
            .filter(|h| h.user_id == user_id)
            .collect();
        holdings.sort_by(|a, b| a.asset.cmp(&b.asset));
        Ok(holdings)
    }

    async fn all_accounts(&self) -> Result<Vec<Account>> {
        // Keys are big-endian user ids, so iteration order is already sorted.
        self.scan(CF_ACCOUNTS)
    }

    async fn all_holdings(&self) -> Result<Vec<AssetHolding>> {
        self.scan(CF_HOLDINGS)
    }
}

#[async_trait]
impl WithdrawalStore for RocksDbStore {
    async fn store(&self, request: WithdrawalRequest) -> Result<()> {
        self.put_json(CF_WITHDRAWALS, request.id.as_bytes(), &request)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WithdrawalRequest>> {
        self.get_json(CF_WITHDRAWALS, id.as_bytes())
    }

    async fn list(&self, user_id: Option<UserId>) -> Result<Vec<WithdrawalRequest>> {
        let mut requests: Vec<WithdrawalRequest> = self
            .scan::<WithdrawalRequest>(CF_WITHDRAWALS)?
            .into_iter()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }
}

#[async_trait]
impl IntentStore for RocksDbStore {
    async fn store(&self, intent: PaymentIntent) -> Result<()> {
        self.put_json(CF_INTENTS, intent.txn_id.as_bytes(), &intent)
    }

    async fn get(&self, txn_id: &str) -> Result<Option<PaymentIntent>> {
        self.get_json(CF_INTENTS, txn_id.as_bytes())
    }

    async fn pending_for(&self, user_id: UserId) -> Result<Option<PaymentIntent>> {
        Ok(self
            .scan::<PaymentIntent>(CF_INTENTS)?
            .into_iter()
            .find(|i| {
                i.user_id == user_id
                    && i.method == PaymentMethod::Qr
                    && i.status == IntentStatus::Pending
            }))
    }
}

#[async_trait]
impl DepositStore for RocksDbStore {
    async fn append(&self, deposit: VerifiedDeposit) -> Result<()> {
        // Timestamp-prefixed key keeps iteration in chronological order.
        let key = format!(
            "{:020}:{}",
            deposit.verified_at.timestamp_millis(),
            deposit.txn_id
        );
        self.put_json(CF_DEPOSITS, key.as_bytes(), &deposit)
    }

    async fn recent(&self, user_id: UserId, limit: usize) -> Result<Vec<VerifiedDeposit>> {
        let deposits = self.scan::<VerifiedDeposit>(CF_DEPOSITS)?;
        Ok(deposits
            .into_iter()
            .rev()
            .filter(|d| d.user_id == user_id)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::PaymentMethod;
    use crate::domain::withdrawal::{Destination, ResourceKind};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("failed to open RocksDB");

        for cf in [CF_ACCOUNTS, CF_HOLDINGS, CF_WITHDRAWALS, CF_INTENTS, CF_DEPOSITS] {
            assert!(store.db.cf_handle(cf).is_some());
        }
    }

    #[tokio::test]
    async fn test_account_and_holding_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let mut account = Account::new(1);
        account.balance = dec!(100.0);
        store.store_account(account.clone()).await.unwrap();
        assert_eq!(store.account(1).await.unwrap().unwrap(), account);
        assert!(store.account(2).await.unwrap().is_none());

        let mut holding = AssetHolding::new(1, "GOLD96".to_string());
        holding.credit(dec!(5.0000), dec!(26000.00));
        store.store_holding(holding.clone()).await.unwrap();
        assert_eq!(
            AccountStore::holdings(&store, 1).await.unwrap(),
            vec![holding]
        );
    }

    #[tokio::test]
    async fn test_withdrawal_roundtrip() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let request = WithdrawalRequest::new(
            1,
            ResourceKind::Balance,
            dec!(300.00),
            None,
            Destination::Bank {
                bank_name: "Test Bank".to_string(),
                account_number: "0012345".to_string(),
                holder: "A. User".to_string(),
            },
        );
        WithdrawalStore::store(&store, request.clone()).await.unwrap();

        let retrieved = WithdrawalStore::get(&store, request.id).await.unwrap();
        assert_eq!(retrieved, Some(request));
    }

    #[tokio::test]
    async fn test_intent_pending_query() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();

        let intent = PaymentIntent::new(
            "TXN-1".to_string(),
            1,
            dec!(500.00),
            PaymentMethod::Qr,
            None,
            dec!(500.00),
        );
        IntentStore::store(&store, intent.clone()).await.unwrap();

        assert_eq!(store.pending_for(1).await.unwrap(), Some(intent));
        assert!(store.pending_for(2).await.unwrap().is_none());
    }
}
