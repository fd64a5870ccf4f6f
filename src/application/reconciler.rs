use crate::application::ledger::{LedgerCore, LedgerDelta};
use crate::domain::account::{Amount, UserId};
use crate::domain::event::{EventType, NotificationEvent};
use crate::domain::payment::{
    GatewayStatus, IntentStatus, PaymentIntent, PaymentMethod, VerifiedDeposit,
};
use crate::domain::ports::{DepositStoreBox, IntentStoreBox, NotifierArc, PaymentGatewayBox};
use crate::error::{LedgerError, Result};
use chrono::Utc;
use std::sync::Arc;

/// What a poll observed, after reconciling local state with the gateway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOutcome {
    /// Local status after reconciliation; the authority for terminal states.
    pub status: IntentStatus,
    /// Live gateway report, when one was taken.
    pub gateway_status: Option<GatewayStatus>,
}

/// Creates, polls, cancels, and settles QR payment intents.
///
/// The gateway is injected at construction so tests substitute a fake.
/// Gateway calls never run while a ledger lease is held: settlement commits
/// local state first, so gateway latency cannot pin a user's ledger.
pub struct PaymentReconciler {
    gateway: PaymentGatewayBox,
    intents: IntentStoreBox,
    deposits: DepositStoreBox,
    ledger: Arc<LedgerCore>,
    notifier: NotifierArc,
}

impl PaymentReconciler {
    pub fn new(
        gateway: PaymentGatewayBox,
        intents: IntentStoreBox,
        deposits: DepositStoreBox,
        ledger: Arc<LedgerCore>,
        notifier: NotifierArc,
    ) -> Self {
        Self {
            gateway,
            intents,
            deposits,
            ledger,
            notifier,
        }
    }

    /// Obtains a payable reference from the gateway and persists the intent
    /// as pending. At most one pending, unexpired QR intent per user.
    pub async fn create(&self, user_id: UserId, amount: Amount) -> Result<PaymentIntent> {
        // Pre-check so an obviously blocked request never reaches the gateway.
        self.ensure_no_pending(user_id).await?;

        let issued = self.gateway.create(user_id, amount.value()).await?;
        let intent = PaymentIntent::new(
            issued.txn_id,
            user_id,
            amount.value(),
            PaymentMethod::Qr,
            issued.qr_image,
            issued.payable_amount,
        );

        // Re-validate under the lease: two concurrent creates can both pass
        // the pre-check, but only one may persist a pending intent.
        let _lease = self.ledger.lease(user_id).await?;
        self.ensure_no_pending(user_id).await?;
        self.intents.store(intent.clone()).await?;
        Ok(intent)
    }

    async fn ensure_no_pending(&self, user_id: UserId) -> Result<()> {
        if let Some(existing) = self.intents.pending_for(user_id).await?
            && existing.is_actionable_at(Utc::now())
        {
            return Err(LedgerError::InvalidState(format!(
                "payment {} is still pending for this user",
                existing.txn_id
            )));
        }
        Ok(())
    }

    /// Reconciles one intent against the gateway.
    ///
    /// Recorded terminal outcomes are returned as-is without a gateway call.
    /// A pending intent past its window is marked expired, again without a
    /// gateway call. Otherwise the gateway is consulted: SUCCESS settles,
    /// PENDING and FAILED leave the intent pending and retryable.
    pub async fn poll(&self, txn_id: &str) -> Result<PollOutcome> {
        let intent = self.fetch(txn_id).await?;

        if intent.status.is_terminal() {
            return Ok(PollOutcome {
                status: intent.status,
                gateway_status: None,
            });
        }
        if intent.is_expired_at(Utc::now()) {
            // Housekeeping write, under the lease so it cannot land on top
            // of a settlement that committed since the read above.
            let _lease = self.ledger.lease(intent.user_id).await?;
            let mut intent = self.fetch(txn_id).await?;
            if intent.status.is_terminal() {
                return Ok(PollOutcome {
                    status: intent.status,
                    gateway_status: None,
                });
            }
            intent.status = IntentStatus::Expired;
            intent.updated_at = Utc::now();
            self.intents.store(intent).await?;
            return Ok(PollOutcome {
                status: IntentStatus::Expired,
                gateway_status: None,
            });
        }

        let live = self.gateway.status(txn_id).await?;
        match live {
            GatewayStatus::Success => {
                self.settle(txn_id).await?;
                Ok(PollOutcome {
                    status: IntentStatus::Success,
                    gateway_status: Some(live),
                })
            }
            // FAILED is reported but never recorded as terminal here; a later
            // poll may still observe success from a retried payment.
            GatewayStatus::Pending | GatewayStatus::Failed => Ok(PollOutcome {
                status: IntentStatus::Pending,
                gateway_status: Some(live),
            }),
        }
    }

    /// Credits the balance and records the verified deposit, exactly once.
    ///
    /// Idempotent: an intent already settled is a no-op, so a duplicate
    /// success signal (retried webhook, concurrent poll) cannot credit twice.
    pub async fn settle(&self, txn_id: &str) -> Result<PaymentIntent> {
        let user_id = self.fetch(txn_id).await?.user_id;

        let intent = {
            // Re-read under the lease: a duplicate success signal racing us
            // must observe the committed terminal status, not the stale one.
            let lease = self.ledger.lease(user_id).await?;
            let mut intent = self.fetch(txn_id).await?;

            if intent.status == IntentStatus::Success {
                return Ok(intent);
            }
            if !intent.is_actionable_at(Utc::now()) {
                return Err(LedgerError::InvalidState(
                    "invalid or expired transaction".to_string(),
                ));
            }
            self.ledger
                .apply_delta(&lease, LedgerDelta::BalanceCredit(Amount::new(intent.amount)?))
                .await?;
            let now = Utc::now();
            self.deposits
                .append(VerifiedDeposit {
                    user_id: intent.user_id,
                    amount: intent.amount,
                    txn_id: intent.txn_id.clone(),
                    verified_at: now,
                })
                .await?;
            intent.status = IntentStatus::Success;
            intent.updated_at = now;
            self.intents.store(intent.clone()).await?;
            intent
        };

        self.dispatch(NotificationEvent::new(
            EventType::DepositVerified,
            intent.user_id,
            intent.amount,
            format!("payment {}", intent.txn_id),
        ));
        Ok(intent)
    }

    /// Cancels a pending, in-window intent through the gateway.
    ///
    /// The gateway must confirm before local state changes; a declined or
    /// failed cancel leaves the intent pending. No ledger mutation either
    /// way, since no credit has been applied yet.
    pub async fn cancel(&self, txn_id: &str) -> Result<PaymentIntent> {
        let intent = self.fetch(txn_id).await?;

        if !intent.is_actionable_at(Utc::now()) {
            return Err(LedgerError::InvalidState(
                "invalid or expired transaction".to_string(),
            ));
        }

        let accepted = self.gateway.cancel(txn_id).await?;
        if !accepted {
            return Err(LedgerError::ExternalServiceError(
                "gateway declined cancellation".to_string(),
            ));
        }

        // Re-read under the lease: a settlement that committed while the
        // gateway call was in flight must not be overwritten, and none can
        // commit between this check and the write.
        let _lease = self.ledger.lease(intent.user_id).await?;
        let mut intent = self.fetch(txn_id).await?;
        if intent.status.is_terminal() {
            return Err(LedgerError::InvalidState(
                "invalid or expired transaction".to_string(),
            ));
        }
        intent.status = IntentStatus::Cancelled;
        intent.updated_at = Utc::now();
        self.intents.store(intent.clone()).await?;
        Ok(intent)
    }

    /// Recent verified deposits, newest first.
    pub async fn history(&self, user_id: UserId, limit: usize) -> Result<Vec<VerifiedDeposit>> {
        self.deposits.recent(user_id, limit).await
    }

    async fn fetch(&self, txn_id: &str) -> Result<PaymentIntent> {
        self.intents
            .get(txn_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("payment intent {txn_id}")))
    }

    fn dispatch(&self, event: NotificationEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(event).await {
                tracing::warn!(error = %e, "notification dispatch failed");
            }
        });
    }
}
