use crate::application::ledger::{LedgerCore, LedgerDelta};
use crate::domain::account::{Amount, UserId};
use crate::domain::event::{EventType, NotificationEvent};
use crate::domain::ports::{NotifierArc, WithdrawalStoreBox};
use crate::domain::withdrawal::{
    Destination, ResourceKind, WithdrawalRequest, WithdrawalStatus,
};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// The admin's verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Approved,
    Rejected,
}

/// State machine over withdrawal requests.
///
/// Cash and commodity withdrawals run through the same code path; the
/// `ResourceKind` on the request picks which ledger primitives fire. The
/// debit happens exactly once at creation, a rejection applies exactly one
/// compensating credit, and an approval touches the ledger not at all.
pub struct WithdrawalWorkflow {
    ledger: Arc<LedgerCore>,
    requests: WithdrawalStoreBox,
    notifier: NotifierArc,
}

impl WithdrawalWorkflow {
    pub fn new(
        ledger: Arc<LedgerCore>,
        requests: WithdrawalStoreBox,
        notifier: NotifierArc,
    ) -> Self {
        Self {
            ledger,
            requests,
            notifier,
        }
    }

    /// Debits the resource and persists the request as pending, under one
    /// lease. The id is only handed back once both writes are committed.
    pub async fn create(
        &self,
        user_id: UserId,
        resource: ResourceKind,
        amount: Amount,
        destination: Destination,
    ) -> Result<WithdrawalRequest> {
        let request = {
            let lease = self.ledger.lease(user_id).await?;
            let delta = match &resource {
                ResourceKind::Balance => LedgerDelta::BalanceDebit(amount),
                ResourceKind::Holding(asset) => LedgerDelta::AssetDebit {
                    asset: asset.clone(),
                    quantity: amount,
                },
            };
            let receipt = self.ledger.apply_delta(&lease, delta).await?;
            let request = WithdrawalRequest::new(
                user_id,
                resource,
                amount.value(),
                receipt.cost_basis,
                destination,
            );
            self.requests.store(request.clone()).await?;
            request
        };

        self.dispatch(NotificationEvent::new(
            EventType::WithdrawalRequested,
            user_id,
            request.amount,
            format!("withdrawal request {}", request.id),
        ));
        Ok(request)
    }

    /// Resolves a pending request.
    ///
    /// Rejection credits back exactly what creation debited, then records the
    /// terminal status; approval records the status only. A terminal request
    /// fails with `InvalidTransition` and no ledger mutation.
    pub async fn resolve(&self, id: Uuid, decision: Decision) -> Result<WithdrawalRequest> {
        let user_id = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("withdrawal request {id}")))?
            .user_id;

        let (status, event_type) = match decision {
            Decision::Approved => (WithdrawalStatus::Approved, EventType::WithdrawalApproved),
            Decision::Rejected => (WithdrawalStatus::Rejected, EventType::WithdrawalRejected),
        };

        // Re-read under the lease so a concurrent duplicate resolve cannot
        // pass the pending check alongside us.
        let lease = self.ledger.lease(user_id).await?;
        let mut request = self
            .requests
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("withdrawal request {id}")))?;
        request.transition(status)?;

        if decision == Decision::Rejected {
            let amount = Amount::new(request.amount)?;
            let delta = match &request.resource {
                ResourceKind::Balance => LedgerDelta::BalanceCredit(amount),
                ResourceKind::Holding(asset) => LedgerDelta::AssetCredit {
                    asset: asset.clone(),
                    quantity: amount,
                    cost: request.cost_basis.unwrap_or_default(),
                },
            };
            self.ledger.apply_delta(&lease, delta).await?;
        }
        // Approval applies no ledger change: the funds left the available
        // balance at creation and are now considered disbursed.
        self.requests.store(request.clone()).await?;
        drop(lease);

        self.dispatch(NotificationEvent::new(
            event_type,
            request.user_id,
            request.amount,
            format!("withdrawal request {}", request.id),
        ));
        Ok(request)
    }

    /// All requests, or one user's.
    pub async fn list(&self, user_id: Option<UserId>) -> Result<Vec<WithdrawalRequest>> {
        self.requests.list(user_id).await
    }

    /// Fire-and-forget dispatch after commit. A failed delivery is logged and
    /// never rolls anything back.
    fn dispatch(&self, event: NotificationEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(event).await {
                tracing::warn!(error = %e, "notification dispatch failed");
            }
        });
    }
}
