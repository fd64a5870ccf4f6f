use bullion_ledger::application::ledger::LedgerCore;
use bullion_ledger::application::reconciler::PaymentReconciler;
use bullion_ledger::application::withdrawal::WithdrawalWorkflow;
use bullion_ledger::domain::withdrawal::Destination;
use bullion_ledger::infrastructure::gateway::OfflineGateway;
use bullion_ledger::infrastructure::in_memory::{
    InMemoryAccountStore, InMemoryDepositStore, InMemoryIntentStore, InMemoryWithdrawalStore,
};
use bullion_ledger::infrastructure::notify::TracingNotifier;
use std::sync::Arc;

pub struct TestEngine {
    pub ledger: Arc<LedgerCore>,
    pub withdrawals: WithdrawalWorkflow,
    pub reconciler: PaymentReconciler,
}

/// Fully wired engine over in-memory stores and the instant-settling
/// offline gateway.
pub fn engine() -> TestEngine {
    let ledger = Arc::new(LedgerCore::new(Box::new(InMemoryAccountStore::new())));
    let notifier = Arc::new(TracingNotifier);
    TestEngine {
        withdrawals: WithdrawalWorkflow::new(
            Arc::clone(&ledger),
            Box::new(InMemoryWithdrawalStore::new()),
            notifier.clone(),
        ),
        reconciler: PaymentReconciler::new(
            Box::new(OfflineGateway),
            Box::new(InMemoryIntentStore::new()),
            Box::new(InMemoryDepositStore::new()),
            Arc::clone(&ledger),
            notifier,
        ),
        ledger,
    }
}

pub fn bank() -> Destination {
    Destination::Bank {
        bank_name: "Test Bank".to_string(),
        account_number: "0012345".to_string(),
        holder: "A. User".to_string(),
    }
}
