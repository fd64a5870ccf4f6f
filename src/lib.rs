//! Ledger & settlement engine for user balances and commodity holdings.
//!
//! The [`application::ledger::LedgerCore`] applies debits and credits under
//! per-user leases; [`application::withdrawal::WithdrawalWorkflow`] runs the
//! two-state approval machine with compensating rollback, and
//! [`application::reconciler::PaymentReconciler`] reconciles QR payment
//! intents against the external gateway.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;

pub use application::ledger::{HoldingSummary, LedgerCore, LedgerDelta};
pub use application::reconciler::{PaymentReconciler, PollOutcome};
pub use application::withdrawal::{Decision, WithdrawalWorkflow};
pub use domain::account::{Account, Amount, AssetHolding, UserId};
pub use error::{LedgerError, Result};
