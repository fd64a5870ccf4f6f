use crate::domain::event::NotificationEvent;
use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;

/// Notification sink that writes events to the log.
///
/// Stands in for a real dispatcher (mail, push, webhook); the engine only
/// requires that delivery never blocks or rolls back a ledger mutation.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<()> {
        tracing::info!(
            event_type = ?event.event_type,
            user_id = event.user_id,
            amount = %event.amount,
            details = %event.details,
            "notification"
        );
        Ok(())
    }
}
