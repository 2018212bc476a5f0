// libs/scheduling-cell/src/services/notifications.rs
use tracing::info;

use crate::models::NotificationEvent;

/// Seam to the external notification collaborator. Dispatch is fire-and-forget
/// from the engine's point of view; delivery, templates and retries live
/// elsewhere.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, event: NotificationEvent);
}

/// Default sink: record the event in the log stream and nothing more.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, event: NotificationEvent) {
        info!(
            "Notification event {:?} for {:?} {} (appointment {})",
            event.kind, event.recipient_type, event.recipient_id, event.appointment_id
        );
    }
}
