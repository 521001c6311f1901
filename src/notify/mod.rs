//! Local alerts raised by the session: connection changes and cold readings.

pub mod desktop;
pub mod log_notifier;
pub mod request;

use async_trait::async_trait;

use crate::error::NotifyError;
pub use crate::notify::request::NotificationRequest;

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Whether alerts may be shown at all.
    async fn check_permissions(&self) -> bool;

    /// Shows a one-shot alert once the request's offset has elapsed. Without permission nothing is
    /// shown and the call still succeeds.
    async fn schedule_notification(&self, request: NotificationRequest) -> Result<(), NotifyError>;
}
