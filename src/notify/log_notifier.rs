use std::time::SystemTime;
use async_trait::async_trait;
use log::info;
use tokio::time::sleep;

use crate::error::NotifyError;
use crate::notify::{NotificationRequest, NotificationScheduler};

/// Writes alerts to the log, for machines without a desktop session.
pub struct LogNotifier {
    enabled: bool,
}

impl LogNotifier {
    pub fn new(enabled: bool) -> Self {
        LogNotifier { enabled }
    }
}

#[async_trait]
impl NotificationScheduler for LogNotifier {
    async fn check_permissions(&self) -> bool {
        self.enabled
    }

    async fn schedule_notification(&self, request: NotificationRequest) -> Result<(), NotifyError> {
        if !self.check_permissions().await {
            info!("Notifications are disabled, dropping {:?}", request.title);
            return Ok(());
        }

        let fire_at = request.fire_at(SystemTime::now());
        sleep(request.offset()).await;
        info!("[notification] {}: {}", request.title_at(fire_at), request.body());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_notifier_succeeds_without_waiting() {
        let notifier = LogNotifier::new(false);
        let request = NotificationRequest {
            hours: Some(1),
            ..NotificationRequest::default()
        };

        assert!(!notifier.check_permissions().await);
        // would sleep for an hour if it were scheduled
        notifier.schedule_notification(request).await.unwrap();
    }

    #[tokio::test]
    async fn enabled_notifier_fires() {
        let notifier = LogNotifier::new(true);
        let request = NotificationRequest {
            milliseconds: Some(0),
            ..NotificationRequest::new("title", "body")
        };

        assert!(notifier.check_permissions().await);
        notifier.schedule_notification(request).await.unwrap();
    }
}
