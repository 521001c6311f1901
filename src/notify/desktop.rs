use std::time::SystemTime;
use async_trait::async_trait;
use log::info;
use msgbox::IconType;
use tokio::task::spawn_blocking;
use tokio::time::sleep;

use crate::error::NotifyError;
use crate::notify::{NotificationRequest, NotificationScheduler};

/// Shows alerts as desktop message boxes.
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        DesktopNotifier { enabled }
    }
}

#[async_trait]
impl NotificationScheduler for DesktopNotifier {
    async fn check_permissions(&self) -> bool {
        self.enabled
    }

    async fn schedule_notification(&self, request: NotificationRequest) -> Result<(), NotifyError> {
        if !self.check_permissions().await {
            info!("Notifications are disabled, dropping {:?}", request.title);
            return Ok(());
        }

        let fire_at = request.fire_at(SystemTime::now());
        let title = request.title_at(fire_at);
        let body = request.body().to_string();

        sleep(request.offset()).await;

        // msgbox blocks until the user closes it
        spawn_blocking(move || msgbox::create(&title, &body, IconType::Info))
            .await?
            .map_err(|err| NotifyError::Display { message: format!("{:?}", err) })
    }
}
