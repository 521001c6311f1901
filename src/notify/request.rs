use std::time::{Duration, SystemTime};

/**
 * Offset (milliseconds) used when a request does not name one.
 */
pub const DEFAULT_OFFSET_MILLIS: u64 = 500;

/**
 * Alerts are never scheduled further ahead than this.
 */
pub const MAX_OFFSET: Duration = Duration::from_secs(366 * 24 * 3600);

const DEFAULT_BODY: &str = "Tap on it to check";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub hours: Option<u64>,
    pub minutes: Option<u64>,
    pub seconds: Option<u64>,
    pub milliseconds: Option<u64>,
}

impl NotificationRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        NotificationRequest {
            title: Some(title.into()),
            body: Some(body.into()),
            ..NotificationRequest::default()
        }
    }

    /// How long after scheduling the alert fires. Each unset component counts as zero except
    /// `milliseconds`, which defaults to half a second.
    pub fn offset(&self) -> Duration {
        let hours = self.hours.unwrap_or(0);
        let minutes = self.minutes.unwrap_or(0);
        let seconds = self.seconds.unwrap_or(0);
        let milliseconds = self.milliseconds.unwrap_or(DEFAULT_OFFSET_MILLIS);

        Duration::from_secs(hours.saturating_mul(3600))
            .saturating_add(Duration::from_secs(minutes.saturating_mul(60)))
            .saturating_add(Duration::from_secs(seconds))
            .saturating_add(Duration::from_millis(milliseconds))
            .min(MAX_OFFSET)
    }

    pub fn fire_at(&self, now: SystemTime) -> SystemTime {
        now + self.offset()
    }

    pub fn title_at(&self, fire_at: SystemTime) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Reminder: {}", humantime::format_rfc3339_seconds(fire_at)),
        }
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or(DEFAULT_BODY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_offset_is_half_a_second() {
        let now = SystemTime::UNIX_EPOCH;
        let request = NotificationRequest::default();

        assert_eq!(request.offset(), Duration::from_millis(500));
        assert_eq!(request.fire_at(now), now + Duration::from_millis(500));
    }

    #[test]
    fn components_add_up() {
        let request = NotificationRequest {
            hours: Some(1),
            minutes: Some(2),
            seconds: Some(3),
            milliseconds: Some(4),
            ..NotificationRequest::default()
        };

        assert_eq!(request.offset(), Duration::from_millis(3_723_004));
    }

    #[test]
    fn unset_milliseconds_still_default_when_other_parts_are_set() {
        let request = NotificationRequest {
            seconds: Some(2),
            ..NotificationRequest::default()
        };

        assert_eq!(request.offset(), Duration::from_millis(2500));
    }

    #[test]
    fn huge_offsets_are_capped() {
        let now = SystemTime::UNIX_EPOCH;
        let request = NotificationRequest {
            hours: Some(u64::MAX),
            minutes: Some(u64::MAX),
            ..NotificationRequest::default()
        };

        assert_eq!(request.offset(), MAX_OFFSET);
        assert_eq!(request.fire_at(now), now + MAX_OFFSET);
    }

    #[test]
    fn default_title_and_body() {
        let request = NotificationRequest::default();
        let fire_at = SystemTime::UNIX_EPOCH + Duration::from_secs(60);

        assert_eq!(request.title_at(fire_at), "Reminder: 1970-01-01T00:01:00Z");
        assert_eq!(request.body(), "Tap on it to check");
    }

    #[test]
    fn explicit_title_and_body() {
        let request = NotificationRequest::new("Connected to: mug", "Successfully connected to BLE device");

        assert_eq!(request.title_at(SystemTime::UNIX_EPOCH), "Connected to: mug");
        assert_eq!(request.body(), "Successfully connected to BLE device");
    }
}
