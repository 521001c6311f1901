use crate::device::session::SessionSnapshot;
use crate::device::types::DeviceState;

pub fn status_line(snapshot: &SessionSnapshot) -> String {
    match &snapshot.status {
        Some(status) => format!("[{}] {}", snapshot.state, status),
        None => format!("[{}]", snapshot.state),
    }
}

pub fn render_peripherals(snapshot: &SessionSnapshot) -> String {
    if snapshot.is_scanning() {
        return "Searching...".to_string();
    }

    if let Some(target) = &snapshot.target {
        return format!(
            "* {} RSSI: {} ID: {}\nTo disconnect from device, type \"disconnect\"",
            target.display_name(),
            target.rssi,
            target.id
        );
    }

    if snapshot.discovered.is_empty() {
        return "No devices to show".to_string();
    }

    snapshot
        .discovered
        .iter()
        .enumerate()
        .map(|(index, peripheral)| {
            format!("{}. {} RSSI: {} ID: {}", index + 1, peripheral.display_name(), peripheral.rssi, peripheral.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut lines = vec![status_line(snapshot)];

    if let Some(target) = &snapshot.target {
        lines.push(format!("Device: {} ({})", target.display_name(), target.id));
    }

    if let Some((service, characteristic)) = snapshot.resolved.pair() {
        lines.push(format!("Characteristic: {} / {}", service, characteristic));
    }

    match &snapshot.last_reading {
        Some(reading) if reading.is_usable() => lines.push(format!("Temperature: {}", reading.value)),
        Some(_) => lines.push("Temperature: unreadable".to_string()),
        None => {},
    }

    if snapshot.state == DeviceState::Reconnecting {
        lines.push(format!("Reconnect attempt {}", snapshot.reconnect_attempt));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::decoder::Reading;
    use crate::device::session::{ConnectionSession, SessionSettings};
    use crate::device::types::Peripheral;

    fn snapshot() -> SessionSnapshot {
        ConnectionSession::new(SessionSettings::default()).snapshot()
    }

    #[test]
    fn empty_list() {
        assert_eq!(render_peripherals(&snapshot()), "No devices to show");
    }

    #[test]
    fn numbered_list() {
        let mut snapshot = snapshot();
        snapshot.discovered = vec![Peripheral::new("id-1", Some("a::beverage_notifier"), -50)];

        assert_eq!(render_peripherals(&snapshot), "1. a::beverage_notifier RSSI: -50 ID: id-1");
    }

    #[test]
    fn status_with_reading() {
        let mut snapshot = snapshot();
        snapshot.status = Some("Last update: 18".to_string());
        snapshot.last_reading = Some(Reading::new("id-1", b"18"));

        assert_eq!(render_snapshot(&snapshot), "[Idle] Last update: 18\nTemperature: 18");
    }
}
