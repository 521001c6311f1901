use std::time::Duration;
use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::config::types::Config;
use crate::device::decoder::Reading;
use crate::device::filter::is_supported;
use crate::device::platform::{ConnectOptions, PlatformEvent};
use crate::device::reconnect::ReconnectPolicy;
use crate::device::resolver::{resolve, ResolvedUuids};
use crate::device::types::{DeviceState, Peripheral, ServiceDescriptor};
use crate::notify::NotificationRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub supported_name: String,
    pub cold_threshold: f64,
    pub scan_duration: Duration,
    pub allow_duplicates: bool,
    pub autoconnect: bool,
    pub reconnect: ReconnectPolicy,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        SessionSettings {
            supported_name: config.supported_name.clone(),
            cold_threshold: config.cold_threshold,
            scan_duration: Duration::from_secs(config.scan_duration_secs),
            allow_duplicates: config.allow_duplicates,
            autoconnect: config.autoconnect,
            reconnect: config.reconnect,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings::from(&Config::default())
    }
}

/// Everything that can move the session: user intents, completions of platform calls and
/// platform events.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    StartScan,
    StopScan,
    Select(String),
    Disconnect,
    ManualNotification,

    ScanStarted,
    ScanFailed(String),
    StopScanSucceeded,
    StopScanFailed(String),
    ConnectSucceeded(String),
    ConnectFailed { id: String, error: String },
    BondSucceeded(String),
    BondFailed { id: String, error: String },
    ServicesRetrieved { id: String, descriptor: ServiceDescriptor },
    ServicesFailed { id: String, error: String },
    NotificationStarted(String),
    NotificationFailed { id: String, error: String },
    DisconnectSucceeded(Peripheral),
    DisconnectFailed { id: String, error: String },
    ReconnectTimerFired(String),

    Platform(PlatformEvent),
}

/// Work the session asks its owner to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Scan { filters: Vec<String>, duration: Duration, allow_duplicates: bool },
    StopScan,
    Connect { id: String, options: ConnectOptions },
    Disconnect(Peripheral),
    /// Disconnects a link nobody is interested in anymore, without reporting back.
    DropLink(String),
    CreateBond(String),
    RetrieveServices(String),
    StartNotification { id: String, service: String, characteristic: String },
    ScheduleReconnect { id: String, delay: Duration },
    Notify(NotificationRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: DeviceState,
    pub status: Option<String>,
    pub discovered: Vec<Peripheral>,
    pub target: Option<Peripheral>,
    pub resolved: ResolvedUuids,
    pub last_reading: Option<Reading>,
    pub reconnect_attempt: u32,
}

impl SessionSnapshot {
    pub fn is_scanning(&self) -> bool {
        self.state == DeviceState::Scanning
    }

    pub fn scan_enabled(&self) -> bool {
        !self.is_scanning() && !self.state.has_active_session()
    }
}

/// The connection lifecycle of one app run.
///
/// `handle` applies one input and returns the commands it implies. It never performs I/O, so
/// every transition can be driven and inspected directly.
pub struct ConnectionSession {
    settings: SessionSettings,
    state: DeviceState,
    discovered: IndexMap<String, Peripheral>,
    target: Option<Peripheral>,
    resolved: ResolvedUuids,
    last_reading: Option<Reading>,
    reconnect_attempt: u32,
    status: Option<String>,
}

impl ConnectionSession {
    pub fn new(settings: SessionSettings) -> Self {
        ConnectionSession {
            settings,
            state: DeviceState::Idle,
            discovered: IndexMap::new(),
            target: None,
            resolved: ResolvedUuids::default(),
            last_reading: None,
            reconnect_attempt: 0,
            status: None,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn discovered(&self) -> impl Iterator<Item = &Peripheral> {
        self.discovered.values()
    }

    pub fn target(&self) -> Option<&Peripheral> {
        self.target.as_ref()
    }

    pub fn resolved(&self) -> &ResolvedUuids {
        &self.resolved
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            status: self.status.clone(),
            discovered: self.discovered.values().cloned().collect(),
            target: self.target.clone(),
            resolved: self.resolved.clone(),
            last_reading: self.last_reading.clone(),
            reconnect_attempt: self.reconnect_attempt,
        }
    }

    /// Records a status message without logging it.
    pub fn note(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    fn set_status(&mut self, status: &str) {
        info!("{}", status);
        self.status = Some(status.to_string());
    }

    fn set_state(&mut self, state: DeviceState) {
        if self.state != state {
            debug!("Session state {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn is_target(&self, id: &str) -> bool {
        self.target.as_ref().map(|target| target.id == id).unwrap_or(false)
    }

    pub fn handle(&mut self, input: SessionInput) -> Vec<SessionCommand> {
        match input {
            SessionInput::StartScan => self.start_scan(),
            SessionInput::StopScan => self.stop_scan(),
            SessionInput::Select(id) => self.select(&id),
            SessionInput::Disconnect => self.disconnect(),
            SessionInput::ManualNotification => vec![SessionCommand::Notify(NotificationRequest::default())],

            SessionInput::ScanStarted => {
                if self.state == DeviceState::Scanning {
                    self.set_status("Scanning");
                }
                vec![]
            },
            SessionInput::ScanFailed(error) => {
                warn!("Scan failed: {}", error);
                if self.state == DeviceState::Scanning {
                    self.finish_scan();
                }
                self.set_status("Scanning error");
                vec![]
            },
            SessionInput::StopScanSucceeded => {
                self.set_status("Scanning stop");
                vec![]
            },
            SessionInput::StopScanFailed(error) => {
                warn!("Stopping scan failed: {}", error);
                self.set_status("Scanning stop error");
                vec![]
            },
            SessionInput::ConnectSucceeded(id) => self.connect_succeeded(id),
            SessionInput::ConnectFailed { id, error } => self.connect_failed(&id, &error),
            SessionInput::BondSucceeded(id) => {
                if self.is_target(&id) {
                    self.set_status("Bonding success");
                }
                vec![]
            },
            SessionInput::BondFailed { id, error } => {
                warn!("Bonding with {} failed: {}", id, error);
                if self.is_target(&id) {
                    self.set_status("Bonding failed");
                }
                vec![]
            },
            SessionInput::ServicesRetrieved { id, descriptor } => self.services_retrieved(&id, &descriptor),
            SessionInput::ServicesFailed { id, error } => {
                warn!("Retrieving services of {} failed: {}", id, error);
                if self.state == DeviceState::ServiceDiscovery && self.is_target(&id) {
                    self.set_state(DeviceState::Connected);
                    self.set_status("Service discovery error");
                }
                vec![]
            },
            SessionInput::NotificationStarted(id) => {
                if self.state == DeviceState::ServiceDiscovery && self.is_target(&id) {
                    self.set_state(DeviceState::Subscribed);
                    self.set_status("Subscribed");
                }
                vec![]
            },
            SessionInput::NotificationFailed { id, error } => {
                warn!("Starting notifications on {} failed: {}", id, error);
                if self.state == DeviceState::ServiceDiscovery && self.is_target(&id) {
                    self.set_state(DeviceState::Connected);
                    self.set_status("Subscribe error");
                }
                vec![]
            },
            SessionInput::DisconnectSucceeded(peripheral) => {
                self.set_status("Disconnect success");
                vec![SessionCommand::Notify(NotificationRequest::new(
                    format!("Disconnected from: {}", peripheral.display_name()),
                    "Successfully disconnected from BLE device",
                ))]
            },
            SessionInput::DisconnectFailed { id, error } => {
                warn!("Disconnecting from {} failed: {}", id, error);
                self.set_status("Disconnect error");
                vec![]
            },
            SessionInput::ReconnectTimerFired(id) => self.reconnect_timer_fired(id),

            SessionInput::Platform(event) => match event {
                PlatformEvent::PeripheralDiscovered(peripheral) => self.discover(peripheral),
                PlatformEvent::ScanStopped => self.scan_stopped(),
                PlatformEvent::PeripheralDisconnected { id } => self.lost(&id),
                PlatformEvent::ValueUpdated { id, characteristic, value } => self.value_updated(&id, &characteristic, &value),
            },
        }
    }

    fn start_scan(&mut self) -> Vec<SessionCommand> {
        match self.state {
            DeviceState::Idle | DeviceState::Discovered | DeviceState::Disconnected => {},
            DeviceState::Scanning => {
                debug!("Already scanning");
                return vec![];
            },
            _ => {
                debug!("Scan ignored, disconnect the current device first");
                return vec![];
            },
        }

        self.discovered.clear();
        self.target = None;
        self.resolved = ResolvedUuids::default();
        self.last_reading = None;
        self.set_state(DeviceState::Scanning);
        info!("Scanning started");

        vec![SessionCommand::Scan {
            filters: vec![],
            duration: self.settings.scan_duration,
            allow_duplicates: self.settings.allow_duplicates,
        }]
    }

    fn finish_scan(&mut self) {
        if self.discovered.is_empty() {
            self.set_state(DeviceState::Idle);
        } else {
            self.set_state(DeviceState::Discovered);
        }
    }

    fn stop_scan(&mut self) -> Vec<SessionCommand> {
        if self.state != DeviceState::Scanning {
            return vec![];
        }

        self.finish_scan();
        vec![SessionCommand::StopScan]
    }

    fn scan_stopped(&mut self) -> Vec<SessionCommand> {
        if self.state == DeviceState::Scanning {
            self.finish_scan();
            self.set_status("Stopped scanning");
        }
        vec![]
    }

    fn discover(&mut self, peripheral: Peripheral) -> Vec<SessionCommand> {
        if self.state != DeviceState::Scanning {
            return vec![];
        }

        if !is_supported(peripheral.name.as_deref(), &self.settings.supported_name) {
            return vec![];
        }

        debug!("Discovered {} ({}) rssi {}", peripheral.display_name(), peripheral.id, peripheral.rssi);
        self.discovered.insert(peripheral.id.clone(), peripheral);
        self.set_status("Device found");
        vec![]
    }

    fn connect_command(&self, id: &str) -> SessionCommand {
        SessionCommand::Connect {
            id: id.to_string(),
            options: ConnectOptions { autoconnect: self.settings.autoconnect },
        }
    }

    fn select(&mut self, id: &str) -> Vec<SessionCommand> {
        match self.state {
            DeviceState::Idle | DeviceState::Discovered | DeviceState::Disconnected => {},
            _ => {
                debug!("Select ignored in state {}", self.state);
                return vec![];
            },
        }

        let peripheral = match self.discovered.get(id) {
            Some(peripheral) => peripheral.clone(),
            None => match self.target.as_ref().filter(|target| target.id == id) {
                Some(target) => target.clone(),
                None => {
                    warn!("Select ignored, unknown peripheral {}", id);
                    return vec![];
                },
            },
        };

        info!("Connecting to {} ({})", peripheral.display_name(), peripheral.id);
        self.target = Some(peripheral);
        self.resolved = ResolvedUuids::default();
        self.reconnect_attempt = 0;
        self.set_state(DeviceState::Connecting);
        vec![self.connect_command(id)]
    }

    fn connect_succeeded(&mut self, id: String) -> Vec<SessionCommand> {
        let waiting = matches!(self.state, DeviceState::Connecting | DeviceState::Reconnecting);
        if !waiting || !self.is_target(&id) {
            info!("Connection to {} is no longer wanted, dropping it", id);
            return vec![SessionCommand::DropLink(id)];
        }

        let name = self
            .target
            .as_ref()
            .map(|target| target.display_name().to_string())
            .unwrap_or_default();

        self.reconnect_attempt = 0;
        self.set_state(DeviceState::Connected);
        self.set_status("Connect success");

        // service discovery starts right away, Connected is only kept when it fails
        self.set_state(DeviceState::ServiceDiscovery);

        vec![
            SessionCommand::CreateBond(id.clone()),
            SessionCommand::Notify(NotificationRequest::new(
                format!("Connected to: {}", name),
                "Successfully connected to BLE device",
            )),
            SessionCommand::RetrieveServices(id),
        ]
    }

    fn connect_failed(&mut self, id: &str, error: &str) -> Vec<SessionCommand> {
        warn!("Connecting to {} failed: {}", id, error);

        if !self.is_target(id) {
            return vec![];
        }

        match self.state {
            DeviceState::Connecting => {
                self.target = None;
                self.resolved = ResolvedUuids::default();
                self.set_state(DeviceState::Idle);
                self.set_status("Connect error");
                vec![]
            },
            DeviceState::Reconnecting => {
                self.set_status("Reconnect error");
                self.schedule_reconnect(id.to_string())
            },
            _ => vec![],
        }
    }

    fn services_retrieved(&mut self, id: &str, descriptor: &ServiceDescriptor) -> Vec<SessionCommand> {
        if self.state != DeviceState::ServiceDiscovery || !self.is_target(id) {
            return vec![];
        }

        self.resolved = resolve(descriptor);

        match self.resolved.pair() {
            Some((service, characteristic)) => {
                info!("Subscribing to characteristic {} {}", service, characteristic);
                vec![SessionCommand::StartNotification {
                    id: id.to_string(),
                    service: service.to_string(),
                    characteristic: characteristic.to_string(),
                }]
            },
            None => {
                // connected but no readings will arrive
                warn!("No characteristic to subscribe to on {}", id);
                self.set_state(DeviceState::Connected);
                vec![]
            },
        }
    }

    fn value_updated(&mut self, id: &str, characteristic: &str, value: &[u8]) -> Vec<SessionCommand> {
        let receiving = match self.state {
            DeviceState::Subscribed => true,
            DeviceState::ServiceDiscovery => self.resolved.pair().is_some(),
            _ => false,
        };

        if !receiving || !self.is_target(id) {
            return vec![];
        }

        if let Some(expected) = &self.resolved.characteristic {
            if !expected.eq_ignore_ascii_case(characteristic) {
                debug!("Ignoring update of characteristic {}", characteristic);
                return vec![];
            }
        }

        let reading = Reading::new(id, value);
        let mut commands = vec![];

        if reading.is_usable() {
            self.set_status(&format!("Last update: {}", reading.value));

            if reading.value < self.settings.cold_threshold {
                commands.push(SessionCommand::Notify(NotificationRequest::new(
                    "Your beverage is getting cold",
                    format!(
                        "Temperature dropped to {} (threshold {})",
                        reading.value, self.settings.cold_threshold
                    ),
                )));
            }
        } else {
            warn!("Unreadable value from {}: {:?}", id, String::from_utf8_lossy(value));
            self.set_status("Last update: unreadable value");
        }

        self.last_reading = Some(reading);
        commands
    }

    fn lost(&mut self, id: &str) -> Vec<SessionCommand> {
        let connected = matches!(
            self.state,
            DeviceState::Connected | DeviceState::ServiceDiscovery | DeviceState::Subscribed
        );
        if !connected || !self.is_target(id) {
            debug!("Ignoring disconnect of {}", id);
            return vec![];
        }

        self.last_reading = None;
        self.set_state(DeviceState::Disconnected);
        self.set_status("Device disconnected");
        self.schedule_reconnect(id.to_string())
    }

    fn schedule_reconnect(&mut self, id: String) -> Vec<SessionCommand> {
        self.reconnect_attempt += 1;

        match self.settings.reconnect.delay_for(self.reconnect_attempt) {
            None => {
                self.set_state(DeviceState::Disconnected);
                self.set_status("Reconnect gave up");
                vec![]
            },
            Some(delay) => {
                info!("Reconnect attempt {} to {} in {:?}", self.reconnect_attempt, id, delay);
                self.set_state(DeviceState::Reconnecting);
                self.note("Reconnecting");

                if delay.is_zero() {
                    vec![self.connect_command(&id)]
                } else {
                    vec![SessionCommand::ScheduleReconnect { id, delay }]
                }
            },
        }
    }

    fn reconnect_timer_fired(&mut self, id: String) -> Vec<SessionCommand> {
        // the session may have moved on while the timer was pending
        if self.state != DeviceState::Reconnecting || !self.is_target(&id) {
            debug!("Stale reconnect timer for {}", id);
            return vec![];
        }

        vec![self.connect_command(&id)]
    }

    fn disconnect(&mut self) -> Vec<SessionCommand> {
        let target = match self.target.take() {
            Some(target) => target,
            None => return vec![],
        };

        let commands = match self.state {
            DeviceState::Connecting
            | DeviceState::Connected
            | DeviceState::ServiceDiscovery
            | DeviceState::Subscribed => vec![SessionCommand::Disconnect(target)],
            DeviceState::Reconnecting | DeviceState::Disconnected => {
                // the link is already down, only a pending connect attempt may still complete
                self.set_status("Disconnect success");
                if self.state == DeviceState::Reconnecting {
                    vec![SessionCommand::DropLink(target.id)]
                } else {
                    vec![]
                }
            },
            _ => {
                self.target = Some(target);
                return vec![];
            },
        };

        self.resolved = ResolvedUuids::default();
        self.last_reading = None;
        self.reconnect_attempt = 0;
        self.set_state(DeviceState::Idle);
        commands
    }
}
