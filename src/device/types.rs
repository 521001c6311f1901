use std::fmt;

/// A discovered advertisement, keyed by the platform identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    pub id: String,
    pub name: Option<String>,
    pub rssi: i16,
    pub services: Option<Vec<String>>,
}

impl Peripheral {
    pub fn new(id: impl Into<String>, name: Option<&str>, rssi: i16) -> Self {
        Peripheral {
            id: id.into(),
            name: name.map(String::from),
            rssi,
            services: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("NONE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub uuid: String,
}

/// A characteristic as reported after service discovery, tagged with the service that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicRecord {
    pub service: String,
    pub characteristic: String,
}

/// Services and characteristics of a connected peripheral. Either list may be missing when the
/// platform could not report it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub services: Option<Vec<ServiceRecord>>,
    pub characteristics: Option<Vec<CharacteristicRecord>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Scanning,
    Discovered,
    Connecting,
    Connected,
    ServiceDiscovery,
    Subscribed,
    Disconnected,
    Reconnecting,
}

impl DeviceState {
    /// A session is active from the first connect attempt until it is torn down or given up.
    /// Scanning and selecting another peripheral are disabled while it is.
    pub fn has_active_session(&self) -> bool {
        matches!(
            self,
            DeviceState::Connecting
                | DeviceState::Connected
                | DeviceState::ServiceDiscovery
                | DeviceState::Subscribed
                | DeviceState::Reconnecting
        )
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            DeviceState::Idle => "Idle",
            DeviceState::Scanning => "Scanning",
            DeviceState::Discovered => "Discovered",
            DeviceState::Connecting => "Connecting",
            DeviceState::Connected => "Connected",
            DeviceState::ServiceDiscovery => "Discovering services",
            DeviceState::Subscribed => "Subscribed",
            DeviceState::Disconnected => "Disconnected",
            DeviceState::Reconnecting => "Reconnecting",
        };

        write!(f, "{}", result)
    }
}
