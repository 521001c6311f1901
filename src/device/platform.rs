use std::pin::Pin;
use std::time::Duration;
use async_trait::async_trait;
use futures::Stream;

use crate::device::types::{Peripheral, ServiceDescriptor};
use crate::error::PlatformError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub autoconnect: bool,
}

/// Unsolicited events from the BLE stack, each correlated to a peripheral by its identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    PeripheralDiscovered(Peripheral),
    ScanStopped,
    PeripheralDisconnected { id: String },
    ValueUpdated { id: String, characteristic: String, value: Vec<u8> },
}

pub type PlatformEventStream = Pin<Box<dyn Stream<Item = PlatformEvent> + Send>>;

/// The BLE stack as seen by the session. Every call either completes or fails with a
/// `PlatformError`; results of long running operations arrive as `PlatformEvent`s.
#[async_trait]
pub trait BlePlatform: Send + Sync {
    async fn start(&self) -> Result<(), PlatformError>;

    /// Starts a scan that stops by itself after `duration`, emitting `ScanStopped`.
    async fn scan(&self, filters: &[String], duration: Duration, allow_duplicates: bool) -> Result<(), PlatformError>;

    async fn stop_scan(&self) -> Result<(), PlatformError>;

    async fn connect(&self, id: &str, options: ConnectOptions) -> Result<(), PlatformError>;

    async fn disconnect(&self, id: &str) -> Result<(), PlatformError>;

    async fn create_bond(&self, id: &str) -> Result<(), PlatformError>;

    async fn retrieve_services(&self, id: &str) -> Result<ServiceDescriptor, PlatformError>;

    async fn start_notification(&self, id: &str, service: &str, characteristic: &str) -> Result<(), PlatformError>;

    /// A fresh stream of platform events. Dropping it detaches the listener.
    async fn events(&self) -> Result<PlatformEventStream, PlatformError>;
}
