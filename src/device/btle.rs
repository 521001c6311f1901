use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral as BtlePeripheral, PeripheralId};
use futures::{stream, Stream, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::sync::{broadcast, Mutex};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::device::platform::{BlePlatform, ConnectOptions, PlatformEvent, PlatformEventStream};
use crate::device::types::{CharacteristicRecord, Peripheral, ServiceDescriptor, ServiceRecord};
use crate::error::PlatformError;

const EVENT_CAPACITY: usize = 64;

struct Inner {
    manager: Mutex<Option<Manager>>,
    adapter: Mutex<Option<Adapter>>,
    peripherals: Mutex<HashMap<String, BtlePeripheral>>,
    // name last reported for each peripheral during the current scan
    reported: Mutex<HashMap<String, Option<String>>>,
    // events that btleplug does not emit itself: scan timeouts and characteristic values
    local_events: broadcast::Sender<PlatformEvent>,
    scan_timer: Mutex<Option<CancellationToken>>,
    notification_tasks: Mutex<HashMap<String, CancellationToken>>,
    allow_duplicates: AtomicBool,
}

/// `BlePlatform` on top of btleplug, using the first adapter the OS reports.
#[derive(Clone)]
pub struct BtlePlatform {
    inner: Arc<Inner>,
}

impl Default for BtlePlatform {
    fn default() -> Self {
        BtlePlatform::new()
    }
}

impl BtlePlatform {
    pub fn new() -> Self {
        let (local_events, _) = broadcast::channel(EVENT_CAPACITY);

        BtlePlatform {
            inner: Arc::new(Inner {
                manager: Mutex::new(None),
                adapter: Mutex::new(None),
                peripherals: Mutex::new(HashMap::new()),
                reported: Mutex::new(HashMap::new()),
                local_events,
                scan_timer: Mutex::new(None),
                notification_tasks: Mutex::new(HashMap::new()),
                allow_duplicates: AtomicBool::new(false),
            }),
        }
    }
}

fn peripheral_record(id: &PeripheralId, properties: Option<PeripheralProperties>) -> Peripheral {
    let mut record = Peripheral::new(id.to_string(), None, 0);

    if let Some(properties) = properties {
        record.name = properties.local_name;
        record.rssi = properties.rssi.unwrap_or(0);
        if !properties.services.is_empty() {
            record.services = Some(properties.services.iter().map(Uuid::to_string).collect());
        }
    }

    record
}

/// Whether a sighting is worth passing on. Names often arrive in a later update (scan response),
/// so a changed name is always reported, other repeats only when duplicates are wanted.
fn worth_reporting(previous: Option<&Option<String>>, name: Option<&str>, allow_duplicates: bool) -> bool {
    match previous {
        None => true,
        Some(previous) => allow_duplicates || previous.as_deref() != name,
    }
}

fn local_event_stream(receiver: broadcast::Receiver<PlatformEvent>) -> impl Stream<Item = PlatformEvent> {
    stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((event, receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Platform event listener lagged, {} events skipped", skipped);
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

impl Inner {
    async fn adapter(&self) -> Result<Adapter, PlatformError> {
        self.adapter.lock().await.clone().ok_or(PlatformError::NotStarted)
    }

    async fn peripheral(&self, id: &str) -> Result<BtlePeripheral, PlatformError> {
        if let Some(peripheral) = self.peripherals.lock().await.get(id) {
            return Ok(peripheral.clone());
        }

        // not seen during this run's scans, ask the adapter
        let adapter = self.adapter().await?;
        for peripheral in adapter.peripherals().await? {
            if peripheral.id().to_string() == id {
                self.peripherals.lock().await.insert(id.to_string(), peripheral.clone());
                return Ok(peripheral);
            }
        }

        Err(PlatformError::UnknownPeripheral { id: id.to_string() })
    }

    async fn stop_notifications(&self, id: &str) {
        if let Some(cancel) = self.notification_tasks.lock().await.remove(id) {
            cancel.cancel();
        }
    }

    async fn translate(&self, event: CentralEvent) -> Option<PlatformEvent> {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => self.discovered(&id).await,
            CentralEvent::DeviceDisconnected(id) => {
                let id = id.to_string();
                self.stop_notifications(&id).await;
                Some(PlatformEvent::PeripheralDisconnected { id })
            },
            _ => None,
        }
    }

    async fn discovered(&self, id: &PeripheralId) -> Option<PlatformEvent> {
        let adapter = self.adapter().await.ok()?;
        let peripheral = match adapter.peripheral(id).await {
            Ok(peripheral) => peripheral,
            Err(err) => {
                warn!("Could not look up discovered peripheral: {:?}", err);
                return None;
            },
        };

        let properties = match peripheral.properties().await {
            Ok(properties) => properties,
            Err(err) => {
                warn!("Could not query peripheral for properties: {:?}", err);
                None
            },
        };

        let record = peripheral_record(id, properties);
        self.peripherals.lock().await.insert(record.id.clone(), peripheral);

        let previous = self.reported.lock().await.insert(record.id.clone(), record.name.clone());
        if !worth_reporting(previous.as_ref(), record.name.as_deref(), self.allow_duplicates.load(Ordering::Relaxed)) {
            return None;
        }
        Some(PlatformEvent::PeripheralDiscovered(record))
    }

    fn read_notifications_task(&self, cancel: CancellationToken, id: String, peripheral: BtlePeripheral, characteristic: Uuid) {
        let events = self.local_events.clone();

        spawn(async move {
            let mut notification_stream = match peripheral.notifications().await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!("Failed to open notification stream of {}: {:?}", id, err);
                    return;
                },
            };

            'mainloop: loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        break 'mainloop;
                    },
                    data = notification_stream.next() => match data {
                        Some(data) if data.uuid == characteristic => {
                            // nobody listening is not an error
                            let _ = events.send(PlatformEvent::ValueUpdated {
                                id: id.clone(),
                                characteristic: data.uuid.to_string(),
                                value: data.value,
                            });
                        },
                        Some(_) => {},
                        None => {
                            debug!("Notification stream of {} ended", id);
                            break 'mainloop;
                        },
                    },
                }
            }
        });
    }
}

#[async_trait]
impl BlePlatform for BtlePlatform {
    async fn start(&self) -> Result<(), PlatformError> {
        let manager = Manager::new().await?;
        let adapter = manager.adapters().await?.into_iter().next().ok_or(PlatformError::NoAdapter)?;
        info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));

        *self.inner.adapter.lock().await = Some(adapter);
        *self.inner.manager.lock().await = Some(manager);
        Ok(())
    }

    async fn scan(&self, filters: &[String], duration: Duration, allow_duplicates: bool) -> Result<(), PlatformError> {
        let adapter = self.inner.adapter().await?;
        let services = filters
            .iter()
            .map(|uuid| Uuid::from_str(uuid))
            .collect::<Result<Vec<_>, _>>()?;

        self.inner.allow_duplicates.store(allow_duplicates, Ordering::Relaxed);
        self.inner.peripherals.lock().await.clear();
        self.inner.reported.lock().await.clear();
        adapter.start_scan(ScanFilter { services }).await?;

        let cancel = CancellationToken::new();
        if let Some(previous) = self.inner.scan_timer.lock().await.replace(cancel.clone()) {
            previous.cancel();
        }

        let events = self.inner.local_events.clone();
        spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {},
                _ = sleep(duration) => {
                    if let Err(err) = adapter.stop_scan().await {
                        warn!("Failed to stop scan: {:?}", err);
                    }
                    let _ = events.send(PlatformEvent::ScanStopped);
                },
            }
        });

        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), PlatformError> {
        if let Some(timer) = self.inner.scan_timer.lock().await.take() {
            timer.cancel();
        }

        self.inner.adapter().await?.stop_scan().await?;
        let _ = self.inner.local_events.send(PlatformEvent::ScanStopped);
        Ok(())
    }

    async fn connect(&self, id: &str, options: ConnectOptions) -> Result<(), PlatformError> {
        let peripheral = self.inner.peripheral(id).await?;
        // btleplug has no background connect; the session reconnects on its own
        debug!("Connecting to {} (autoconnect: {})", id, options.autoconnect);

        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        Ok(())
    }

    async fn disconnect(&self, id: &str) -> Result<(), PlatformError> {
        self.inner.stop_notifications(id).await;
        self.inner.peripheral(id).await?.disconnect().await?;
        Ok(())
    }

    async fn create_bond(&self, id: &str) -> Result<(), PlatformError> {
        // Pairing is negotiated by the OS when the peripheral requires it; there is no explicit
        // bond call in btleplug. Succeed when the link is up.
        let peripheral = self.inner.peripheral(id).await?;
        if peripheral.is_connected().await? {
            info!("Bond with {} is handled by the OS", id);
            Ok(())
        } else {
            Err(PlatformError::NotConnected { id: id.to_string() })
        }
    }

    async fn retrieve_services(&self, id: &str) -> Result<ServiceDescriptor, PlatformError> {
        let peripheral = self.inner.peripheral(id).await?;
        peripheral.discover_services().await?;

        let services = peripheral
            .services()
            .iter()
            .map(|service| ServiceRecord { uuid: service.uuid.to_string() })
            .collect();
        let characteristics = peripheral
            .characteristics()
            .iter()
            .map(|characteristic| CharacteristicRecord {
                service: characteristic.service_uuid.to_string(),
                characteristic: characteristic.uuid.to_string(),
            })
            .collect();

        Ok(ServiceDescriptor {
            services: Some(services),
            characteristics: Some(characteristics),
        })
    }

    async fn start_notification(&self, id: &str, service: &str, characteristic: &str) -> Result<(), PlatformError> {
        let service = Uuid::from_str(service)?;
        let characteristic = Uuid::from_str(characteristic)?;
        let peripheral = self.inner.peripheral(id).await?;

        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|candidate| candidate.uuid == characteristic && candidate.service_uuid == service)
            .ok_or(PlatformError::MissingCharacteristic)?;

        info!("Subscribing to characteristic {:?} {:?}", service, characteristic);
        peripheral.subscribe(&target).await?;

        let cancel = CancellationToken::new();
        if let Some(previous) = self.inner.notification_tasks.lock().await.insert(id.to_string(), cancel.clone()) {
            previous.cancel();
        }
        self.inner.read_notifications_task(cancel, id.to_string(), peripheral, characteristic);
        Ok(())
    }

    async fn events(&self) -> Result<PlatformEventStream, PlatformError> {
        let adapter = self.inner.adapter().await?;
        let inner = self.inner.clone();

        let central = adapter.events().await?.filter_map(move |event| {
            let inner = inner.clone();
            async move { inner.translate(event).await }
        });
        let local = local_event_stream(self.inner.local_events.subscribe());

        Ok(Box::pin(stream::select(central, local)))
    }
}
