use std::sync::Arc;
use futures::channel::mpsc::{channel, Receiver, SendError, Sender};
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::device::platform::BlePlatform;
use crate::device::session::{ConnectionSession, SessionCommand, SessionInput, SessionSettings, SessionSnapshot};
use crate::error::PlatformError;
use crate::notify::NotificationScheduler;

const INPUT_CAPACITY: usize = 128;

/// Forwards platform events into the session's input channel for as long as it is held.
/// Dropping it, on any path, detaches the listener.
pub struct EventSubscription {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl EventSubscription {
    pub async fn acquire(platform: &dyn BlePlatform, mut sender: Sender<SessionInput>, cancel: CancellationToken) -> Result<Self, PlatformError> {
        let mut events = platform.events().await?;
        let task_cancel = cancel.clone();

        let task = spawn(async move {
            'mainloop: loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        break 'mainloop;
                    },
                    event = events.next() => match event {
                        Some(event) => {
                            if sender.send(SessionInput::Platform(event)).await.is_err() {
                                break 'mainloop;
                            }
                        },
                        None => {
                            info!("Platform event stream ended");
                            break 'mainloop;
                        },
                    },
                }
            }
        });

        Ok(EventSubscription { cancel, task: Some(task) })
    }

    pub async fn release(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!("Platform event listener failed: {:?}", err);
            }
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        debug!("Removing platform event listeners");
        self.cancel.cancel();
    }
}

/// Sends user intents to a running `Coordinator` and observes its session.
#[derive(Clone)]
pub struct CoordinatorHandle {
    sender: Sender<SessionInput>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl CoordinatorHandle {
    pub async fn send(&mut self, input: SessionInput) -> Result<(), SendError> {
        self.sender.send(input).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

/// Owns the `ConnectionSession` and runs it against a platform.
///
/// Inputs are handled one at a time, in arrival order, from a single channel. Platform calls run
/// as spawned tasks and report back through that same channel, so no transition ever observes
/// another one half done.
pub struct Coordinator {
    platform: Arc<dyn BlePlatform>,
    notifier: Arc<dyn NotificationScheduler>,
    session: ConnectionSession,
    sender: Sender<SessionInput>,
    receiver: Receiver<SessionInput>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl Coordinator {
    pub fn new(platform: Arc<dyn BlePlatform>, notifier: Arc<dyn NotificationScheduler>, settings: SessionSettings) -> (Self, CoordinatorHandle) {
        let session = ConnectionSession::new(settings);
        let (sender, receiver) = channel::<SessionInput>(INPUT_CAPACITY);
        let (snapshots, snapshot_receiver) = watch::channel(session.snapshot());

        let handle = CoordinatorHandle {
            sender: sender.clone(),
            snapshots: snapshot_receiver,
        };

        let coordinator = Coordinator {
            platform,
            notifier,
            session,
            sender,
            receiver,
            snapshots,
        };

        (coordinator, handle)
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let started = match self.platform.start().await {
            Ok(()) => {
                debug!("Bluetooth platform started");
                true
            },
            Err(err) if err.is_permission_denied() => {
                warn!("Bluetooth permission denied: {}", err);
                self.session.note("Bluetooth permission denied");
                false
            },
            Err(err) => {
                warn!("Bluetooth platform could not be started: {}", err);
                self.session.note("Bluetooth unavailable");
                false
            },
        };

        // without events the session still runs, every platform call just fails into a status
        let subscription = match EventSubscription::acquire(self.platform.as_ref(), self.sender.clone(), cancel.child_token()).await {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                warn!("Not listening for platform events: {}", err);
                if started {
                    self.session.note("Bluetooth events unavailable");
                }
                None
            },
        };
        self.publish();

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(input) = self.receiver.next() => {
                    debug!("Session input {:?}", input);
                    let commands = self.session.handle(input);
                    self.publish();

                    for command in commands {
                        self.execute(command, &cancel);
                    }
                },
            }
        }

        if let Some(subscription) = subscription {
            subscription.release().await;
        }
        info!("Session stopped");
    }

    fn execute(&self, command: SessionCommand, cancel: &CancellationToken) {
        let platform = self.platform.clone();
        let mut sender = self.sender.clone();

        match command {
            SessionCommand::Notify(request) => {
                let notifier = self.notifier.clone();
                spawn(async move {
                    if let Err(err) = notifier.schedule_notification(request).await {
                        warn!("Failed to schedule notification: {}", err);
                    }
                });
            },
            SessionCommand::DropLink(id) => {
                spawn(async move {
                    if let Err(err) = platform.disconnect(&id).await {
                        warn!("Failed to drop link to {}: {}", id, err);
                    }
                });
            },
            SessionCommand::ScheduleReconnect { id, delay } => {
                let cancel = cancel.clone();
                spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {},
                        _ = sleep(delay) => {
                            // the session decides at fire time whether this is still wanted
                            let _ = sender.send(SessionInput::ReconnectTimerFired(id)).await;
                        },
                    }
                });
            },
            command => {
                spawn(async move {
                    if let Some(input) = call_platform(platform.as_ref(), command).await {
                        // the receiver is gone once the coordinator stopped
                        let _ = sender.send(input).await;
                    }
                });
            },
        }
    }
}

async fn call_platform(platform: &dyn BlePlatform, command: SessionCommand) -> Option<SessionInput> {
    let input = match command {
        SessionCommand::Scan { filters, duration, allow_duplicates } => {
            match platform.scan(&filters, duration, allow_duplicates).await {
                Ok(()) => SessionInput::ScanStarted,
                Err(err) => SessionInput::ScanFailed(err.to_string()),
            }
        },
        SessionCommand::StopScan => match platform.stop_scan().await {
            Ok(()) => SessionInput::StopScanSucceeded,
            Err(err) => SessionInput::StopScanFailed(err.to_string()),
        },
        SessionCommand::Connect { id, options } => match platform.connect(&id, options).await {
            Ok(()) => SessionInput::ConnectSucceeded(id),
            Err(err) => SessionInput::ConnectFailed { id, error: err.to_string() },
        },
        SessionCommand::Disconnect(peripheral) => match platform.disconnect(&peripheral.id).await {
            Ok(()) => SessionInput::DisconnectSucceeded(peripheral),
            Err(err) => SessionInput::DisconnectFailed { id: peripheral.id, error: err.to_string() },
        },
        SessionCommand::CreateBond(id) => match platform.create_bond(&id).await {
            Ok(()) => SessionInput::BondSucceeded(id),
            Err(err) => SessionInput::BondFailed { id, error: err.to_string() },
        },
        SessionCommand::RetrieveServices(id) => match platform.retrieve_services(&id).await {
            Ok(descriptor) => SessionInput::ServicesRetrieved { id, descriptor },
            Err(err) => SessionInput::ServicesFailed { id, error: err.to_string() },
        },
        SessionCommand::StartNotification { id, service, characteristic } => {
            match platform.start_notification(&id, &service, &characteristic).await {
                Ok(()) => SessionInput::NotificationStarted(id),
                Err(err) => SessionInput::NotificationFailed { id, error: err.to_string() },
            }
        },
        // not platform calls
        SessionCommand::Notify(_) | SessionCommand::DropLink(_) | SessionCommand::ScheduleReconnect { .. } => return None,
    };

    Some(input)
}
