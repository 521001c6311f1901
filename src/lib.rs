use std::env;
use std::sync::Arc;
use log::{info, warn};
use tokio::spawn;
use tokio_util::sync::CancellationToken;

use crate::args::{Args, NotifierKind};
use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::console::run_console;
use crate::device::btle::BtlePlatform;
use crate::device::coordinator::Coordinator;
use crate::device::platform::BlePlatform;
use crate::device::session::SessionSettings;
use crate::error::{AppRunError, ConfigError};
use crate::notify::desktop::DesktopNotifier;
use crate::notify::log_notifier::LogNotifier;
use crate::notify::NotificationScheduler;

pub mod args;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod notify;

pub fn init_logging(level: log::LevelFilter) -> Result<(), AppRunError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        let log_file = fern::log_file(log_file).map_err(|source| AppRunError::LogFile { source })?;
        dispatch = dispatch.chain(log_file);
    }

    dispatch.apply()?;
    Ok(())
}

async fn load_config(config_io: &ConfigIO) -> Result<Config, ConfigError> {
    match config_io.read().await {
        Ok(config) => Ok(config),
        Err(err) if err.is_file_not_found_error() => {
            // this is probably the first start of the app
            info!("Config file not found, using defaults");
            Ok(Config::default())
        },
        Err(err) => Err(err),
    }
}

pub async fn run(args: Args) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(args.config.as_deref())?;

    // obtain an exclusive file lock so that this config file is used by only one instance of
    // this application.
    let mut locker = config_io.locker()?;
    let _guard = locker.lock()?;

    let mut config = load_config(&config_io).await?;
    // writes the defaults on first start so there is a file to edit
    if let Err(err) = config_io.save(&config).await {
        warn!("Failed to save config: {}", err);
    }
    args.apply(&mut config);
    config.sanitize();
    info!("Cold threshold {}, supported name {:?}", config.cold_threshold, config.supported_name);

    let platform: Arc<dyn BlePlatform> = Arc::new(BtlePlatform::new());
    let notifier: Arc<dyn NotificationScheduler> = match args.notifier {
        NotifierKind::Desktop => Arc::new(DesktopNotifier::new(config.notifications_enabled)),
        NotifierKind::Log => Arc::new(LogNotifier::new(config.notifications_enabled)),
    };

    let (coordinator, handle) = Coordinator::new(platform, notifier, SessionSettings::from(&config));
    let cancel = CancellationToken::new();
    let session_task = spawn(coordinator.run(cancel.child_token()));

    let console_result = run_console(handle, cancel.clone()).await;
    cancel.cancel();

    session_task.await?;
    console_result
}
