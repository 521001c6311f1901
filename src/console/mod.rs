//! Interactive terminal front-end: one command per line on stdin, session updates on stdout.

pub mod command;
pub mod render;

use log::{debug, warn};
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::spawn;
use tokio_util::sync::CancellationToken;

use crate::console::command::{parse_command, ConsoleCommand, HELP};
use crate::console::render::{render_peripherals, render_snapshot, status_line};
use crate::device::coordinator::CoordinatorHandle;
use crate::device::session::{SessionInput, SessionSnapshot};
use crate::error::AppRunError;

/// Resolves a `connect` argument: a 1-based position in the discovered list, or an identifier.
pub fn select_target(snapshot: &SessionSnapshot, argument: &str) -> Option<String> {
    if let Ok(index) = argument.parse::<usize>() {
        if index >= 1 {
            if let Some(peripheral) = snapshot.discovered.get(index - 1) {
                return Some(peripheral.id.clone());
            }
        }
    }

    let known = snapshot.discovered.iter().chain(snapshot.target.iter());
    for peripheral in known {
        if peripheral.id == argument {
            return Some(peripheral.id.clone());
        }
    }

    None
}

fn watch_session(handle: &CoordinatorHandle, cancel: CancellationToken) {
    let mut snapshots = handle.snapshots();

    spawn(async move {
        let mut previous = status_line(&snapshots.borrow());

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break 'mainloop;
                    }

                    let line = status_line(&snapshots.borrow_and_update());
                    if line != previous {
                        println!("{}", line);
                        previous = line;
                    }
                },
            }
        }
    });
}

pub async fn run_console(mut handle: CoordinatorHandle, cancel: CancellationToken) -> Result<(), AppRunError> {
    println!("{}", HELP);
    watch_session(&handle, cancel.clone());

    let mut lines = BufReader::new(stdin()).lines();

    'mainloop: loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break 'mainloop,
            line = lines.next_line() => line?,
        };

        // stdin closed
        let Some(line) = line else { break 'mainloop };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(err) => {
                println!("{}", err);
                continue;
            },
        };
        debug!("Console command {:?}", command);

        let snapshot = handle.snapshot();
        let input = match command {
            ConsoleCommand::Scan => {
                if !snapshot.scan_enabled() {
                    println!("Disconnect previous device before searching");
                    continue;
                }
                SessionInput::StartScan
            },
            ConsoleCommand::Stop => SessionInput::StopScan,
            ConsoleCommand::Connect(argument) => match select_target(&snapshot, &argument) {
                Some(id) => SessionInput::Select(id),
                None => {
                    println!("No device {}", argument);
                    continue;
                },
            },
            ConsoleCommand::Disconnect => SessionInput::Disconnect,
            ConsoleCommand::Notify => SessionInput::ManualNotification,
            ConsoleCommand::List => {
                println!("{}", render_peripherals(&snapshot));
                continue;
            },
            ConsoleCommand::Status => {
                println!("{}", render_snapshot(&snapshot));
                continue;
            },
            ConsoleCommand::Help => {
                println!("{}", HELP);
                continue;
            },
            ConsoleCommand::Quit => break 'mainloop,
        };

        if let Err(err) = handle.send(input).await {
            warn!("Session is no longer running: {}", err);
            break 'mainloop;
        }
    }

    Ok(())
}
