//! Controller Handle - lifecycle of the gamepad collector thread
//!
//! gilrs wants to live on one thread, so the collector gets its own OS thread
//! instead of a tokio task. Snapshots leave it through a bounded mpsc channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::event_collector::{CollectorSettings, EventCollector};
use super::snapshot::GamepadSnapshot;
use crate::config::ControllerConfig;

/// Settings for the controller subsystem.
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Sleep between two gilrs polls, in microseconds.
    pub poll_interval_us: u64,

    /// Axis value at which a thumbstick direction reads as pressed.
    pub stick_press_threshold: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            stick_press_threshold: 0.5,
        }
    }
}

impl From<&ControllerConfig> for ControllerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            poll_interval_us: config.poll_interval_us,
            stick_press_threshold: config.stick_press_threshold,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Failed to spawn collector thread: {0}")]
    ThreadError(#[from] std::io::Error),
}

/// Owns the collector thread. Dropping the handle stops it.
pub struct ControllerHandle {
    cancel: CancellationToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl ControllerHandle {
    /// Spawns the collector thread.
    ///
    /// gilrs initialisation happens on the new thread; if it fails the
    /// thread logs the error and exits, and the app keeps running with the
    /// on-screen controls only.
    pub fn spawn(
        settings: Option<ControllerSettings>,
        sender: mpsc::Sender<GamepadSnapshot>,
    ) -> Result<Self, ControllerError> {
        let settings = settings.unwrap_or_default();
        info!("Initializing controller with settings: {:?}", settings);

        let collector_settings = CollectorSettings {
            poll_interval_us: settings.poll_interval_us,
            stick_press_threshold: settings.stick_press_threshold,
        };

        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();
        let thread = std::thread::Builder::new()
            .name("gamepad-collector".to_string())
            .spawn(move || {
                match EventCollector::create(Some(collector_settings), sender) {
                    Ok(collector) => collector.initialize().run_collection_loop(thread_cancel),
                    Err(e) => error!("Gamepad input unavailable: {}", e),
                }
            })?;

        info!("Controller collector thread started");
        Ok(Self {
            cancel,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Gamepad collector thread panicked");
            }
        }
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
