use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::snapshot::{Directions, GamepadSnapshot};

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub poll_interval_us: u64,
    pub stick_press_threshold: f32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            stick_press_threshold: 0.5,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send snapshot: {0}")]
    SnapshotSendError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    // Only events from this pad are sampled
    active_gamepad: Option<GamepadId>,

    settings: CollectorSettings,

    snapshot_sender: mpsc::Sender<GamepadSnapshot>,
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        snapshot_sender: mpsc::Sender<GamepadSnapshot>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        Ok(Self::new(gilrs, None, settings, snapshot_sender))
    }

    // Pick the first connected pad and start collecting
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();

        if gamepads.is_empty() {
            warn!("No gamepad connected, waiting for one to connect");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!("  [{}] ID: {}, Name: {}", idx, id, gamepad.name());
            }
            let (id, gamepad) = &gamepads[0];
            self.active_gamepad = Some(*id);
            info!("Selected gamepad: {} ({})", gamepad.name(), id);
        }

        self.transition()
    }
}

impl EventCollector<Collecting> {
    // Handle at most one pending gilrs event
    pub fn collect_next_event(&mut self) -> Result<(), CollectorError> {
        let Some(Event { id, event, .. }) = self.gilrs.next_event() else {
            return Ok(());
        };

        match event {
            EventType::Connected => {
                if self.active_gamepad.is_none() {
                    info!(
                        "Controller connected, selecting {} ({})",
                        self.gilrs.gamepad(id).name(),
                        id
                    );
                    self.active_gamepad = Some(id);
                } else {
                    info!("Additional controller connected: {}", id);
                }
                return Ok(());
            }
            EventType::Disconnected => {
                if self.active_gamepad == Some(id) {
                    warn!("Active controller disconnected: {}", id);
                    self.active_gamepad = None;
                    // Everything reads as released once the pad is gone
                    return self.send(GamepadSnapshot::default());
                }
                return Ok(());
            }
            EventType::ButtonRepeated(..) | EventType::Dropped => return Ok(()),
            _ => {}
        }

        if self.active_gamepad != Some(id) {
            debug!("Skipping event from non-active gamepad: {:?}", id);
            return Ok(());
        }

        let snapshot = sample(
            &self.gilrs.gamepad(id),
            self.settings.stick_press_threshold,
        );
        debug!(
            "Sampled {:?} after {:?} at {}",
            snapshot,
            event,
            Local::now().format("%H:%M:%S.%3f")
        );
        self.send(snapshot)
    }

    fn send(&self, snapshot: GamepadSnapshot) -> Result<(), CollectorError> {
        self.snapshot_sender
            .try_send(snapshot)
            .map_err(|e| CollectorError::SnapshotSendError(e.to_string()))
    }

    pub fn run_collection_loop(&mut self, cancel: CancellationToken) {
        info!("Starting Event Collector loop");
        let interval = std::time::Duration::from_micros(self.settings.poll_interval_us);

        while !cancel.is_cancelled() {
            if let Err(e) = self.collect_next_event() {
                error!("Error collecting event: {}", e);
            }
            std::thread::sleep(interval);
        }

        info!("Event Collector loop stopped");
    }
}

/// Reads the full pressed state of `gamepad`.
fn sample(gamepad: &Gamepad<'_>, stick_press_threshold: f32) -> GamepadSnapshot {
    GamepadSnapshot {
        dpad: Directions {
            up: gamepad.is_pressed(Button::DPadUp),
            down: gamepad.is_pressed(Button::DPadDown),
            left: gamepad.is_pressed(Button::DPadLeft),
            right: gamepad.is_pressed(Button::DPadRight),
        },
        thumbstick: Directions::from_axes(
            gamepad.value(Axis::LeftStickX),
            gamepad.value(Axis::LeftStickY),
            stick_press_threshold,
        ),
        a: gamepad.is_pressed(Button::South),
        b: gamepad.is_pressed(Button::East),
        x: gamepad.is_pressed(Button::West),
        y: gamepad.is_pressed(Button::North),
    }
}
