//! Mapping engine with statum state machine
//!
//! Runs in its own tokio task. Every snapshot from the controller is
//! translated with the settings current at that moment and each resulting
//! intent goes straight to the content bridge.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Active ──► Deactivating ──► Deactivated
//!                    │             ▲
//!                    └─────────────┘
//!                 (shutdown / input closed)
//! ```

use std::sync::Arc;

use statum::{machine, state};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::translator::{release_all, translate};
use super::MappingError;
use crate::bridge::ContentBridge;
use crate::controller::GamepadSnapshot;
use crate::persistence::Settings;

#[state]
#[derive(Debug, Clone)]
pub enum MappingEngineState {
    Initializing,
    Active,
    Deactivating,
    Deactivated,
}

#[machine]
pub struct MappingEngine<S: MappingEngineState> {
    input_receiver: mpsc::Receiver<GamepadSnapshot>,
    settings: watch::Receiver<Settings>,
    bridge: Arc<dyn ContentBridge>,
    name: String,
    processed: u64,
}

impl MappingEngine<Initializing> {
    pub fn create(
        input_receiver: mpsc::Receiver<GamepadSnapshot>,
        settings: watch::Receiver<Settings>,
        bridge: Arc<dyn ContentBridge>,
        name: String,
    ) -> Self {
        info!("Initializing new mapping engine: {}", name);
        Self::new(input_receiver, settings, bridge, name, 0)
    }

    pub fn activate(self) -> MappingEngine<Active> {
        info!("Activating mapping engine: {}", self.name);
        self.transition()
    }
}

impl MappingEngine<Active> {
    /// Translates one snapshot and dispatches every intent. Returns the
    /// number of intents sent.
    pub fn process_snapshot(&mut self, snapshot: &GamepadSnapshot) -> usize {
        let intents = {
            let settings = self.settings.borrow();
            translate(snapshot, &settings)
        };
        let count = intents.len();
        debug!("Mapped {:?} to {} key intents", snapshot, count);

        for intent in intents {
            self.bridge.dispatch_key(intent);
        }
        self.processed += 1;
        count
    }

    /// Main loop. Ends on the shutdown signal or when every snapshot sender
    /// is gone.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> MappingEngine<Deactivating> {
        info!("Starting snapshot processing loop for: {}", self.name);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                snapshot = self.input_receiver.recv() => match snapshot {
                    Some(snapshot) => {
                        self.process_snapshot(&snapshot);
                    }
                    None => {
                        warn!("Snapshot channel closed for: {}", self.name);
                        break;
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        self.transition()
    }
}

impl MappingEngine<Deactivating> {
    /// Lifts every key the engine may have left held down.
    pub fn shutdown(self) -> MappingEngine<Deactivated> {
        info!("Shutting down mapping engine: {}", self.name);

        if self.bridge.is_attached() {
            let intents = release_all(&self.settings.borrow());
            for intent in intents {
                self.bridge.dispatch_key(intent);
            }
        } else {
            debug!("No player page attached, skipping key release: {}", self.name);
        }

        info!(
            "Engine shut down after {} snapshots: {}",
            self.processed, self.name
        );
        self.transition()
    }
}

impl MappingEngine<Deactivated> {}

/// Handle for managing the engine task
pub struct MappingEngineHandle {
    pub name: String,

    settings: watch::Receiver<Settings>,

    bridge: Arc<dyn ContentBridge>,

    task_handle: Option<JoinHandle<()>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MappingEngineHandle {
    pub fn new(
        name: String,
        settings: watch::Receiver<Settings>,
        bridge: Arc<dyn ContentBridge>,
    ) -> Self {
        Self {
            name,
            settings,
            bridge,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Spawns the engine on the current tokio runtime.
    pub fn start(&mut self, input: mpsc::Receiver<GamepadSnapshot>) -> Result<(), MappingError> {
        if self.task_handle.is_some() {
            return Err(MappingError::AlreadyStarted(self.name.clone()));
        }

        let engine = MappingEngine::create(
            input,
            self.settings.clone(),
            Arc::clone(&self.bridge),
            self.name.clone(),
        )
        .activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let engine_name = self.name.clone();
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            let deactivating = engine.run_until_shutdown(shutdown_rx).await;
            deactivating.shutdown();
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task_handle = Some(task_handle);
        info!("Mapping engine activated: {}", self.name);
        Ok(())
    }

    /// Signals the task and waits for it to finish.
    pub async fn shutdown(&mut self) -> Result<(), MappingError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(()) => {
                    debug!("Engine task completed: {}", self.name);
                    Ok(())
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(MappingError::ThreadError(format!(
                        "Engine task panicked: {}",
                        e
                    )))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeMessage, EventBridge};
    use crate::mapping::{KeyIntent, KeyPhase};
    use crate::persistence::ThumbstickMapping;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::broadcast;

    #[derive(Default)]
    struct RecordingBridge {
        attached: bool,
        sent: Mutex<Vec<BridgeMessage>>,
    }

    impl ContentBridge for RecordingBridge {
        fn dispatch(&self, message: BridgeMessage) {
            self.sent.lock().unwrap().push(message);
        }

        fn is_attached(&self) -> bool {
            self.attached
        }
    }

    async fn run_to_deactivated(bridge: Arc<RecordingBridge>) {
        let (_settings_tx, settings_rx) = watch::channel(Settings::default());
        let (_snapshot_tx, snapshot_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let engine =
            MappingEngine::create(snapshot_rx, settings_rx, bridge, "test".to_string()).activate();
        shutdown_tx.send(()).unwrap();
        engine.run_until_shutdown(shutdown_rx).await.shutdown();
    }

    fn key(message: BridgeMessage) -> KeyIntent {
        match message {
            BridgeMessage::Key(intent) => intent,
            BridgeMessage::Reload => panic!("unexpected reload"),
        }
    }

    async fn next_key(page: &mut broadcast::Receiver<BridgeMessage>) -> KeyIntent {
        let message = tokio::time::timeout(Duration::from_secs(1), page.recv())
            .await
            .expect("timed out")
            .unwrap();
        key(message)
    }

    #[tokio::test]
    async fn snapshots_flow_through_to_bridge() {
        let bridge = EventBridge::new();
        let mut page = bridge.subscribe();
        let (_settings_tx, settings_rx) = watch::channel(Settings::default());
        let (snapshot_tx, snapshot_rx) = mpsc::channel(8);

        let mut handle =
            MappingEngineHandle::new("test".to_string(), settings_rx, Arc::new(bridge));
        handle.start(snapshot_rx).unwrap();

        snapshot_tx
            .send(GamepadSnapshot {
                a: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let mut received = Vec::new();
        for _ in 0..8 {
            received.push(next_key(&mut page).await);
        }
        assert_eq!(received[0].key, "ArrowUp");
        assert_eq!(received[4].key, "Space");
        assert_eq!(received[4].phase, KeyPhase::Down);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn settings_changes_apply_to_next_snapshot() {
        let bridge = EventBridge::new();
        let mut page = bridge.subscribe();
        let (settings_tx, settings_rx) = watch::channel(Settings::default());
        let (snapshot_tx, snapshot_rx) = mpsc::channel(8);

        let mut handle =
            MappingEngineHandle::new("test".to_string(), settings_rx, Arc::new(bridge));
        handle.start(snapshot_rx).unwrap();

        settings_tx.send_modify(|s| s.thumbstick_mapping = ThumbstickMapping::Wasd);
        snapshot_tx.send(GamepadSnapshot::default()).await.unwrap();

        assert_eq!(next_key(&mut page).await.code, "KeyW");
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_releases_every_key() {
        let bridge = EventBridge::new();
        let mut page = bridge.subscribe();
        let (_settings_tx, settings_rx) = watch::channel(Settings::default());
        let (_snapshot_tx, snapshot_rx) = mpsc::channel(8);

        let mut handle =
            MappingEngineHandle::new("test".to_string(), settings_rx, Arc::new(bridge));
        handle.start(snapshot_rx).unwrap();
        handle.shutdown().await.unwrap();

        for _ in 0..8 {
            assert_eq!(next_key(&mut page).await.phase, KeyPhase::Up);
        }
    }

    #[tokio::test]
    async fn shutdown_without_page_skips_release() {
        let detached = Arc::new(RecordingBridge::default());
        run_to_deactivated(Arc::clone(&detached)).await;
        assert!(detached.sent.lock().unwrap().is_empty());

        let attached = Arc::new(RecordingBridge {
            attached: true,
            ..Default::default()
        });
        run_to_deactivated(Arc::clone(&attached)).await;
        assert_eq!(attached.sent.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn engine_stops_when_input_closes() {
        let (_settings_tx, settings_rx) = watch::channel(Settings::default());
        let (snapshot_tx, snapshot_rx) = mpsc::channel(8);

        let mut handle = MappingEngineHandle::new(
            "test".to_string(),
            settings_rx,
            Arc::new(EventBridge::new()),
        );
        handle.start(snapshot_rx).unwrap();
        drop(snapshot_tx);

        assert!(handle.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (_settings_tx, settings_rx) = watch::channel(Settings::default());
        let (_tx1, rx1) = mpsc::channel(1);
        let (_tx2, rx2) = mpsc::channel(1);

        let mut handle = MappingEngineHandle::new(
            "test".to_string(),
            settings_rx,
            Arc::new(EventBridge::new()),
        );
        handle.start(rx1).unwrap();
        assert!(matches!(
            handle.start(rx2),
            Err(MappingError::AlreadyStarted(_))
        ));
        handle.shutdown().await.unwrap();
    }
}
